/*
 * Copyright 2006 - 2018, Werner Dittmann
 * Copyright 2026 - Francisco F. Pinochet
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *         http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use super::header::{array, expect_end, ZrtpPacketHeader, HEADER_LEN};
use super::MAC_LEN;
use crate::error::DecodeError;
use nom::{bytes::complete::take, IResult};

/// Bytes of a DHPart message that are not the public value.
const DH_FIXED_LEN: usize = HEADER_LEN + 32 + 4 * 8 + MAC_LEN;

/// The DHPart packet is used to exchange Diffie-Hellman public values.
///
/// Defined in RFC 6189 Section 5.5 and 5.6 (DHPart1 and DHPart2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DHPartPacket {
    /// The H1 hash value.
    pub hash_h1: [u8; 32],
    /// Retained secret 1 ID.
    pub rs1_id: [u8; 8],
    /// Retained secret 2 ID.
    pub rs2_id: [u8; 8],
    /// Auxiliary secret ID.
    pub aux_secret_id: [u8; 8],
    /// PBX secret ID.
    pub pbx_secret_id: [u8; 8],
    /// The DH public value.
    pub public_value: Vec<u8>,
    /// The MAC of the packet, keyed with H0.
    pub mac: [u8; 8],
}

impl DHPartPacket {
    /// The message type identifier for DHPart1 packets.
    pub const MESSAGE_TYPE_DH1: [u8; 8] = *b"DHPart1 ";
    /// The message type identifier for DHPart2 packets.
    pub const MESSAGE_TYPE_DH2: [u8; 8] = *b"DHPart2 ";

    fn fields(input: &[u8], pv_len: usize) -> IResult<&[u8], Self> {
        let (input, hash_h1) = take(32usize)(input)?;
        let (input, rs1_id) = take(8usize)(input)?;
        let (input, rs2_id) = take(8usize)(input)?;
        let (input, aux_secret_id) = take(8usize)(input)?;
        let (input, pbx_secret_id) = take(8usize)(input)?;
        let (input, public_value) = take(pv_len)(input)?;
        let (input, mac) = take(MAC_LEN)(input)?;

        Ok((input, Self {
            hash_h1: array(hash_h1),
            rs1_id: array(rs1_id),
            rs2_id: array(rs2_id),
            aux_secret_id: array(aux_secret_id),
            pbx_secret_id: array(pbx_secret_id),
            public_value: public_value.to_vec(),
            mac: array(mac),
        }))
    }

    /// Parses a complete DHPart1 or DHPart2 message.
    pub fn parse(message: &[u8]) -> Result<Self, DecodeError> {
        let (body, header) = ZrtpPacketHeader::parse_checked(message)?;
        let pv_len = (header.length as usize * 4)
            .checked_sub(DH_FIXED_LEN)
            .filter(|len| *len > 0)
            .ok_or(DecodeError::Malformed("DHPart public value"))?;
        let (rest, dh) = Self::fields(body, pv_len)?;
        expect_end(rest, "DHPart")?;
        Ok(dh)
    }

    /// Serialized length in bytes.
    pub fn encoded_len(&self) -> usize {
        DH_FIXED_LEN + self.public_value.len()
    }

    /// Serializes the DHPart packet under the given message type.
    pub fn to_bytes(&self, message_type: [u8; 8]) -> Vec<u8> {
        let len = self.encoded_len();
        let mut bytes = Vec::with_capacity(len);
        ZrtpPacketHeader::new(message_type, len).write(&mut bytes);
        bytes.extend_from_slice(&self.hash_h1);
        bytes.extend_from_slice(&self.rs1_id);
        bytes.extend_from_slice(&self.rs2_id);
        bytes.extend_from_slice(&self.aux_secret_id);
        bytes.extend_from_slice(&self.pbx_secret_id);
        bytes.extend_from_slice(&self.public_value);
        bytes.extend_from_slice(&self.mac);
        bytes
    }
}
