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

use super::confirm::{mac_and_iv, sig_len_word};
use super::header::{array, expect_end, ZrtpPacketHeader, HEADER_LEN};
use super::MAC_LEN;
use crate::error::DecodeError;
use nom::{bytes::complete::take, number::complete::be_u32, IResult};

/// Plaintext size of a SASrelay body without signature.
pub const SAS_RELAY_BODY_LEN: usize = 4 + 4 + 32;

/// SASrelay, sent by a trusted MiTM to hand over the SAS of its other leg.
///
/// Defined in RFC 6189 Section 5.13. Like Confirm, the part after the IV
/// is encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SasRelayPacket {
    /// HMAC over the encrypted part.
    pub mac: [u8; 8],
    /// CFB initialization vector.
    pub iv: [u8; 16],
    /// Encrypted [`SasRelayBody`].
    pub encrypted: Vec<u8>,
}

impl SasRelayPacket {
    /// The message type identifier for SASrelay packets.
    pub const MESSAGE_TYPE: [u8; 8] = *b"SASrelay";

    /// Parses a complete SASrelay message.
    pub fn parse(message: &[u8]) -> Result<Self, DecodeError> {
        let (body, _) = ZrtpPacketHeader::parse_checked(message)?;
        let (rest, (mac, iv)) = mac_and_iv(body)?;
        if rest.len() < SAS_RELAY_BODY_LEN {
            return Err(DecodeError::Malformed("SASrelay body"));
        }
        Ok(Self {
            mac,
            iv,
            encrypted: rest.to_vec(),
        })
    }

    /// Serializes the SASrelay packet into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = HEADER_LEN + MAC_LEN + 16 + self.encrypted.len();
        let mut bytes = Vec::with_capacity(len);
        ZrtpPacketHeader::new(Self::MESSAGE_TYPE, len).write(&mut bytes);
        bytes.extend_from_slice(&self.mac);
        bytes.extend_from_slice(&self.iv);
        bytes.extend_from_slice(&self.encrypted);
        bytes
    }
}

/// The decrypted part of a SASrelay message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SasRelayBody {
    /// Flag byte (the V, A and D bits of the relaying MiTM).
    pub flags: u8,
    /// SAS rendering scheme for the relayed SAS.
    pub sas_type: [u8; 4],
    /// The sashash of the other call leg.
    pub trusted_sas_hash: [u8; 32],
    /// Optional signature block.
    pub signature: Vec<u8>,
}

impl SasRelayBody {
    fn fields(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, word) = be_u32(input)?;
        let (input, sas_type) = take(4usize)(input)?;
        let (input, trusted_sas_hash) = take(32usize)(input)?;
        let sig_words = ((word >> 8) & 0x1ff) as usize;
        let (input, signature) = take(sig_words * 4)(input)?;
        Ok((input, Self {
            flags: word as u8,
            sas_type: array(sas_type),
            trusted_sas_hash: array(trusted_sas_hash),
            signature: signature.to_vec(),
        }))
    }

    /// Parses decrypted SASrelay plaintext.
    pub fn parse(plain: &[u8]) -> Result<Self, DecodeError> {
        let (rest, body) = Self::fields(plain)?;
        expect_end(rest, "SASrelay body")?;
        Ok(body)
    }

    /// Serializes the plaintext body, ready for encryption.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SAS_RELAY_BODY_LEN + self.signature.len());
        bytes.extend_from_slice(&sig_len_word(&self.signature, self.flags));
        bytes.extend_from_slice(&self.sas_type);
        bytes.extend_from_slice(&self.trusted_sas_hash);
        bytes.extend_from_slice(&self.signature[..self.signature.len() / 4 * 4]);
        bytes
    }
}
