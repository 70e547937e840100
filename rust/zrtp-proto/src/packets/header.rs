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

use crate::error::DecodeError;
use nom::{bytes::complete::take, number::complete::be_u16, IResult};

/// The ZRTP magic cookie carried in the pseudo-RTP header ("ZRTP").
pub const ZRTP_MAGIC: u32 = 0x5a525450;

/// The preamble that starts every ZRTP message.
pub const ZRTP_ID: u16 = 0x505a;

/// Length of the message header in bytes.
pub const HEADER_LEN: usize = 12;

/// The common ZRTP message header.
///
/// Every ZRTP message starts with this 12-byte header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZrtpPacketHeader {
    /// Must be equal to ZRTP_ID (0x505a).
    pub zrtp_id: u16,
    /// Length of the message in 32-bit words, header included.
    pub length: u16,
    /// The 8-character message type string (e.g., "Hello   ").
    pub message_type: [u8; 8],
}

impl ZrtpPacketHeader {
    /// Builds a header for a message of `total_len` bytes.
    pub fn new(message_type: [u8; 8], total_len: usize) -> Self {
        Self {
            zrtp_id: ZRTP_ID,
            length: (total_len / 4) as u16,
            message_type,
        }
    }

    /// Parses a ZRTP message header from the given input bytes.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, zrtp_id) = be_u16(input)?;
        let (input, length) = be_u16(input)?;
        let (input, msg_type_bytes) = take(8usize)(input)?;

        let mut message_type = [0u8; 8];
        message_type.copy_from_slice(msg_type_bytes);

        Ok((input, Self {
            zrtp_id,
            length,
            message_type,
        }))
    }

    /// Parses and validates the header against the full message buffer.
    pub fn parse_checked(message: &[u8]) -> Result<(&[u8], Self), DecodeError> {
        let (rest, header) = Self::parse(message)?;
        if header.zrtp_id != ZRTP_ID {
            return Err(DecodeError::BadPreamble(header.zrtp_id));
        }
        let declared = header.length as usize * 4;
        if declared != message.len() {
            return Err(DecodeError::LengthMismatch {
                declared,
                actual: message.len(),
            });
        }
        Ok((rest, header))
    }

    /// Serializes the header into `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.zrtp_id.to_be_bytes());
        out.extend_from_slice(&self.length.to_be_bytes());
        out.extend_from_slice(&self.message_type);
    }

    /// Serializes the ZRTP message header into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN);
        self.write(&mut bytes);
        bytes
    }
}

/// Copies a fixed-size field out of a slice returned by `take`.
pub(crate) fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// Fails unless the parser consumed the whole message.
pub(crate) fn expect_end(rest: &[u8], what: &'static str) -> Result<(), DecodeError> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(DecodeError::Malformed(what))
    }
}
