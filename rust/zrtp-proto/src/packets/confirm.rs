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
use nom::{bytes::complete::take, number::complete::be_u32, IResult};

/// Plaintext size of a Confirm body without signature.
pub const CONFIRM_BODY_LEN: usize = 32 + 4 + 4;

/// Largest signature length the 9-bit field can express, in words.
const MAX_SIGNATURE_WORDS: usize = 0x1ff;

/// The Confirm packet as it travels on the wire.
///
/// Everything after the IV is encrypted with the sender's ZRTP key; see
/// [`ConfirmBody`] for the plaintext layout. Defined in RFC 6189 Section 5.7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPacket {
    /// HMAC over the encrypted part.
    pub confirm_mac: [u8; 8],
    /// CFB initialization vector.
    pub iv: [u8; 16],
    /// Encrypted [`ConfirmBody`].
    pub encrypted: Vec<u8>,
}

impl ConfirmPacket {
    /// The message type identifier for Confirm1 packets.
    pub const MESSAGE_TYPE_CONF1: [u8; 8] = *b"Confirm1";
    /// The message type identifier for Confirm2 packets.
    pub const MESSAGE_TYPE_CONF2: [u8; 8] = *b"Confirm2";

    /// Parses a complete Confirm1 or Confirm2 message.
    pub fn parse(message: &[u8]) -> Result<Self, DecodeError> {
        let (body, _) = ZrtpPacketHeader::parse_checked(message)?;
        let (rest, (confirm_mac, iv)) = mac_and_iv(body)?;
        if rest.len() < CONFIRM_BODY_LEN {
            return Err(DecodeError::Malformed("Confirm body"));
        }
        Ok(Self {
            confirm_mac,
            iv,
            encrypted: rest.to_vec(),
        })
    }

    /// Serializes the Confirm packet under the given message type.
    pub fn to_bytes(&self, message_type: [u8; 8]) -> Vec<u8> {
        let len = HEADER_LEN + MAC_LEN + 16 + self.encrypted.len();
        let mut bytes = Vec::with_capacity(len);
        ZrtpPacketHeader::new(message_type, len).write(&mut bytes);
        bytes.extend_from_slice(&self.confirm_mac);
        bytes.extend_from_slice(&self.iv);
        bytes.extend_from_slice(&self.encrypted);
        bytes
    }
}

pub(crate) fn mac_and_iv(input: &[u8]) -> IResult<&[u8], ([u8; 8], [u8; 16])> {
    let (input, mac) = take(MAC_LEN)(input)?;
    let (input, iv) = take(16usize)(input)?;
    Ok((input, (array(mac), array(iv))))
}

/// Packs the 9-bit signature length and the flag byte into one word.
pub(crate) fn sig_len_word(signature: &[u8], flags: u8) -> [u8; 4] {
    let words = (signature.len() / 4).min(MAX_SIGNATURE_WORDS) as u32;
    ((words << 8) | flags as u32).to_be_bytes()
}

/// The decrypted part of a Confirm message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfirmBody {
    /// The H0 hash chain value.
    pub hash_h0: [u8; 32],
    /// E flag: PBX enrollment.
    pub enrollment: bool,
    /// V flag: the sender's SAS verified flag.
    pub sas_verified: bool,
    /// A flag: the sender allows GoClear.
    pub allow_clear: bool,
    /// D flag: disclosure.
    pub disclosure: bool,
    /// Cache expiration interval in seconds, 0xffffffff means never.
    pub cache_expiry: u32,
    /// Optional SAS signature block, a multiple of four bytes.
    pub signature: Vec<u8>,
}

impl ConfirmBody {
    const FLAG_ENROLLMENT: u8 = 0x08;
    const FLAG_VERIFIED: u8 = 0x04;
    const FLAG_ALLOW_CLEAR: u8 = 0x02;
    const FLAG_DISCLOSURE: u8 = 0x01;

    fn fields(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, hash_h0) = take(32usize)(input)?;
        let (input, word) = be_u32(input)?;
        let (input, cache_expiry) = be_u32(input)?;
        let sig_words = ((word >> 8) & 0x1ff) as usize;
        let (input, signature) = take(sig_words * 4)(input)?;
        let flags = word as u8;

        Ok((input, Self {
            hash_h0: array(hash_h0),
            enrollment: flags & Self::FLAG_ENROLLMENT != 0,
            sas_verified: flags & Self::FLAG_VERIFIED != 0,
            allow_clear: flags & Self::FLAG_ALLOW_CLEAR != 0,
            disclosure: flags & Self::FLAG_DISCLOSURE != 0,
            cache_expiry,
            signature: signature.to_vec(),
        }))
    }

    /// Parses decrypted Confirm plaintext.
    pub fn parse(plain: &[u8]) -> Result<Self, DecodeError> {
        let (rest, body) = Self::fields(plain)?;
        expect_end(rest, "Confirm body")?;
        Ok(body)
    }

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.enrollment {
            flags |= Self::FLAG_ENROLLMENT;
        }
        if self.sas_verified {
            flags |= Self::FLAG_VERIFIED;
        }
        if self.allow_clear {
            flags |= Self::FLAG_ALLOW_CLEAR;
        }
        if self.disclosure {
            flags |= Self::FLAG_DISCLOSURE;
        }
        flags
    }

    /// Serializes the plaintext body, ready for encryption.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(CONFIRM_BODY_LEN + self.signature.len());
        bytes.extend_from_slice(&self.hash_h0);
        bytes.extend_from_slice(&sig_len_word(&self.signature, self.flags()));
        bytes.extend_from_slice(&self.cache_expiry.to_be_bytes());
        bytes.extend_from_slice(&self.signature[..self.signature.len() / 4 * 4]);
        bytes
    }
}
