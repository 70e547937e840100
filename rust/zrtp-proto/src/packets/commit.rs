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

/// Key agreement identifier that selects multi-stream mode.
pub const KA_MULTI_STREAM: [u8; 4] = *b"Mult";
/// Key agreement identifier that selects preshared mode.
pub const KA_PRESHARED: [u8; 4] = *b"Prsh";

/// The mode-dependent tail of a Commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Diffie-Hellman mode, carries hvi.
    DiffieHellman { hvi: [u8; 32] },
    /// Multi-stream mode, carries a random nonce.
    MultiStream { nonce: [u8; 16] },
    /// Preshared mode, carries a nonce and the preshared key id.
    Preshared { nonce: [u8; 16], key_id: [u8; 8] },
}

impl CommitMode {
    fn encoded_len(&self) -> usize {
        match self {
            CommitMode::DiffieHellman { .. } => 32,
            CommitMode::MultiStream { .. } => 16,
            CommitMode::Preshared { .. } => 24,
        }
    }
}

/// The Commit packet is used to negotiate cryptographic algorithms.
///
/// Defined in RFC 6189 Section 5.4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPacket {
    /// The H2 hash value.
    pub hash_h2: [u8; 32],
    /// The ZID of the endpoint.
    pub zid: [u8; 12],
    /// Selected hash algorithm (e.g., "S256").
    pub hash_alg: [u8; 4],
    /// Selected cipher algorithm (e.g., "AES1").
    pub cipher_alg: [u8; 4],
    /// Selected auth tag algorithm (e.g., "HS32").
    pub auth_tag_alg: [u8; 4],
    /// Selected key agreement algorithm (e.g., "X255").
    pub key_agreement_alg: [u8; 4],
    /// Selected SAS algorithm (e.g., "B32 ").
    pub sas_alg: [u8; 4],
    /// hvi or nonce, depending on the key agreement.
    pub mode: CommitMode,
    /// Message Authentication Code for the Commit packet, keyed with H1.
    pub mac: [u8; 8],
}

impl CommitPacket {
    /// The message type identifier for Commit packets.
    pub const MESSAGE_TYPE: [u8; 8] = *b"Commit  ";

    fn fields(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, hash_h2) = take(32usize)(input)?;
        let (input, zid) = take(12usize)(input)?;
        let (input, hash_alg) = take(4usize)(input)?;
        let (input, cipher_alg) = take(4usize)(input)?;
        let (input, auth_tag_alg) = take(4usize)(input)?;
        let (input, key_agreement_alg) = take(4usize)(input)?;
        let (input, sas_alg) = take(4usize)(input)?;

        let key_agreement_alg: [u8; 4] = array(key_agreement_alg);
        let (input, mode) = match key_agreement_alg {
            KA_MULTI_STREAM => {
                let (input, nonce) = take(16usize)(input)?;
                (input, CommitMode::MultiStream { nonce: array(nonce) })
            }
            KA_PRESHARED => {
                let (input, nonce) = take(16usize)(input)?;
                let (input, key_id) = take(8usize)(input)?;
                (input, CommitMode::Preshared {
                    nonce: array(nonce),
                    key_id: array(key_id),
                })
            }
            _ => {
                let (input, hvi) = take(32usize)(input)?;
                (input, CommitMode::DiffieHellman { hvi: array(hvi) })
            }
        };
        let (input, mac) = take(MAC_LEN)(input)?;

        Ok((input, Self {
            hash_h2: array(hash_h2),
            zid: array(zid),
            hash_alg: array(hash_alg),
            cipher_alg: array(cipher_alg),
            auth_tag_alg: array(auth_tag_alg),
            key_agreement_alg,
            sas_alg: array(sas_alg),
            mode,
            mac: array(mac),
        }))
    }

    /// Parses a complete Commit message.
    pub fn parse(message: &[u8]) -> Result<Self, DecodeError> {
        let (body, _) = ZrtpPacketHeader::parse_checked(message)?;
        let (rest, commit) = Self::fields(body)?;
        expect_end(rest, "Commit")?;
        Ok(commit)
    }

    /// True if this Commit selects multi-stream mode.
    pub fn is_multi_stream(&self) -> bool {
        matches!(self.mode, CommitMode::MultiStream { .. })
    }

    /// The value compared during commit contention: hvi or nonce.
    pub fn contention_value(&self) -> &[u8] {
        match &self.mode {
            CommitMode::DiffieHellman { hvi } => hvi,
            CommitMode::MultiStream { nonce } | CommitMode::Preshared { nonce, .. } => nonce,
        }
    }

    /// Serialized length in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + 32 + 12 + 5 * 4 + self.mode.encoded_len() + MAC_LEN
    }

    /// Serializes the Commit packet into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = self.encoded_len();
        let mut bytes = Vec::with_capacity(len);
        ZrtpPacketHeader::new(Self::MESSAGE_TYPE, len).write(&mut bytes);
        bytes.extend_from_slice(&self.hash_h2);
        bytes.extend_from_slice(&self.zid);
        bytes.extend_from_slice(&self.hash_alg);
        bytes.extend_from_slice(&self.cipher_alg);
        bytes.extend_from_slice(&self.auth_tag_alg);
        bytes.extend_from_slice(&self.key_agreement_alg);
        bytes.extend_from_slice(&self.sas_alg);
        match &self.mode {
            CommitMode::DiffieHellman { hvi } => bytes.extend_from_slice(hvi),
            CommitMode::MultiStream { nonce } => bytes.extend_from_slice(nonce),
            CommitMode::Preshared { nonce, key_id } => {
                bytes.extend_from_slice(nonce);
                bytes.extend_from_slice(key_id);
            }
        }
        bytes.extend_from_slice(&self.mac);
        bytes
    }
}
