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

/// Fixed part of Hello after the header: version, client id, H3, ZID, flag word.
const HELLO_FIXED_LEN: usize = 4 + 16 + 32 + 12 + 4;

/// Maximum number of algorithms per category (4-bit count field, RFC limits it to 7).
pub const MAX_ALGORITHMS: usize = 7;

/// The Hello packet is used in the discovery phase to find peer capabilities.
///
/// Defined in RFC 6189 Section 5.2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloPacket {
    /// The ZRTP protocol version supported.
    pub version: [u8; 4],
    /// Client identifier string.
    pub client_id: [u8; 16],
    /// The H3 hash chain value.
    pub hash_h3: [u8; 32],
    /// The ZID of the endpoint.
    pub zid: [u8; 12],
    /// S flag: endpoint can sign the SAS.
    pub signature_capable: bool,
    /// M flag: endpoint is a trusted MiTM (PBX).
    pub mitm: bool,
    /// P flag: passive endpoint, never sends Commit.
    pub passive: bool,
    /// Hash algorithms in preference order (e.g. b"S256").
    pub hashes: Vec<[u8; 4]>,
    /// Cipher algorithms in preference order.
    pub ciphers: Vec<[u8; 4]>,
    /// SRTP auth tag types in preference order.
    pub auth_tags: Vec<[u8; 4]>,
    /// Key agreement types in preference order.
    pub key_agreements: Vec<[u8; 4]>,
    /// SAS rendering schemes in preference order.
    pub sas_types: Vec<[u8; 4]>,
    /// The MAC of the packet, keyed with H2.
    pub mac: [u8; 8],
}

fn alg_list(input: &[u8], count: usize) -> IResult<&[u8], Vec<[u8; 4]>> {
    let (input, bytes) = take(count * 4)(input)?;
    Ok((input, bytes.chunks_exact(4).map(array::<4>).collect()))
}

impl HelloPacket {
    /// The message type identifier for Hello packets.
    pub const MESSAGE_TYPE: [u8; 8] = *b"Hello   ";

    const FLAG_SIGNATURE: u8 = 0x40;
    const FLAG_MITM: u8 = 0x20;
    const FLAG_PASSIVE: u8 = 0x10;

    fn fields(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, version) = take(4usize)(input)?;
        let (input, client_id) = take(16usize)(input)?;
        let (input, hash_h3) = take(32usize)(input)?;
        let (input, zid) = take(12usize)(input)?;
        let (input, word) = be_u32(input)?;

        let flags = (word >> 24) as u8;
        let hc = ((word >> 16) & 0x0f) as usize;
        let cc = ((word >> 12) & 0x0f) as usize;
        let ac = ((word >> 8) & 0x0f) as usize;
        let kc = ((word >> 4) & 0x0f) as usize;
        let sc = (word & 0x0f) as usize;

        let (input, hashes) = alg_list(input, hc)?;
        let (input, ciphers) = alg_list(input, cc)?;
        let (input, auth_tags) = alg_list(input, ac)?;
        let (input, key_agreements) = alg_list(input, kc)?;
        let (input, sas_types) = alg_list(input, sc)?;
        let (input, mac) = take(MAC_LEN)(input)?;

        Ok((input, Self {
            version: array(version),
            client_id: array(client_id),
            hash_h3: array(hash_h3),
            zid: array(zid),
            signature_capable: flags & Self::FLAG_SIGNATURE != 0,
            mitm: flags & Self::FLAG_MITM != 0,
            passive: flags & Self::FLAG_PASSIVE != 0,
            hashes,
            ciphers,
            auth_tags,
            key_agreements,
            sas_types,
            mac: array(mac),
        }))
    }

    /// Parses a complete Hello message.
    pub fn parse(message: &[u8]) -> Result<Self, DecodeError> {
        let (body, _) = ZrtpPacketHeader::parse_checked(message)?;
        if let Some(word) = body.get(HELLO_FIXED_LEN - 4..HELLO_FIXED_LEN) {
            let word = u32::from_be_bytes(array(word));
            let counts = [word >> 16, word >> 12, word >> 8, word >> 4, word];
            if counts.iter().any(|c| (c & 0x0f) as usize > MAX_ALGORITHMS) {
                return Err(DecodeError::Malformed("Hello algorithm count"));
            }
        }
        let (rest, hello) = Self::fields(body)?;
        expect_end(rest, "Hello")?;
        Ok(hello)
    }

    fn algorithm_count(&self) -> usize {
        [
            &self.hashes,
            &self.ciphers,
            &self.auth_tags,
            &self.key_agreements,
            &self.sas_types,
        ]
        .iter()
        .map(|list| list.len().min(MAX_ALGORITHMS))
        .sum()
    }

    /// Serialized length in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + HELLO_FIXED_LEN + self.algorithm_count() * 4 + MAC_LEN
    }

    /// Serializes the Hello packet into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = self.encoded_len();
        let mut bytes = Vec::with_capacity(len);
        ZrtpPacketHeader::new(Self::MESSAGE_TYPE, len).write(&mut bytes);
        bytes.extend_from_slice(&self.version);
        bytes.extend_from_slice(&self.client_id);
        bytes.extend_from_slice(&self.hash_h3);
        bytes.extend_from_slice(&self.zid);

        let mut flags = 0u8;
        if self.signature_capable {
            flags |= Self::FLAG_SIGNATURE;
        }
        if self.mitm {
            flags |= Self::FLAG_MITM;
        }
        if self.passive {
            flags |= Self::FLAG_PASSIVE;
        }
        let count = |v: &Vec<[u8; 4]>| v.len().min(MAX_ALGORITHMS) as u32;
        let word = (flags as u32) << 24
            | count(&self.hashes) << 16
            | count(&self.ciphers) << 12
            | count(&self.auth_tags) << 8
            | count(&self.key_agreements) << 4
            | count(&self.sas_types);
        bytes.extend_from_slice(&word.to_be_bytes());

        for list in [
            &self.hashes,
            &self.ciphers,
            &self.auth_tags,
            &self.key_agreements,
            &self.sas_types,
        ] {
            for alg in list.iter().take(MAX_ALGORITHMS) {
                bytes.extend_from_slice(alg);
            }
        }
        bytes.extend_from_slice(&self.mac);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HelloPacket {
        HelloPacket {
            version: *b"1.10",
            client_id: *b"ZRTP-Rust-Tester",
            hash_h3: [0x33; 32],
            zid: [0x11; 12],
            signature_capable: false,
            mitm: true,
            passive: false,
            hashes: vec![*b"S384", *b"S256"],
            ciphers: vec![*b"AES3", *b"2FS3", *b"AES1"],
            auth_tags: vec![*b"HS80", *b"HS32"],
            key_agreements: vec![*b"X255", *b"EC25", *b"Mult"],
            sas_types: vec![*b"B32 "],
            mac: [0xAA; 8],
        }
    }

    #[test]
    fn test_hello_packet_codec() {
        let hello = sample();
        let bytes = hello.to_bytes();
        // 22 fixed words plus 11 algorithms.
        assert_eq!(bytes.len(), (22 + 11) * 4);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 33);

        let parsed = HelloPacket::parse(&bytes).unwrap();
        assert_eq!(parsed, hello);
    }

    #[test]
    fn test_hello_flag_word_layout() {
        let bytes = sample().to_bytes();
        // flag word follows header, version, client id, H3 and ZID
        let word = &bytes[12 + 64..12 + 68];
        assert_eq!(word, &[0x20, 0x02, 0x32, 0x31]);
    }

    #[test]
    fn test_hello_truncated_algorithms() {
        let mut bytes = sample().to_bytes();
        // Claim one more SAS type than present, keeping the declared length consistent.
        bytes[12 + 67] = 0x32;
        assert!(HelloPacket::parse(&bytes).is_err());
    }

    #[test]
    fn test_hello_rejects_count_above_seven() {
        let mut bytes = sample().to_bytes();
        // hash count nibble 2 -> 8
        bytes[12 + 65] = 0x08;
        assert_eq!(
            HelloPacket::parse(&bytes),
            Err(DecodeError::Malformed("Hello algorithm count"))
        );
    }

    #[test]
    fn test_hello_long_list_is_capped_consistently() {
        let mut hello = sample();
        hello.ciphers = vec![*b"AES1"; 9];
        let bytes = hello.to_bytes();
        assert_eq!(bytes.len(), hello.encoded_len());

        let parsed = HelloPacket::parse(&bytes).unwrap();
        assert_eq!(parsed.ciphers.len(), MAX_ALGORITHMS);
    }
}
