/*
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

//! Block ciphers in counter mode (AES-CM and Twofish-CM, RFC 3711 4.1.1).

use aes::cipher::generic_array::GenericArray;
use aes::cipher::KeyInit;
use aes::{Aes128, Aes192, Aes256};
use ctr::cipher::{InnerIvInit, StreamCipher};
use ctr::{Ctr128BE, CtrCore};
use twofish::Twofish;

use crate::error::SrtpError;

pub const BLOCK_LEN: usize = 16;

/// Which block cipher drives the keystream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterCipher {
    Aes,
    Twofish,
}

/// A keyed block cipher.
pub(crate) enum BlockCipher {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
    Twofish(Box<Twofish>),
}

impl BlockCipher {
    pub(crate) fn new(kind: CounterCipher, key: &[u8]) -> Result<Self, SrtpError> {
        let bad_key = |_| SrtpError::Key("unsupported cipher key length");
        Ok(match (kind, key.len()) {
            (CounterCipher::Aes, 16) => BlockCipher::Aes128(Aes128::new_from_slice(key).map_err(bad_key)?),
            (CounterCipher::Aes, 24) => BlockCipher::Aes192(Aes192::new_from_slice(key).map_err(bad_key)?),
            (CounterCipher::Aes, 32) => BlockCipher::Aes256(Aes256::new_from_slice(key).map_err(bad_key)?),
            (CounterCipher::Twofish, 16 | 24 | 32) => {
                BlockCipher::Twofish(Box::new(Twofish::new_from_slice(key).map_err(bad_key)?))
            }
            _ => return Err(SrtpError::Key("unsupported cipher key length")),
        })
    }

    /// XORs `data` with the keystream E(k, iv), E(k, iv + 1), ...
    pub(crate) fn apply_keystream(&self, iv: &[u8; BLOCK_LEN], data: &mut [u8]) {
        let iv = GenericArray::from_slice(iv);
        match self {
            BlockCipher::Aes128(c) => Ctr128BE::<Aes128>::from_core(CtrCore::inner_iv_init(c.clone(), iv)).apply_keystream(data),
            BlockCipher::Aes192(c) => Ctr128BE::<Aes192>::from_core(CtrCore::inner_iv_init(c.clone(), iv)).apply_keystream(data),
            BlockCipher::Aes256(c) => Ctr128BE::<Aes256>::from_core(CtrCore::inner_iv_init(c.clone(), iv)).apply_keystream(data),
            BlockCipher::Twofish(c) => {
                Ctr128BE::<Twofish>::from_core(CtrCore::inner_iv_init(c.as_ref().clone(), iv)).apply_keystream(data)
            }
        }
    }
}

/// IV = (salt << 16) XOR (ssrc << 64) XOR (index << 16).
pub(crate) fn packet_iv(salt: &[u8; 14], ssrc: u32, index: u64) -> [u8; BLOCK_LEN] {
    let mut iv = [0u8; BLOCK_LEN];
    iv[..14].copy_from_slice(salt);
    for (byte, s) in iv[4..8].iter_mut().zip(ssrc.to_be_bytes()) {
        *byte ^= s;
    }
    // 48-bit index in bytes 8..14
    for (byte, x) in iv[8..14].iter_mut().zip(&index.to_be_bytes()[2..]) {
        *byte ^= x;
    }
    iv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_aes_cm_keystream_vector() {
        // RFC 3711 Appendix B.2
        let cipher = BlockCipher::new(CounterCipher::Aes, &hex("2B7E151628AED2A6ABF7158809CF4F3C")).unwrap();
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&hex("F0F1F2F3F4F5F6F7F8F9FAFBFCFD0000"));
        let mut stream = [0u8; 32];
        cipher.apply_keystream(&iv, &mut stream);
        assert_eq!(
            stream.to_vec(),
            hex("E03EAD0935C95E80E166B16DD92B4EB4D23513162B02D0F72A43A2FE4A5F97AB")
        );
    }

    #[test]
    fn test_partial_block_keystream_is_a_prefix() {
        let cipher = BlockCipher::new(CounterCipher::Aes, &[3u8; 32]).unwrap();
        let iv = packet_iv(&[9; 14], 0xcafe, 0xffff);
        let mut long = [0u8; 48];
        let mut short = [0u8; 37];
        cipher.apply_keystream(&iv, &mut long);
        cipher.apply_keystream(&iv, &mut short);
        assert_eq!(&long[..37], &short[..]);
        assert_ne!(&long[..16], &long[16..32]);
    }

    #[test]
    fn test_twofish_keystream_is_an_involution() {
        let cipher = BlockCipher::new(CounterCipher::Twofish, &[7u8; 32]).unwrap();
        let iv = packet_iv(&[1; 14], 0x1234, 99);
        let mut data = b"twofish counter mode payload".to_vec();
        cipher.apply_keystream(&iv, &mut data);
        assert_ne!(&data[..], b"twofish counter mode payload");
        cipher.apply_keystream(&iv, &mut data);
        assert_eq!(&data[..], b"twofish counter mode payload");
    }

    #[test]
    fn test_rejects_bad_key_length() {
        assert!(BlockCipher::new(CounterCipher::Aes, &[0; 15]).is_err());
        assert!(BlockCipher::new(CounterCipher::Twofish, &[0; 8]).is_err());
    }

    #[test]
    fn test_packet_iv_layout() {
        let iv = packet_iv(&[0; 14], 0xaabbccdd, 0x0102_0304_0506);
        assert_eq!(&iv[4..8], &[0xaa, 0xbb, 0xcc, 0xdd]);
        assert_eq!(&iv[8..14], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(&iv[14..], &[0, 0]);
    }
}
