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

use crate::traits::Cipher;
use aes::{Aes128, Aes256};
use anyhow::{anyhow, Result};
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use twofish::Twofish;

/// Block cipher family used under CFB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfbFamily {
    Aes,
    Twofish,
}

/// 128-bit CFB mode over AES or Twofish, implementing [`Cipher`].
///
/// Confirm and SASrelay bodies are encrypted with this; the key length
/// selects AES-128/256 or Twofish-128/256.
#[derive(Debug, Clone, Copy)]
pub struct CfbCipher {
    family: CfbFamily,
    key_len: usize,
}

macro_rules! cfb_apply {
    ($mode:ident, $cipher:ty, $op:ident, $key:expr, $iv:expr, $buf:expr) => {{
        let c = cfb_mode::$mode::<$cipher>::new_from_slices($key, $iv)
            .map_err(|e| anyhow!("Cipher error: {}", e))?;
        c.$op($buf);
    }};
}

impl CfbCipher {
    /// AES in CFB mode with a 16 or 32 byte key.
    pub fn aes(key_len: usize) -> Self {
        Self { family: CfbFamily::Aes, key_len }
    }

    /// Twofish in CFB mode with a 16 or 32 byte key.
    pub fn twofish(key_len: usize) -> Self {
        Self { family: CfbFamily::Twofish, key_len }
    }

    fn check(&self, key: &[u8], iv: &[u8]) -> Result<()> {
        if key.len() != self.key_len || iv.len() != 16 {
            return Err(anyhow!(
                "Invalid key or IV length for {:?}-{}",
                self.family,
                self.key_len * 8
            ));
        }
        Ok(())
    }

    fn apply(&self, key: &[u8], iv: &[u8], buf: &mut [u8], encrypt: bool) -> Result<()> {
        self.check(key, iv)?;
        match (self.family, self.key_len, encrypt) {
            (CfbFamily::Aes, 16, true) => cfb_apply!(Encryptor, Aes128, encrypt, key, iv, buf),
            (CfbFamily::Aes, 16, false) => cfb_apply!(Decryptor, Aes128, decrypt, key, iv, buf),
            (CfbFamily::Aes, 32, true) => cfb_apply!(Encryptor, Aes256, encrypt, key, iv, buf),
            (CfbFamily::Aes, 32, false) => cfb_apply!(Decryptor, Aes256, decrypt, key, iv, buf),
            (CfbFamily::Twofish, _, true) => cfb_apply!(Encryptor, Twofish, encrypt, key, iv, buf),
            (CfbFamily::Twofish, _, false) => cfb_apply!(Decryptor, Twofish, decrypt, key, iv, buf),
            (family, len, _) => return Err(anyhow!("Unsupported {:?} key length {}", family, len)),
        }
        Ok(())
    }
}

impl Cipher for CfbCipher {
    fn encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut buffer = plaintext.to_vec();
        self.apply(key, iv, &mut buffer, true)?;
        Ok(buffer)
    }

    fn decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let mut buffer = ciphertext.to_vec();
        self.apply(key, iv, &mut buffer, false)?;
        Ok(buffer)
    }

    fn key_len(&self) -> usize {
        self.key_len
    }

    fn iv_len(&self) -> usize {
        16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cfb_variants_round_trip() {
        let iv = [0x24; 16];
        // 40 bytes: not a multiple of the block size, like a Confirm body.
        let plain = [0x42u8; 40];
        for cipher in [
            CfbCipher::aes(16),
            CfbCipher::aes(32),
            CfbCipher::twofish(16),
            CfbCipher::twofish(32),
        ] {
            let key = vec![0x11; cipher.key_len()];
            let ct = cipher.encrypt(&key, &iv, &plain).unwrap();
            assert_eq!(ct.len(), plain.len());
            assert_ne!(&ct[..], &plain[..]);
            assert_eq!(cipher.decrypt(&key, &iv, &ct).unwrap(), plain);
        }
    }

    #[test]
    fn test_aes_and_twofish_differ() {
        let key = [7u8; 16];
        let iv = [0u8; 16];
        let a = CfbCipher::aes(16).encrypt(&key, &iv, &[0; 16]).unwrap();
        let t = CfbCipher::twofish(16).encrypt(&key, &iv, &[0; 16]).unwrap();
        assert_ne!(a, t);
    }

    #[test]
    fn test_wrong_key_length_rejected() {
        assert!(CfbCipher::aes(16).encrypt(&[0; 32], &[0; 16], b"x").is_err());
        assert!(CfbCipher::aes(32).decrypt(&[0; 32], &[0; 8], b"x").is_err());
    }
}
