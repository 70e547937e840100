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

//! SRTP session key derivation (RFC 3711 4.3) at key derivation rate 0.

use crate::cipher::{BlockCipher, CounterCipher, BLOCK_LEN};
use crate::error::SrtpError;

pub const SALT_LEN: usize = 14;
/// HMAC-SHA1 session authentication key length.
pub const AUTH_KEY_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Label {
    RtpEncryption = 0,
    RtpAuthentication = 1,
    RtpSalt = 2,
    RtcpEncryption = 3,
    RtcpAuthentication = 4,
    RtcpSalt = 5,
}

/// Derives `len` bytes of session key material for `label`.
///
/// With a zero derivation rate r is always zero, so the key id is the label
/// byte XORed into the salt at byte 7.
pub fn derive(
    kind: CounterCipher,
    master_key: &[u8],
    master_salt: &[u8],
    label: Label,
    len: usize,
) -> Result<Vec<u8>, SrtpError> {
    if master_salt.len() != SALT_LEN {
        return Err(SrtpError::Key("master salt must be 14 bytes"));
    }
    let prf = BlockCipher::new(kind, master_key)?;

    let mut iv = [0u8; BLOCK_LEN];
    iv[..SALT_LEN].copy_from_slice(master_salt);
    iv[7] ^= label as u8;

    let mut out = vec![0u8; len];
    prf.apply_keystream(&iv, &mut out);
    Ok(out)
}

/// The three session values of one protocol (SRTP or SRTCP).
#[derive(Clone)]
pub(crate) struct SessionKeys {
    pub kind: CounterCipher,
    pub enc_key: Vec<u8>,
    pub salt: [u8; SALT_LEN],
    pub auth_key: Vec<u8>,
}

impl SessionKeys {
    pub(crate) fn derive(
        kind: CounterCipher,
        master_key: &[u8],
        master_salt: &[u8],
        labels: [Label; 3],
    ) -> Result<Self, SrtpError> {
        let [enc, auth, salt_label] = labels;
        let enc_key = derive(kind, master_key, master_salt, enc, master_key.len())?;
        let auth_key = derive(kind, master_key, master_salt, auth, AUTH_KEY_LEN)?;
        let salt_bytes = derive(kind, master_key, master_salt, salt_label, SALT_LEN)?;

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&salt_bytes);
        Ok(Self {
            kind,
            enc_key,
            salt,
            auth_key,
        })
    }

    pub(crate) fn cipher(&self) -> Result<BlockCipher, SrtpError> {
        BlockCipher::new(self.kind, &self.enc_key)
    }
}
