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

//! SRTP and SRTCP (RFC 3711) for ZRTP-keyed media.
//!
//! Counter mode over AES or Twofish, HMAC-SHA1 authentication with a 32 or
//! 80 bit tag, key derivation rate 0 and no MKI.

mod cipher;
mod error;
pub mod kdf;
pub mod replay;
pub mod rtp;
mod srtcp;
mod srtp;
mod streams;

pub use cipher::CounterCipher;
pub use error::SrtpError;
pub use srtcp::{SrtcpContext, SRTCP_E_FLAG, SRTCP_INDEX_MASK};
pub use srtp::SrtpContext;
pub use streams::SrtpStreams;

/// Master key material and transform choice for one direction.
#[derive(Clone, PartialEq, Eq)]
pub struct SrtpParams {
    pub cipher: CounterCipher,
    pub master_key: Vec<u8>,
    pub master_salt: Vec<u8>,
    /// Authentication tag length in bytes, 4 or 10.
    pub tag_len: usize,
}

impl SrtpParams {
    fn validate(&self) -> Result<(), SrtpError> {
        if !matches!(self.master_key.len(), 16 | 24 | 32) {
            return Err(SrtpError::Key("master key must be 16, 24 or 32 bytes"));
        }
        if self.master_salt.len() != kdf::SALT_LEN {
            return Err(SrtpError::Key("master salt must be 14 bytes"));
        }
        if self.tag_len == 0 || self.tag_len > kdf::AUTH_KEY_LEN {
            return Err(SrtpError::Key("unsupported tag length"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SrtpParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrtpParams")
            .field("cipher", &self.cipher)
            .field("key_len", &self.master_key.len())
            .field("tag_len", &self.tag_len)
            .finish()
    }
}
