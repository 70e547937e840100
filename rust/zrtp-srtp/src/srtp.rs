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

//! SRTP crypto context for one SSRC (RFC 3711 3.3 and 3.4).

use ring::hmac;
use zrtp_crypto::constant_time_eq;

use crate::cipher::{packet_iv, BlockCipher};
use crate::error::SrtpError;
use crate::kdf::{Label, SessionKeys};
use crate::replay::{estimate_index, ReplayWindow};
use crate::rtp::RtpHeader;
use crate::SrtpParams;

/// Computes the truncated HMAC-SHA1 tag over `parts`.
pub(crate) fn auth_tag(key: &hmac::Key, parts: &[&[u8]], tag_len: usize) -> Vec<u8> {
    let mut ctx = hmac::Context::with_key(key);
    for part in parts {
        ctx.update(part);
    }
    let mut tag = ctx.sign().as_ref().to_vec();
    tag.truncate(tag_len);
    tag
}

/// Protects or unprotects RTP packets of a single SSRC in one direction.
pub struct SrtpContext {
    keys: SessionKeys,
    cipher: BlockCipher,
    auth: hmac::Key,
    tag_len: usize,
    window: ReplayWindow,
}

impl SrtpContext {
    /// Derives the SRTP session keys from the master key and salt.
    pub fn new(params: &SrtpParams) -> Result<Self, SrtpError> {
        params.validate()?;
        let keys = SessionKeys::derive(
            params.cipher,
            &params.master_key,
            &params.master_salt,
            [Label::RtpEncryption, Label::RtpAuthentication, Label::RtpSalt],
        )?;
        Self::from_keys(keys, params.tag_len)
    }

    fn from_keys(keys: SessionKeys, tag_len: usize) -> Result<Self, SrtpError> {
        Ok(Self {
            cipher: keys.cipher()?,
            auth: hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, &keys.auth_key),
            keys,
            tag_len,
            window: ReplayWindow::default(),
        })
    }

    /// A context with the same session keys and fresh ROC and replay state.
    pub fn fork(&self) -> Result<Self, SrtpError> {
        Self::from_keys(self.keys.clone(), self.tag_len)
    }

    pub fn tag_len(&self) -> usize {
        self.tag_len
    }

    /// Current rollover counter.
    pub fn roc(&self) -> u32 {
        self.window.top().map_or(0, |top| (top >> 16) as u32)
    }

    /// Highest packet index processed so far.
    pub fn highest_index(&self) -> Option<u64> {
        self.window.top()
    }

    /// Encrypts the payload and appends the authentication tag.
    pub fn protect(&mut self, packet: &[u8]) -> Result<Vec<u8>, SrtpError> {
        let header = RtpHeader::parse(packet)?;
        let index = estimate_index(self.window.top(), header.sequence)
            .ok_or(SrtpError::Malformed("sequence number before stream start"))?;
        let roc = (index >> 16) as u32;

        let mut out = Vec::with_capacity(packet.len() + self.tag_len);
        out.extend_from_slice(packet);
        let iv = packet_iv(&self.keys.salt, header.ssrc, index);
        self.cipher.apply_keystream(&iv, &mut out[header.header_len..]);

        let tag = auth_tag(&self.auth, &[&out, &roc.to_be_bytes()], self.tag_len);
        out.extend_from_slice(&tag);

        self.window.accept(index);
        Ok(out)
    }

    /// Verifies and decrypts an SRTP packet.
    ///
    /// The replay check and the tag check both run before decryption, and
    /// state is only updated once both have passed.
    pub fn unprotect(&mut self, packet: &[u8]) -> Result<Vec<u8>, SrtpError> {
        if packet.len() < self.tag_len {
            return Err(SrtpError::Malformed("SRTP packet shorter than tag"));
        }
        let (authenticated, tag) = packet.split_at(packet.len() - self.tag_len);
        let header = RtpHeader::parse(authenticated)?;

        let index = estimate_index(self.window.top(), header.sequence)
            .ok_or(SrtpError::Replay(u64::from(header.sequence)))?;
        self.window.check(index)?;

        let roc = (index >> 16) as u32;
        let expected = auth_tag(&self.auth, &[authenticated, &roc.to_be_bytes()], self.tag_len);
        if !constant_time_eq(&expected, tag) {
            return Err(SrtpError::Auth);
        }

        let mut out = authenticated.to_vec();
        let iv = packet_iv(&self.keys.salt, header.ssrc, index);
        self.cipher.apply_keystream(&iv, &mut out[header.header_len..]);

        self.window.accept(index);
        Ok(out)
    }
}

impl std::fmt::Debug for SrtpContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrtpContext")
            .field("tag_len", &self.tag_len)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
