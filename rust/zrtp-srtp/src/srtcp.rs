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

//! SRTCP crypto context for one SSRC (RFC 3711 3.4).

use ring::hmac;
use zrtp_crypto::constant_time_eq;

use crate::cipher::{packet_iv, BlockCipher};
use crate::error::SrtpError;
use crate::kdf::{Label, SessionKeys};
use crate::replay::ReplayWindow;
use crate::rtp::{rtcp_ssrc, RTCP_HEADER_LEN};
use crate::srtp::auth_tag;
use crate::SrtpParams;

/// The E flag on top of the SRTCP index word.
pub const SRTCP_E_FLAG: u32 = 0x8000_0000;
pub const SRTCP_INDEX_MASK: u32 = 0x7fff_ffff;
const INDEX_LEN: usize = 4;

pub struct SrtcpContext {
    keys: SessionKeys,
    cipher: BlockCipher,
    auth: hmac::Key,
    tag_len: usize,
    next_index: u32,
    window: ReplayWindow,
}

impl SrtcpContext {
    /// Derives the SRTCP session keys from the master key and salt.
    pub fn new(params: &SrtpParams) -> Result<Self, SrtpError> {
        params.validate()?;
        let keys = SessionKeys::derive(
            params.cipher,
            &params.master_key,
            &params.master_salt,
            [Label::RtcpEncryption, Label::RtcpAuthentication, Label::RtcpSalt],
        )?;
        Self::from_keys(keys, params.tag_len)
    }

    fn from_keys(keys: SessionKeys, tag_len: usize) -> Result<Self, SrtpError> {
        Ok(Self {
            cipher: keys.cipher()?,
            auth: hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, &keys.auth_key),
            keys,
            tag_len,
            next_index: 0,
            window: ReplayWindow::default(),
        })
    }

    /// A context with the same session keys, index zero and an empty window.
    pub fn fork(&self) -> Result<Self, SrtpError> {
        Self::from_keys(self.keys.clone(), self.tag_len)
    }

    /// Index the next protected packet will carry.
    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    /// Sets the outbound index, e.g. to resume a stream.
    pub fn set_next_index(&mut self, index: u32) {
        self.next_index = index & SRTCP_INDEX_MASK;
    }

    /// Encrypts everything after the first 8 bytes, then appends E|index and the tag.
    pub fn protect(&mut self, packet: &[u8]) -> Result<Vec<u8>, SrtpError> {
        let ssrc = rtcp_ssrc(packet)?;
        let index = self.next_index;

        let mut out = Vec::with_capacity(packet.len() + INDEX_LEN + self.tag_len);
        out.extend_from_slice(packet);
        let iv = packet_iv(&self.keys.salt, ssrc, u64::from(index));
        self.cipher.apply_keystream(&iv, &mut out[RTCP_HEADER_LEN..]);
        out.extend_from_slice(&(SRTCP_E_FLAG | index).to_be_bytes());

        let tag = auth_tag(&self.auth, &[&out], self.tag_len);
        out.extend_from_slice(&tag);

        self.next_index = index.wrapping_add(1) & SRTCP_INDEX_MASK;
        Ok(out)
    }

    /// Verifies and, if the E flag is set, decrypts an SRTCP packet.
    pub fn unprotect(&mut self, packet: &[u8]) -> Result<Vec<u8>, SrtpError> {
        if packet.len() < RTCP_HEADER_LEN + INDEX_LEN + self.tag_len {
            return Err(SrtpError::Malformed("SRTCP packet too short"));
        }
        let (authenticated, tag) = packet.split_at(packet.len() - self.tag_len);
        let (rtcp, index_word) = authenticated.split_at(authenticated.len() - INDEX_LEN);
        let ssrc = rtcp_ssrc(rtcp)?;

        let word = u32::from_be_bytes([index_word[0], index_word[1], index_word[2], index_word[3]]);
        let index = u64::from(word & SRTCP_INDEX_MASK);
        self.window.check(index)?;

        let expected = auth_tag(&self.auth, &[authenticated], self.tag_len);
        if !constant_time_eq(&expected, tag) {
            return Err(SrtpError::Auth);
        }

        let mut out = rtcp.to_vec();
        if word & SRTCP_E_FLAG != 0 {
            let iv = packet_iv(&self.keys.salt, ssrc, index);
            self.cipher.apply_keystream(&iv, &mut out[RTCP_HEADER_LEN..]);
        }

        self.window.accept(index);
        Ok(out)
    }
}

impl std::fmt::Debug for SrtcpContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrtcpContext")
            .field("tag_len", &self.tag_len)
            .field("next_index", &self.next_index)
            .finish_non_exhaustive()
    }
}
