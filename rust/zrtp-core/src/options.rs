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

use zrtp_crypto::{AuthTagAlgorithm, CipherAlgorithm, HashAlgorithm, KeyAgreement, SasType};

/// Retransmission schedule of one protocol timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSchedule {
    /// First timeout in milliseconds.
    pub start_ms: u32,
    /// Upper bound for the doubled timeout.
    pub cap_ms: u32,
    /// Retransmissions before giving up.
    pub max_retries: u32,
}

impl TimerSchedule {
    /// T1, used for Hello.
    pub const T1: TimerSchedule = TimerSchedule {
        start_ms: 50,
        cap_ms: 200,
        max_retries: 20,
    };

    /// T2, used for Commit, DHPart2, Confirm2, GoClear, Error and SASrelay.
    pub const T2: TimerSchedule = TimerSchedule {
        start_ms: 150,
        cap_ms: 1200,
        max_retries: 10,
    };
}

/// Per-session configuration of the ZRTP engine.
///
/// Algorithm lists are in preference order. Key agreements list only DH
/// types; multi-stream is always offered in Hello.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZrtpOptions {
    /// Sent in Hello, truncated or space padded to 16 bytes.
    pub client_id: String,
    pub hashes: Vec<HashAlgorithm>,
    pub ciphers: Vec<CipherAlgorithm>,
    pub auth_tags: Vec<AuthTagAlgorithm>,
    pub key_agreements: Vec<KeyAgreement>,
    pub sas_types: Vec<SasType>,
    /// Passive endpoints never send Commit; the peer has to.
    pub passive: bool,
    /// Act as a trusted MiTM (PBX): sets the M flag and allows SAS relay.
    pub mitm_mode: bool,
    /// PBX: offer enrollment in Confirm. Client: honor enrollment requests.
    pub enrollment: bool,
    /// Allow the peer to switch the session back to clear.
    pub allow_clear: bool,
    /// Retained secret lifetime offered in Confirm, in seconds.
    pub cache_expiry: u32,
    pub t1: TimerSchedule,
    pub t2: TimerSchedule,
}

impl Default for ZrtpOptions {
    fn default() -> Self {
        Self {
            client_id: "zrtp-rs".to_string(),
            hashes: vec![HashAlgorithm::S256, HashAlgorithm::S384],
            ciphers: vec![
                CipherAlgorithm::Aes1,
                CipherAlgorithm::Aes3,
                CipherAlgorithm::TwoFish1,
                CipherAlgorithm::TwoFish3,
            ],
            auth_tags: vec![AuthTagAlgorithm::Hs32, AuthTagAlgorithm::Hs80],
            key_agreements: vec![KeyAgreement::X255, KeyAgreement::Ec25],
            sas_types: vec![SasType::B32, SasType::B256],
            passive: false,
            mitm_mode: false,
            enrollment: true,
            allow_clear: false,
            cache_expiry: zrtp_cache::CONFIRM_EXPIRY_FOREVER,
            t1: TimerSchedule::T1,
            t2: TimerSchedule::T2,
        }
    }
}

impl ZrtpOptions {
    /// Profile of a trusted PBX that enrolls its clients.
    pub fn pbx() -> Self {
        Self {
            client_id: "zrtp-rs PBX".to_string(),
            mitm_mode: true,
            enrollment: true,
            ..Self::default()
        }
    }

    pub(crate) fn client_id_bytes(&self) -> [u8; 16] {
        let mut id = [b' '; 16];
        let src = self.client_id.as_bytes();
        let n = src.len().min(16);
        id[..n].copy_from_slice(&src[..n]);
        id
    }

    /// Key agreements as offered in Hello, multi-stream last.
    pub(crate) fn offered_key_agreements(&self) -> Vec<KeyAgreement> {
        let mut list: Vec<KeyAgreement> = self
            .key_agreements
            .iter()
            .copied()
            .filter(|ka| *ka != KeyAgreement::Mult)
            .collect();
        list.push(KeyAgreement::Mult);
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_is_padded() {
        let options = ZrtpOptions {
            client_id: "abc".into(),
            ..Default::default()
        };
        assert_eq!(&options.client_id_bytes(), b"abc             ");
        let long = ZrtpOptions {
            client_id: "a very long client identifier".into(),
            ..Default::default()
        };
        assert_eq!(&long.client_id_bytes(), b"a very long clie");
    }

    #[test]
    fn test_multi_stream_always_offered_once() {
        let options = ZrtpOptions {
            key_agreements: vec![KeyAgreement::Mult, KeyAgreement::X255],
            ..Default::default()
        };
        assert_eq!(
            options.offered_key_agreements(),
            vec![KeyAgreement::X255, KeyAgreement::Mult]
        );
    }

    #[test]
    fn test_pbx_profile() {
        let pbx = ZrtpOptions::pbx();
        assert!(pbx.mitm_mode && pbx.enrollment);
        assert_eq!(pbx.t2, TimerSchedule::T2);
    }
}
