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

//! Per-session key material: the H0..H3 hash chain and the negotiated
//! algorithm set.

use zrtp_crypto::backends::Sha256;
use zrtp_crypto::{
    random_array, AlgorithmId, AuthTagAlgorithm, CipherAlgorithm, Hash, HashAlgorithm,
    KeyAgreement, SasType,
};
use zrtp_proto::MAC_LEN;

/// SHA-256, used for the hash chain and the message MACs regardless of
/// the negotiated hash.
pub(crate) fn implicit_hash(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256.digest(data));
    out
}

/// Truncated HMAC-SHA-256 carried at the end of Hello, Commit and DHPart.
pub(crate) fn implicit_mac(key: &[u8], data: &[u8]) -> [u8; MAC_LEN] {
    let mut out = [0u8; MAC_LEN];
    out.copy_from_slice(&Sha256.hmac(key, data)[..MAC_LEN]);
    out
}

/// H0 is random, every further link is the hash of the previous one.
///
/// H3 goes into Hello, H2 into Commit, H1 into DHPart and H0 into Confirm,
/// so each message authenticates the one sent before it.
#[derive(Clone)]
pub(crate) struct HashChain {
    pub h0: [u8; 32],
    pub h1: [u8; 32],
    pub h2: [u8; 32],
    pub h3: [u8; 32],
}

impl HashChain {
    pub fn new() -> Self {
        let h0 = random_array::<32>();
        let h1 = implicit_hash(&h0);
        let h2 = implicit_hash(&h1);
        let h3 = implicit_hash(&h2);
        Self { h0, h1, h2, h3 }
    }
}

/// The algorithm set a session runs with once Commit is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedAlgorithms {
    pub hash: HashAlgorithm,
    pub cipher: CipherAlgorithm,
    pub auth_tag: AuthTagAlgorithm,
    pub key_agreement: KeyAgreement,
    pub sas: SasType,
}

impl NegotiatedAlgorithms {
    /// Short description, e.g. `AES1/HS32/EC25/B32`.
    pub fn describe(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.cipher.name(),
            self.auth_tag.name(),
            self.key_agreement.name(),
            self.sas.name()
        )
    }

    /// Negotiated hash truncated to 256 bits, as used for hvi.
    pub(crate) fn hash_256(&self, parts: &[&[u8]]) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.hash.provider().digest_parts(parts)[..32]);
        out
    }

    /// Ciphers with 256 bit keys offer more than the 128 bit ECDH groups.
    pub(crate) fn strength_mismatch(&self) -> bool {
        self.cipher.key_len() == 32
            && matches!(self.key_agreement, KeyAgreement::Ec25 | KeyAgreement::X255)
    }
}
