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

//! Algorithm identifiers exchanged in Hello and Commit, and the providers
//! they select.

use crate::backends::{CfbCipher, EcP256, Sha256, Sha384, X25519};
use crate::sas::{render_sas_base32, render_sas_words};
use crate::traits::{Cipher, DiffieHellman, Hash};

/// Common behavior of every negotiable algorithm enum.
pub trait AlgorithmId: Sized + Copy + PartialEq + 'static {
    /// All supported values, strongest or preferred first.
    const ALL: &'static [Self];
    /// The mandatory-to-implement fallback.
    const MANDATORY: Self;

    /// The 4-byte identifier used on the wire.
    fn id(&self) -> [u8; 4];

    /// Looks up an identifier received from the peer.
    fn from_id(id: &[u8; 4]) -> Option<Self> {
        Self::ALL.iter().copied().find(|alg| &alg.id() == id)
    }

    /// The identifier as text, for logs and the cipher info string.
    fn name(&self) -> String {
        String::from_utf8_lossy(&self.id()).trim_end().to_string()
    }
}

/// Picks the first entry of `local` (preference order) that the peer offers.
///
/// Falls back to the mandatory algorithm when there is no overlap.
pub fn negotiate<A: AlgorithmId>(local: &[A], peer_offer: &[[u8; 4]]) -> A {
    local
        .iter()
        .copied()
        .find(|alg| peer_offer.contains(&alg.id()))
        .unwrap_or(A::MANDATORY)
}

/// Negotiated hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    S384,
    S256,
}

impl AlgorithmId for HashAlgorithm {
    const ALL: &'static [Self] = &[HashAlgorithm::S384, HashAlgorithm::S256];
    const MANDATORY: Self = HashAlgorithm::S256;

    fn id(&self) -> [u8; 4] {
        match self {
            HashAlgorithm::S256 => *b"S256",
            HashAlgorithm::S384 => *b"S384",
        }
    }
}

impl HashAlgorithm {
    /// Creates the hash provider.
    pub fn provider(&self) -> Box<dyn Hash> {
        match self {
            HashAlgorithm::S256 => Box::new(Sha256),
            HashAlgorithm::S384 => Box::new(Sha384),
        }
    }

    /// Digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::S256 => 32,
            HashAlgorithm::S384 => 48,
        }
    }
}

/// Negotiated symmetric cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherAlgorithm {
    Aes3,
    TwoFish3,
    Aes1,
    TwoFish1,
}

impl AlgorithmId for CipherAlgorithm {
    const ALL: &'static [Self] = &[
        CipherAlgorithm::Aes3,
        CipherAlgorithm::TwoFish3,
        CipherAlgorithm::Aes1,
        CipherAlgorithm::TwoFish1,
    ];
    const MANDATORY: Self = CipherAlgorithm::Aes1;

    fn id(&self) -> [u8; 4] {
        match self {
            CipherAlgorithm::Aes1 => *b"AES1",
            CipherAlgorithm::Aes3 => *b"AES3",
            CipherAlgorithm::TwoFish1 => *b"2FS1",
            CipherAlgorithm::TwoFish3 => *b"2FS3",
        }
    }
}

impl CipherAlgorithm {
    /// Key length in bytes for both the ZRTP key and the SRTP master key.
    pub fn key_len(&self) -> usize {
        match self {
            CipherAlgorithm::Aes1 | CipherAlgorithm::TwoFish1 => 16,
            CipherAlgorithm::Aes3 | CipherAlgorithm::TwoFish3 => 32,
        }
    }

    /// True for the Twofish variants.
    pub fn is_twofish(&self) -> bool {
        matches!(self, CipherAlgorithm::TwoFish1 | CipherAlgorithm::TwoFish3)
    }

    /// Creates the CFB provider used for Confirm and SASrelay.
    pub fn provider(&self) -> Box<dyn Cipher> {
        if self.is_twofish() {
            Box::new(CfbCipher::twofish(self.key_len()))
        } else {
            Box::new(CfbCipher::aes(self.key_len()))
        }
    }
}

/// Negotiated SRTP authentication tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthTagAlgorithm {
    Hs80,
    Hs32,
}

impl AlgorithmId for AuthTagAlgorithm {
    const ALL: &'static [Self] = &[AuthTagAlgorithm::Hs80, AuthTagAlgorithm::Hs32];
    const MANDATORY: Self = AuthTagAlgorithm::Hs32;

    fn id(&self) -> [u8; 4] {
        match self {
            AuthTagAlgorithm::Hs32 => *b"HS32",
            AuthTagAlgorithm::Hs80 => *b"HS80",
        }
    }
}

impl AuthTagAlgorithm {
    /// SRTP tag length in bytes.
    pub fn tag_len(&self) -> usize {
        match self {
            AuthTagAlgorithm::Hs32 => 4,
            AuthTagAlgorithm::Hs80 => 10,
        }
    }
}

/// Negotiated key agreement type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAgreement {
    Ec25,
    X255,
    Mult,
}

impl AlgorithmId for KeyAgreement {
    const ALL: &'static [Self] = &[KeyAgreement::Ec25, KeyAgreement::X255, KeyAgreement::Mult];
    const MANDATORY: Self = KeyAgreement::Ec25;

    fn id(&self) -> [u8; 4] {
        match self {
            KeyAgreement::Ec25 => *b"EC25",
            KeyAgreement::X255 => *b"X255",
            KeyAgreement::Mult => *b"Mult",
        }
    }
}

impl KeyAgreement {
    /// Creates the DH provider, `None` for multi-stream.
    pub fn provider(&self) -> Option<Box<dyn DiffieHellman>> {
        match self {
            KeyAgreement::Ec25 => Some(Box::new(EcP256::default())),
            KeyAgreement::X255 => Some(Box::new(X25519::default())),
            KeyAgreement::Mult => None,
        }
    }

    /// Length of the public value carried in DHPart.
    pub fn public_key_len(&self) -> usize {
        match self {
            KeyAgreement::Ec25 => 64,
            KeyAgreement::X255 => 32,
            KeyAgreement::Mult => 0,
        }
    }
}

/// Negotiated SAS rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SasType {
    B32,
    B256,
}

impl AlgorithmId for SasType {
    const ALL: &'static [Self] = &[SasType::B32, SasType::B256];
    const MANDATORY: Self = SasType::B32;

    fn id(&self) -> [u8; 4] {
        match self {
            SasType::B32 => *b"B32 ",
            SasType::B256 => *b"B256",
        }
    }
}

impl SasType {
    /// Renders the SAS from the sashash.
    pub fn render(&self, sas_hash: &[u8]) -> String {
        match self {
            SasType::B32 => render_sas_base32(sas_hash),
            SasType::B256 => render_sas_words(sas_hash),
        }
    }
}

/// Identifier list of `algs` as sent in Hello.
pub fn id_list<A: AlgorithmId>(algs: &[A]) -> Vec<[u8; 4]> {
    algs.iter().map(|a| a.id()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_prefers_local_order() {
        let local = [CipherAlgorithm::Aes3, CipherAlgorithm::Aes1];
        let offer = [*b"2FS1", *b"AES1", *b"AES3"];
        assert_eq!(negotiate(&local, &offer), CipherAlgorithm::Aes3);
    }

    #[test]
    fn test_negotiate_falls_back_to_mandatory() {
        let local = [HashAlgorithm::S384];
        assert_eq!(negotiate(&local, &[*b"SKN3"]), HashAlgorithm::S256);
    }

    #[test]
    fn test_id_lookup() {
        assert_eq!(SasType::from_id(b"B256"), Some(SasType::B256));
        assert_eq!(KeyAgreement::from_id(b"DH3k"), None);
        assert_eq!(AuthTagAlgorithm::Hs80.name(), "HS80");
        assert_eq!(SasType::B32.name(), "B32");
        assert!(KeyAgreement::Mult.provider().is_none());
    }
}
