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

//! ZRTP key derivation.

use crate::traits::Hash;

/// Label mixed into s0 for a Diffie-Hellman exchange.
pub const S0_LABEL: &[u8] = b"ZRTP-HMAC-KDF";
/// Length of sashash and of a retained secret.
pub const RS_LEN: usize = 32;
/// SRTP master salt length.
pub const SRTP_SALT_LEN: usize = 14;

/// All keys derived from s0 for one ZRTP stream.
#[derive(Clone)]
pub struct ZrtpKeys {
    /// SRTP master key for initiator.
    pub srtp_key_i: Vec<u8>,
    /// SRTP master salt for initiator.
    pub srtp_salt_i: Vec<u8>,
    /// SRTP master key for responder.
    pub srtp_key_r: Vec<u8>,
    /// SRTP master salt for responder.
    pub srtp_salt_r: Vec<u8>,
    /// MAC key over the initiator's Confirm and SASrelay.
    pub hmac_key_i: Vec<u8>,
    /// MAC key over the responder's Confirm and SASrelay.
    pub hmac_key_r: Vec<u8>,
    /// Cipher key for the initiator's Confirm body.
    pub zrtp_key_i: Vec<u8>,
    /// Cipher key for the responder's Confirm body.
    pub zrtp_key_r: Vec<u8>,
    pub sas_hash: Vec<u8>,
    /// ZRTPSess, the root of multi-stream keys.
    pub zrtp_session: Vec<u8>,
    pub exported_key: Vec<u8>,
    /// The retained secret that replaces rs1 once the stream is confirmed.
    pub new_rs1: Vec<u8>,
    /// Key a trusted PBX registers with during enrollment.
    pub trusted_mitm_key: Vec<u8>,
}

impl std::fmt::Debug for ZrtpKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZrtpKeys").finish_non_exhaustive()
    }
}

/// KDF_Context = ZIDi | ZIDr | total_hash.
pub fn kdf_context(zid_i: &[u8; 12], zid_r: &[u8; 12], total_hash: &[u8]) -> Vec<u8> {
    let mut context = Vec::with_capacity(24 + total_hash.len());
    context.extend_from_slice(zid_i);
    context.extend_from_slice(zid_r);
    context.extend_from_slice(total_hash);
    context
}

/// Derives s0 for a Diffie-Hellman exchange (RFC 6189 Section 4.4.1.4).
///
/// s0 = hash(1 | DHResult | "ZRTP-HMAC-KDF" | ZIDi | ZIDr | total_hash
///           | len(s1) | s1 | len(s2) | s2 | len(s3) | s3)
///
/// An absent shared secret contributes a zero length and no bytes.
#[allow(clippy::too_many_arguments)]
pub fn derive_s0(
    hash: &dyn Hash,
    dh_result: &[u8],
    zid_i: &[u8; 12],
    zid_r: &[u8; 12],
    total_hash: &[u8],
    s1: Option<&[u8]>,
    s2: Option<&[u8]>,
    s3: Option<&[u8]>,
) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(dh_result);
    data.extend_from_slice(S0_LABEL);
    data.extend_from_slice(zid_i);
    data.extend_from_slice(zid_r);
    data.extend_from_slice(total_hash);

    for secret in [s1, s2, s3] {
        match secret {
            Some(secret) => {
                data.extend_from_slice(&(secret.len() as u32).to_be_bytes());
                data.extend_from_slice(secret);
            }
            None => data.extend_from_slice(&0u32.to_be_bytes()),
        }
    }

    hash.digest(&data)
}

/// Derives s0 for a multi-stream session from the master's ZRTPSess.
pub fn derive_multi_stream_s0(hash: &dyn Hash, zrtp_session: &[u8], context: &[u8]) -> Vec<u8> {
    hash.kdf(zrtp_session, b"ZRTP MSK", context, hash.output_len())
}

/// Derives every session key from s0 (RFC 6189 Section 4.5.3).
pub fn derive_session_keys(hash: &dyn Hash, s0: &[u8], context: &[u8], cipher_key_len: usize) -> ZrtpKeys {
    let hash_len = hash.output_len();
    let kdf = |label: &[u8], len: usize| hash.kdf(s0, label, context, len);

    ZrtpKeys {
        srtp_key_i: kdf(b"Initiator SRTP master key", cipher_key_len),
        srtp_salt_i: kdf(b"Initiator SRTP master salt", SRTP_SALT_LEN),
        srtp_key_r: kdf(b"Responder SRTP master key", cipher_key_len),
        srtp_salt_r: kdf(b"Responder SRTP master salt", SRTP_SALT_LEN),
        hmac_key_i: kdf(b"Initiator HMAC key", hash_len),
        hmac_key_r: kdf(b"Responder HMAC key", hash_len),
        zrtp_key_i: kdf(b"Initiator ZRTP key", cipher_key_len),
        zrtp_key_r: kdf(b"Responder ZRTP key", cipher_key_len),
        sas_hash: kdf(b"SAS", RS_LEN),
        zrtp_session: kdf(b"ZRTP Session Key", hash_len),
        exported_key: kdf(b"Exported key", hash_len),
        new_rs1: kdf(b"retained secret", RS_LEN),
        trusted_mitm_key: kdf(b"Trusted MiTM key", hash_len),
    }
}

/// Identifier of a retained secret as sent in DHPart: MAC(rs, role) truncated to 64 bits.
pub fn retained_secret_id(hash: &dyn Hash, secret: &[u8], role_label: &[u8]) -> [u8; 8] {
    let mac = hash.hmac(secret, role_label);
    let mut id = [0u8; 8];
    id.copy_from_slice(&mac[..8]);
    id
}
