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

//! The opaque parameter blob a secure master session hands to the
//! sessions that join it in multi-stream mode.
//!
//! Layout: version (1), hash, cipher, auth tag and SAS ids (4 each),
//! peer ZID (12), ZRTPSess length (1), ZRTPSess.

use zrtp_cache::Zid;
use zrtp_crypto::{
    AlgorithmId, AuthTagAlgorithm, CipherAlgorithm, HashAlgorithm, KeyAgreement, SasType,
};

use crate::error::ZrtpError;
use crate::keys::NegotiatedAlgorithms;

const BLOB_VERSION: u8 = 1;
const FIXED_LEN: usize = 1 + 4 * 4 + 12 + 1;

#[derive(Clone, PartialEq, Eq)]
pub struct MultiStreamParams {
    pub algorithms: NegotiatedAlgorithms,
    pub peer_zid: Zid,
    pub zrtp_session: Vec<u8>,
}

impl MultiStreamParams {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(FIXED_LEN + self.zrtp_session.len());
        blob.push(BLOB_VERSION);
        blob.extend_from_slice(&self.algorithms.hash.id());
        blob.extend_from_slice(&self.algorithms.cipher.id());
        blob.extend_from_slice(&self.algorithms.auth_tag.id());
        blob.extend_from_slice(&self.algorithms.sas.id());
        blob.extend_from_slice(&self.peer_zid);
        blob.push(self.zrtp_session.len() as u8);
        blob.extend_from_slice(&self.zrtp_session);
        blob
    }

    pub fn from_bytes(blob: &[u8]) -> Result<Self, ZrtpError> {
        if blob.len() < FIXED_LEN {
            return Err(ZrtpError::BadMultiStreamParams("too short"));
        }
        if blob[0] != BLOB_VERSION {
            return Err(ZrtpError::BadMultiStreamParams("unknown version"));
        }
        let id = |at: usize| -> [u8; 4] {
            let mut id = [0u8; 4];
            id.copy_from_slice(&blob[at..at + 4]);
            id
        };
        let hash = HashAlgorithm::from_id(&id(1))
            .ok_or(ZrtpError::BadMultiStreamParams("hash"))?;
        let cipher = CipherAlgorithm::from_id(&id(5))
            .ok_or(ZrtpError::BadMultiStreamParams("cipher"))?;
        let auth_tag = AuthTagAlgorithm::from_id(&id(9))
            .ok_or(ZrtpError::BadMultiStreamParams("auth tag"))?;
        let sas = SasType::from_id(&id(13)).ok_or(ZrtpError::BadMultiStreamParams("SAS type"))?;

        let mut peer_zid = [0u8; 12];
        peer_zid.copy_from_slice(&blob[17..29]);
        let session_len = blob[29] as usize;
        if blob.len() != FIXED_LEN + session_len || session_len != hash.output_len() {
            return Err(ZrtpError::BadMultiStreamParams("session key length"));
        }

        Ok(Self {
            algorithms: NegotiatedAlgorithms {
                hash,
                cipher,
                auth_tag,
                key_agreement: KeyAgreement::Mult,
                sas,
            },
            peer_zid,
            zrtp_session: blob[FIXED_LEN..].to_vec(),
        })
    }
}

impl std::fmt::Debug for MultiStreamParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiStreamParams")
            .field("algorithms", &self.algorithms)
            .field("peer_zid", &self.peer_zid)
            .finish_non_exhaustive()
    }
}
