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

use zrtp_crypto::{AuthTagAlgorithm, CipherAlgorithm};

use crate::status::{EnrollmentCode, ZrtpStatus};

/// Handshake role, decided by Commit contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    /// KDF and retained secret ID label for this role.
    pub fn label(&self) -> &'static [u8] {
        match self {
            Role::Initiator => b"Initiator",
            Role::Responder => b"Responder",
        }
    }

    pub fn peer(&self) -> Role {
        match self {
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }
}

/// Which half of the SRTP setup a secrets call refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnableSecurity {
    ForReceiver,
    ForSender,
}

/// SRTP master keys negotiated by ZRTP, for both roles.
#[derive(Clone)]
pub struct SrtpSecrets {
    pub cipher: CipherAlgorithm,
    pub auth_tag: AuthTagAlgorithm,
    /// The local role.
    pub role: Role,
    pub key_initiator: Vec<u8>,
    pub salt_initiator: Vec<u8>,
    pub key_responder: Vec<u8>,
    pub salt_responder: Vec<u8>,
}

impl SrtpSecrets {
    /// Key and salt protecting what this endpoint sends.
    pub fn sender_key(&self) -> (&[u8], &[u8]) {
        match self.role {
            Role::Initiator => (&self.key_initiator, &self.salt_initiator),
            Role::Responder => (&self.key_responder, &self.salt_responder),
        }
    }

    /// Key and salt protecting what this endpoint receives.
    pub fn receiver_key(&self) -> (&[u8], &[u8]) {
        match self.role {
            Role::Initiator => (&self.key_responder, &self.salt_responder),
            Role::Responder => (&self.key_initiator, &self.salt_initiator),
        }
    }

    pub fn tag_len(&self) -> usize {
        self.auth_tag.tag_len()
    }
}

impl std::fmt::Debug for SrtpSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrtpSecrets")
            .field("cipher", &self.cipher)
            .field("auth_tag", &self.auth_tag)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Everything the engine needs from its host.
///
/// The engine calls these synchronously while its owner holds the session
/// lock, so implementations must not call back into the engine.
pub trait ZrtpCallback: Send + Sync {
    /// Sends one ZRTP message. The host adds the framing and CRC.
    fn send_data(&self, message: &[u8]) -> bool;

    /// Arms the session timer; any previous timer is replaced.
    fn activate_timer(&self, ms: u32) -> bool;

    fn cancel_timer(&self) -> bool;

    fn send_info(&self, status: ZrtpStatus);

    /// Installs SRTP crypto for one direction.
    fn srtp_secrets_ready(&self, secrets: &SrtpSecrets, part: EnableSecurity) -> bool;

    fn srtp_secrets_off(&self, part: EnableSecurity);

    /// Both directions are protected; `cipher` names the negotiated algorithms.
    fn srtp_secrets_on(&self, cipher: &str, sas: &str, verified: bool);

    fn handle_go_clear(&self);

    fn negotiation_failed(&self, status: ZrtpStatus);

    fn not_supported_by_other(&self);

    fn ask_enrollment(&self, code: EnrollmentCode);

    fn inform_enrollment(&self, code: EnrollmentCode);

    /// Signs the sashash; the result is sent in Confirm.
    fn sign_sas(&self, _sas_hash: &[u8]) -> Option<Vec<u8>> {
        None
    }

    /// Verifies a signature received in Confirm.
    fn check_sas_signature(&self, _sas_hash: &[u8], _signature: &[u8]) -> bool {
        true
    }
}
