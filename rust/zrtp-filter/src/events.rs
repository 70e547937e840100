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

use zrtp_core::{EnableSecurity, EnrollmentCode, ZrtpState, ZrtpStatus};

/// Events the filter reports to the host application.
///
/// All of them are advisory: the filter keeps working whether or not
/// anybody listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZrtpNotification {
    /// Progress, warnings and errors of the handshake and the data path.
    Status(ZrtpStatus),
    /// Both directions are protected; `cipher` names the negotiated algorithms.
    Algorithm { cipher: String, verified: bool },
    /// The SAS to compare with the peer. Multi-stream sessions have none.
    Sas { sas: String, verified: bool },
    /// SRTP was switched off for one direction.
    SecurityOff(EnableSecurity),
    /// The peer switched the session back to clear.
    GoClear,
    /// The handshake failed; a new start is needed.
    NegotiationFailed(ZrtpStatus),
    /// The peer never answered Hello.
    NotSupported,
    AskEnrollment(EnrollmentCode),
    InformEnrollment(EnrollmentCode),
    StateChanged { from: ZrtpState, to: ZrtpState },
}

/// Receives [`ZrtpNotification`]s.
///
/// Observers are called without any filter lock held and may call back into
/// the filter.
pub trait ZrtpObserver: Send + Sync {
    fn on_notification(&self, notification: &ZrtpNotification);
}

impl<F> ZrtpObserver for F
where
    F: Fn(&ZrtpNotification) + Send + Sync,
{
    fn on_notification(&self, notification: &ZrtpNotification) {
        self(notification)
    }
}
