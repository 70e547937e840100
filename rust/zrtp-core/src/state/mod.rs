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

/// States of the ZRTP protocol state machine (RFC 6189 Section 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZrtpState {
    /// Not started, or back in the clear after GoClear.
    Idle,
    /// Sending Hello, waiting for the peer's Hello or HelloAck.
    Detect,
    /// Our Hello was acknowledged, waiting for the peer's Hello.
    AckDetected,
    /// We acknowledged the peer's Hello and keep sending ours.
    AckSent,
    /// Both Hellos acknowledged, waiting for the peer's Commit.
    WaitCommit,
    /// Commit sent, waiting for DHPart1 (or Confirm1 in multi-stream mode).
    CommitSent,
    /// Responder: DHPart1 sent, waiting for DHPart2.
    WaitDHPart2,
    /// Initiator: DHPart2 sent, waiting for Confirm1.
    WaitConfirm1,
    /// Responder: Confirm1 sent, waiting for Confirm2.
    WaitConfirm2,
    /// Initiator: Confirm2 sent, waiting for Conf2Ack.
    WaitConfAck,
    /// SRTP keys are active in both directions.
    Secure,
    /// GoClear sent, waiting for ClearAck.
    WaitClearAck,
    /// Error sent, waiting for ErrorAck.
    WaitErrorAck,
    /// Negotiation failed; only an explicit start leaves this state.
    Error,
}

impl ZrtpState {
    /// True while a handshake is in progress.
    pub fn is_negotiating(&self) -> bool {
        !matches!(
            self,
            ZrtpState::Idle | ZrtpState::Secure | ZrtpState::Error | ZrtpState::WaitClearAck
        )
    }
}
