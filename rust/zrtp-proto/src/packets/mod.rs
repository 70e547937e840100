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

//! ZRTP message types and their codecs.

pub mod commit;
pub mod confirm;
pub mod dh_part;
pub mod header;
pub mod hello;
pub mod other;
pub mod sas_relay;

pub use commit::{CommitMode, CommitPacket, KA_MULTI_STREAM, KA_PRESHARED};
pub use confirm::{ConfirmBody, ConfirmPacket};
pub use dh_part::DHPartPacket;
pub use header::{ZrtpPacketHeader, HEADER_LEN, ZRTP_ID, ZRTP_MAGIC};
pub use hello::HelloPacket;
pub use other::{AckKind, ErrorPacket, GoClearPacket, PingAckPacket, PingPacket};
pub use sas_relay::{SasRelayBody, SasRelayPacket};

use crate::error::DecodeError;

/// Length of the truncated MACs carried by Hello, Commit, DHPart and Confirm.
pub const MAC_LEN: usize = 8;

/// The protocol version this implementation speaks.
pub const ZRTP_VERSION: [u8; 4] = *b"1.10";

/// A decoded ZRTP message, one variant per message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZrtpPacket {
    Hello(HelloPacket),
    HelloAck,
    Commit(CommitPacket),
    DHPart1(DHPartPacket),
    DHPart2(DHPartPacket),
    Confirm1(ConfirmPacket),
    Confirm2(ConfirmPacket),
    Conf2Ack,
    Error(ErrorPacket),
    ErrorAck,
    GoClear(GoClearPacket),
    ClearAck,
    Ping(PingPacket),
    PingAck(PingAckPacket),
    SasRelay(SasRelayPacket),
    RelayAck,
}

impl ZrtpPacket {
    /// Parses one ZRTP message (no framing, no CRC).
    pub fn parse(message: &[u8]) -> Result<Self, DecodeError> {
        let (_, header) = ZrtpPacketHeader::parse_checked(message)?;
        let packet = match &header.message_type {
            t if *t == HelloPacket::MESSAGE_TYPE => ZrtpPacket::Hello(HelloPacket::parse(message)?),
            t if *t == CommitPacket::MESSAGE_TYPE => ZrtpPacket::Commit(CommitPacket::parse(message)?),
            t if *t == DHPartPacket::MESSAGE_TYPE_DH1 => {
                ZrtpPacket::DHPart1(DHPartPacket::parse(message)?)
            }
            t if *t == DHPartPacket::MESSAGE_TYPE_DH2 => {
                ZrtpPacket::DHPart2(DHPartPacket::parse(message)?)
            }
            t if *t == ConfirmPacket::MESSAGE_TYPE_CONF1 => {
                ZrtpPacket::Confirm1(ConfirmPacket::parse(message)?)
            }
            t if *t == ConfirmPacket::MESSAGE_TYPE_CONF2 => {
                ZrtpPacket::Confirm2(ConfirmPacket::parse(message)?)
            }
            t if *t == ErrorPacket::MESSAGE_TYPE => ZrtpPacket::Error(ErrorPacket::parse(message)?),
            t if *t == GoClearPacket::MESSAGE_TYPE => {
                ZrtpPacket::GoClear(GoClearPacket::parse(message)?)
            }
            t if *t == PingPacket::MESSAGE_TYPE => ZrtpPacket::Ping(PingPacket::parse(message)?),
            t if *t == PingAckPacket::MESSAGE_TYPE => {
                ZrtpPacket::PingAck(PingAckPacket::parse(message)?)
            }
            t if *t == SasRelayPacket::MESSAGE_TYPE => {
                ZrtpPacket::SasRelay(SasRelayPacket::parse(message)?)
            }
            t => match AckKind::from_message_type(t) {
                Some(kind) => {
                    if message.len() != HEADER_LEN {
                        return Err(DecodeError::Malformed("acknowledgement"));
                    }
                    Self::from_ack(kind)
                }
                None => return Err(DecodeError::UnknownType(*t)),
            },
        };
        Ok(packet)
    }

    fn from_ack(kind: AckKind) -> Self {
        match kind {
            AckKind::HelloAck => ZrtpPacket::HelloAck,
            AckKind::Conf2Ack => ZrtpPacket::Conf2Ack,
            AckKind::ErrorAck => ZrtpPacket::ErrorAck,
            AckKind::ClearAck => ZrtpPacket::ClearAck,
            AckKind::RelayAck => ZrtpPacket::RelayAck,
        }
    }

    /// The 8-byte type tag of this message.
    pub fn message_type(&self) -> [u8; 8] {
        match self {
            ZrtpPacket::Hello(_) => HelloPacket::MESSAGE_TYPE,
            ZrtpPacket::HelloAck => AckKind::HelloAck.message_type(),
            ZrtpPacket::Commit(_) => CommitPacket::MESSAGE_TYPE,
            ZrtpPacket::DHPart1(_) => DHPartPacket::MESSAGE_TYPE_DH1,
            ZrtpPacket::DHPart2(_) => DHPartPacket::MESSAGE_TYPE_DH2,
            ZrtpPacket::Confirm1(_) => ConfirmPacket::MESSAGE_TYPE_CONF1,
            ZrtpPacket::Confirm2(_) => ConfirmPacket::MESSAGE_TYPE_CONF2,
            ZrtpPacket::Conf2Ack => AckKind::Conf2Ack.message_type(),
            ZrtpPacket::Error(_) => ErrorPacket::MESSAGE_TYPE,
            ZrtpPacket::ErrorAck => AckKind::ErrorAck.message_type(),
            ZrtpPacket::GoClear(_) => GoClearPacket::MESSAGE_TYPE,
            ZrtpPacket::ClearAck => AckKind::ClearAck.message_type(),
            ZrtpPacket::Ping(_) => PingPacket::MESSAGE_TYPE,
            ZrtpPacket::PingAck(_) => PingAckPacket::MESSAGE_TYPE,
            ZrtpPacket::SasRelay(_) => SasRelayPacket::MESSAGE_TYPE,
            ZrtpPacket::RelayAck => AckKind::RelayAck.message_type(),
        }
    }

    /// Message type as a trimmed string, for logging.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.message_type()).trim_end().to_string()
    }

    /// Serializes the message (no framing, no CRC).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ZrtpPacket::Hello(p) => p.to_bytes(),
            ZrtpPacket::Commit(p) => p.to_bytes(),
            ZrtpPacket::DHPart1(p) => p.to_bytes(DHPartPacket::MESSAGE_TYPE_DH1),
            ZrtpPacket::DHPart2(p) => p.to_bytes(DHPartPacket::MESSAGE_TYPE_DH2),
            ZrtpPacket::Confirm1(p) => p.to_bytes(ConfirmPacket::MESSAGE_TYPE_CONF1),
            ZrtpPacket::Confirm2(p) => p.to_bytes(ConfirmPacket::MESSAGE_TYPE_CONF2),
            ZrtpPacket::Error(p) => p.to_bytes(),
            ZrtpPacket::GoClear(p) => p.to_bytes(),
            ZrtpPacket::Ping(p) => p.to_bytes(),
            ZrtpPacket::PingAck(p) => p.to_bytes(),
            ZrtpPacket::SasRelay(p) => p.to_bytes(),
            ZrtpPacket::HelloAck => AckKind::HelloAck.to_bytes(),
            ZrtpPacket::Conf2Ack => AckKind::Conf2Ack.to_bytes(),
            ZrtpPacket::ErrorAck => AckKind::ErrorAck.to_bytes(),
            ZrtpPacket::ClearAck => AckKind::ClearAck.to_bytes(),
            ZrtpPacket::RelayAck => AckKind::RelayAck.to_bytes(),
        }
    }
}

/// The bytes a trailing message MAC is computed over.
pub fn mac_covered(message: &[u8]) -> &[u8] {
    &message[..message.len().saturating_sub(MAC_LEN)]
}

/// Overwrites the trailing MAC of a serialized message.
pub fn set_trailing_mac(message: &mut [u8], mac: &[u8]) {
    let start = message.len().saturating_sub(MAC_LEN);
    let n = mac.len().min(MAC_LEN);
    message[start..start + n].copy_from_slice(&mac[..n]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_message_type() {
        let msg = ZrtpPacketHeader::new(*b"Bogus   ", HEADER_LEN).to_bytes();
        assert_eq!(ZrtpPacket::parse(&msg), Err(DecodeError::UnknownType(*b"Bogus   ")));
    }

    #[test]
    fn test_ack_with_payload_rejected() {
        let mut msg = ZrtpPacketHeader::new(*b"HelloACK", HEADER_LEN + 4).to_bytes();
        msg.extend_from_slice(&[0; 4]);
        assert_eq!(ZrtpPacket::parse(&msg), Err(DecodeError::Malformed("acknowledgement")));
    }

    #[test]
    fn test_trailing_mac_helpers() {
        let mut msg = GoClearPacket { clear_hmac: [0; 8] }.to_bytes();
        set_trailing_mac(&mut msg, &[0xAB; 32]);
        assert_eq!(&msg[msg.len() - MAC_LEN..], &[0xAB; 8]);
        assert_eq!(mac_covered(&msg).len(), HEADER_LEN);
    }
}
