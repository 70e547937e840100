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

use super::header::{array, expect_end, ZrtpPacketHeader, HEADER_LEN};
use super::MAC_LEN;
use crate::error::DecodeError;
use nom::{bytes::complete::take, number::complete::be_u32, IResult};

/// The GoClear packet is used to switch back to unencrypted mode.
///
/// Defined in RFC 6189 Section 5.11.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoClearPacket {
    /// HMAC protecting the GoClear request.
    pub clear_hmac: [u8; 8],
}

impl GoClearPacket {
    /// The message type identifier for GoClear packets.
    pub const MESSAGE_TYPE: [u8; 8] = *b"GoClear ";

    /// Parses a complete GoClear message.
    pub fn parse(message: &[u8]) -> Result<Self, DecodeError> {
        let (body, _) = ZrtpPacketHeader::parse_checked(message)?;
        let (rest, clear_hmac) = take::<_, _, nom::error::Error<&[u8]>>(MAC_LEN)(body)?;
        expect_end(rest, "GoClear")?;
        Ok(Self { clear_hmac: array(clear_hmac) })
    }

    /// Serializes the GoClear packet into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = ZrtpPacketHeader::new(Self::MESSAGE_TYPE, HEADER_LEN + MAC_LEN).to_bytes();
        bytes.extend_from_slice(&self.clear_hmac);
        bytes
    }
}

/// The Error packet is sent when a protocol error occurs.
///
/// Defined in RFC 6189 Section 5.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPacket {
    /// The error code as defined in RFC 6189 Section 5.9.
    pub error_code: u32,
}

impl ErrorPacket {
    /// The message type identifier for Error packets.
    pub const MESSAGE_TYPE: [u8; 8] = *b"Error   ";

    /// Parses a complete Error message.
    pub fn parse(message: &[u8]) -> Result<Self, DecodeError> {
        let (body, _) = ZrtpPacketHeader::parse_checked(message)?;
        let (rest, error_code) = be_u32::<_, nom::error::Error<&[u8]>>(body)?;
        expect_end(rest, "Error")?;
        Ok(Self { error_code })
    }

    /// Serializes the Error packet into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = ZrtpPacketHeader::new(Self::MESSAGE_TYPE, HEADER_LEN + 4).to_bytes();
        bytes.extend_from_slice(&self.error_code.to_be_bytes());
        bytes
    }
}

/// Ping, used by intermediaries to learn the endpoint hash of a ZRTP endpoint.
///
/// Defined in RFC 6189 Section 5.15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingPacket {
    /// Protocol version of the sender.
    pub version: [u8; 4],
    /// Endpoint hash of the sender.
    pub endpoint_hash: [u8; 8],
}

impl PingPacket {
    /// The message type identifier for Ping packets.
    pub const MESSAGE_TYPE: [u8; 8] = *b"Ping    ";

    /// Parses a complete Ping message.
    pub fn parse(message: &[u8]) -> Result<Self, DecodeError> {
        let (body, _) = ZrtpPacketHeader::parse_checked(message)?;
        let (rest, (version, endpoint_hash)) = version_and_hash(body)?;
        expect_end(rest, "Ping")?;
        Ok(Self { version, endpoint_hash })
    }

    /// Serializes the Ping packet into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = ZrtpPacketHeader::new(Self::MESSAGE_TYPE, HEADER_LEN + 12).to_bytes();
        bytes.extend_from_slice(&self.version);
        bytes.extend_from_slice(&self.endpoint_hash);
        bytes
    }
}

fn version_and_hash(input: &[u8]) -> IResult<&[u8], ([u8; 4], [u8; 8])> {
    let (input, version) = take(4usize)(input)?;
    let (input, hash) = take(8usize)(input)?;
    Ok((input, (array(version), array(hash))))
}

/// PingACK, the answer to [`PingPacket`].
///
/// Defined in RFC 6189 Section 5.16.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingAckPacket {
    /// Protocol version of the responder.
    pub version: [u8; 4],
    /// Endpoint hash of the responder.
    pub endpoint_hash: [u8; 8],
    /// Endpoint hash copied from the Ping.
    pub received_endpoint_hash: [u8; 8],
    /// SSRC of the Ping sender.
    pub ssrc: u32,
}

impl PingAckPacket {
    /// The message type identifier for PingACK packets.
    pub const MESSAGE_TYPE: [u8; 8] = *b"PingACK ";

    fn fields(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, (version, endpoint_hash)) = version_and_hash(input)?;
        let (input, received) = take(8usize)(input)?;
        let (input, ssrc) = be_u32(input)?;
        Ok((input, Self {
            version,
            endpoint_hash,
            received_endpoint_hash: array(received),
            ssrc,
        }))
    }

    /// Parses a complete PingACK message.
    pub fn parse(message: &[u8]) -> Result<Self, DecodeError> {
        let (body, _) = ZrtpPacketHeader::parse_checked(message)?;
        let (rest, ack) = Self::fields(body)?;
        expect_end(rest, "PingACK")?;
        Ok(ack)
    }

    /// Serializes the PingACK packet into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = ZrtpPacketHeader::new(Self::MESSAGE_TYPE, HEADER_LEN + 24).to_bytes();
        bytes.extend_from_slice(&self.version);
        bytes.extend_from_slice(&self.endpoint_hash);
        bytes.extend_from_slice(&self.received_endpoint_hash);
        bytes.extend_from_slice(&self.ssrc.to_be_bytes());
        bytes
    }
}

/// Header-only acknowledgements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckKind {
    HelloAck,
    Conf2Ack,
    ErrorAck,
    ClearAck,
    RelayAck,
}

impl AckKind {
    /// The 8-byte message type of this acknowledgement.
    pub fn message_type(self) -> [u8; 8] {
        match self {
            AckKind::HelloAck => *b"HelloACK",
            AckKind::Conf2Ack => *b"Conf2ACK",
            AckKind::ErrorAck => *b"ErrorACK",
            AckKind::ClearAck => *b"ClearACK",
            AckKind::RelayAck => *b"RelayACK",
        }
    }

    /// Maps a message type back to an acknowledgement kind.
    pub fn from_message_type(message_type: &[u8; 8]) -> Option<Self> {
        [
            AckKind::HelloAck,
            AckKind::Conf2Ack,
            AckKind::ErrorAck,
            AckKind::ClearAck,
            AckKind::RelayAck,
        ]
        .into_iter()
        .find(|kind| &kind.message_type() == message_type)
    }

    /// Serializes the acknowledgement, which is just a header.
    pub fn to_bytes(self) -> Vec<u8> {
        ZrtpPacketHeader::new(self.message_type(), HEADER_LEN).to_bytes()
    }
}
