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

//! ZRTP-over-RTP framing.
//!
//! ```text
//!  0                   1                   2                   3
//! |0 0 0 1|0|0 0 0 0 0 0 0 0 0 0 0|        Sequence Number        |
//! |                 Magic Cookie 'ZRTP' (0x5a525450)              |
//! |                        Source Identifier                      |
//! |           ZRTP Message (length depends on Message Type)       |
//! |                          CRC (1 word)                         |
//! ```

use crate::crc;
use crate::error::DecodeError;
use crate::packets::{ZrtpPacket, HEADER_LEN, ZRTP_MAGIC};

/// Size of the pseudo-RTP header in front of every ZRTP message.
pub const FRAME_HEADER_LEN: usize = 12;

/// Size of the CRC trailer.
pub const CRC_LEN: usize = 4;

/// Largest framed ZRTP packet accepted or produced.
pub const MAX_ZRTP_SIZE: usize = 3072;

/// First byte of a ZRTP frame; RTP version bits are zero.
const FRAME_MARKER: u8 = 0x10;

/// Smallest possible frame: header, message header, CRC.
const MIN_FRAME_LEN: usize = FRAME_HEADER_LEN + HEADER_LEN + CRC_LEN;

/// Quick classification on the first byte only.
///
/// Real RTP and RTCP carry version 2 in the top bits, so their high nibble is
/// never `0x1`.
pub fn is_zrtp_candidate(buf: &[u8]) -> bool {
    buf.first().map_or(false, |b| b & 0xf0 == FRAME_MARKER)
}

/// A checked frame whose message has not been parsed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    pub sequence: u16,
    pub ssrc: u32,
    pub message: &'a [u8],
}

impl<'a> RawFrame<'a> {
    /// Validates size, checksum and magic cookie, in that order.
    ///
    /// The checksum is verified before anything else is interpreted, so any
    /// corruption of the cookie or header is reported as a checksum failure.
    pub fn open(buf: &'a [u8]) -> Result<Self, DecodeError> {
        if buf.len() > MAX_ZRTP_SIZE {
            log::debug!("dropping oversize ZRTP frame of {} bytes", buf.len());
            return Err(DecodeError::Oversize(buf.len()));
        }
        if buf.len() < MIN_FRAME_LEN {
            log::debug!("dropping truncated ZRTP frame of {} bytes", buf.len());
            return Err(DecodeError::Truncated);
        }
        let (body, trailer) = buf.split_at(buf.len() - CRC_LEN);
        let stored = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let computed = crc::checksum(body);
        if stored != computed {
            log::warn!("ZRTP frame CRC mismatch: stored {stored:#010x}, computed {computed:#010x}");
            return Err(DecodeError::Checksum { stored, computed });
        }

        let magic = u32::from_be_bytes([body[4], body[5], body[6], body[7]]);
        if magic != ZRTP_MAGIC {
            log::debug!("dropping ZRTP frame with magic {magic:#010x}");
            return Err(DecodeError::BadMagic(magic));
        }
        if body[0] & 0xf0 != FRAME_MARKER {
            return Err(DecodeError::Malformed("frame marker"));
        }

        Ok(Self {
            sequence: u16::from_be_bytes([body[2], body[3]]),
            ssrc: u32::from_be_bytes([body[8], body[9], body[10], body[11]]),
            message: &body[FRAME_HEADER_LEN..],
        })
    }

    /// Parses the carried message.
    pub fn packet(&self) -> Result<ZrtpPacket, DecodeError> {
        ZrtpPacket::parse(self.message)
    }
}

/// Wraps a serialized message into a frame and appends the checksum.
pub fn seal(sequence: u16, ssrc: u32, message: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let len = FRAME_HEADER_LEN + message.len() + CRC_LEN;
    if len > MAX_ZRTP_SIZE {
        return Err(DecodeError::Oversize(len));
    }
    let mut out = Vec::with_capacity(len);
    out.push(FRAME_MARKER);
    out.push(0);
    out.extend_from_slice(&sequence.to_be_bytes());
    out.extend_from_slice(&ZRTP_MAGIC.to_be_bytes());
    out.extend_from_slice(&ssrc.to_be_bytes());
    out.extend_from_slice(message);
    let crc = crc::checksum(&out);
    out.extend_from_slice(&crc.to_be_bytes());
    Ok(out)
}

/// A fully decoded ZRTP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZrtpFrame {
    pub sequence: u16,
    pub ssrc: u32,
    pub packet: ZrtpPacket,
}

/// Decodes a framed ZRTP packet: checksum, magic cookie, then message layout.
pub fn decode(buf: &[u8]) -> Result<ZrtpFrame, DecodeError> {
    let raw = RawFrame::open(buf)?;
    Ok(ZrtpFrame {
        sequence: raw.sequence,
        ssrc: raw.ssrc,
        packet: raw.packet()?,
    })
}

/// Encodes a frame including its checksum.
pub fn encode(frame: &ZrtpFrame) -> Result<Vec<u8>, DecodeError> {
    seal(frame.sequence, frame.ssrc, &frame.packet.to_bytes())
}
