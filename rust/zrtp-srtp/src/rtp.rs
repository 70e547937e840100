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

//! Minimal RTP/RTCP header inspection.

use crate::error::SrtpError;

pub const RTP_HEADER_LEN: usize = 12;
pub const RTCP_HEADER_LEN: usize = 8;
const RTP_VERSION: u8 = 2;

/// The RTP header fields SRTP needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    pub sequence: u16,
    pub ssrc: u32,
    /// Fixed header plus CSRC list plus extension.
    pub header_len: usize,
}

impl RtpHeader {
    pub fn parse(packet: &[u8]) -> Result<Self, SrtpError> {
        if packet.len() < RTP_HEADER_LEN {
            return Err(SrtpError::Malformed("RTP packet shorter than header"));
        }
        if packet[0] >> 6 != RTP_VERSION {
            return Err(SrtpError::Malformed("not RTP version 2"));
        }

        let csrc_count = usize::from(packet[0] & 0x0f);
        let mut header_len = RTP_HEADER_LEN + 4 * csrc_count;
        if packet[0] & 0x10 != 0 {
            if packet.len() < header_len + 4 {
                return Err(SrtpError::Malformed("truncated RTP header extension"));
            }
            let words = u16::from_be_bytes([packet[header_len + 2], packet[header_len + 3]]);
            header_len += 4 + 4 * usize::from(words);
        }
        if packet.len() < header_len {
            return Err(SrtpError::Malformed("truncated RTP header"));
        }

        Ok(Self {
            sequence: u16::from_be_bytes([packet[2], packet[3]]),
            ssrc: u32::from_be_bytes([packet[8], packet[9], packet[10], packet[11]]),
            header_len,
        })
    }
}

/// Sender SSRC of an RTCP compound packet.
pub fn rtcp_ssrc(packet: &[u8]) -> Result<u32, SrtpError> {
    if packet.len() < RTCP_HEADER_LEN || packet[0] >> 6 != RTP_VERSION {
        return Err(SrtpError::Malformed("not an RTCP packet"));
    }
    Ok(u32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]]))
}

/// RFC 5761 demultiplexing: RTCP packet types occupy 192..=223 in the second byte.
pub fn is_rtcp(packet: &[u8]) -> bool {
    packet.len() >= RTCP_HEADER_LEN && (192..=223).contains(&packet[1])
}
