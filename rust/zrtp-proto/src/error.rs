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

use thiserror::Error;

/// Reasons a ZRTP packet is rejected by the codec.
///
/// `Checksum` is kept apart from the structural kinds: a checksum failure
/// usually means corruption in transit, everything else means the sender
/// produced something that is not ZRTP.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("CRC mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    Checksum { stored: u32, computed: u32 },

    #[error("packet of {0} bytes exceeds the maximum ZRTP size")]
    Oversize(usize),

    #[error("truncated packet")]
    Truncated,

    #[error("bad magic cookie {0:#010x}")]
    BadMagic(u32),

    #[error("bad message preamble {0:#06x}")]
    BadPreamble(u16),

    #[error("declared length of {declared} bytes does not match {actual} bytes received")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("unknown message type {0:?}")]
    UnknownType([u8; 8]),

    #[error("malformed {0}")]
    Malformed(&'static str),
}

impl DecodeError {
    /// True for checksum failures, false for every structural failure.
    pub fn is_checksum(&self) -> bool {
        matches!(self, DecodeError::Checksum { .. })
    }
}

impl<I> From<nom::Err<nom::error::Error<I>>> for DecodeError {
    fn from(_: nom::Err<nom::error::Error<I>>) -> Self {
        DecodeError::Truncated
    }
}
