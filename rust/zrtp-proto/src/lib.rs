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

//! ZRTP wire format.
//!
//! This crate parses and serializes the ZRTP messages defined in RFC 6189
//! Section 5 and wraps them in the pseudo-RTP framing used when ZRTP is
//! multiplexed on the media port. Framed packets carry a CRC-32C trailer
//! which is verified before any length-dependent field is looked at.

pub mod crc;
pub mod error;
pub mod frame;
pub mod packets;

pub use error::DecodeError;
pub use frame::{decode, encode, is_zrtp_candidate, RawFrame, ZrtpFrame, MAX_ZRTP_SIZE};
pub use packets::*;
