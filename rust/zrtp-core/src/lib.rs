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

//! ZRTP key agreement (RFC 6189).
//!
//! [`ZrtpEngine`] runs the discovery, commit, key agreement and confirm
//! phases for one media stream. Everything that touches the outside world
//! (sending, timers, SRTP keys, user interaction) goes through the
//! [`ZrtpCallback`] the host supplies.

mod callback;
mod engine;
mod error;
mod keys;
mod multistream;
mod options;
pub mod state;
mod status;
mod timer;

pub use callback::{EnableSecurity, Role, SrtpSecrets, ZrtpCallback};
pub use engine::ZrtpEngine;
pub use error::ZrtpError;
pub use keys::NegotiatedAlgorithms;
pub use multistream::MultiStreamParams;
pub use options::{TimerSchedule, ZrtpOptions};
pub use state::ZrtpState;
pub use status::{EnrollmentCode, ErrorCode, InfoCode, SevereCode, WarningCode, ZrtpStatus};
