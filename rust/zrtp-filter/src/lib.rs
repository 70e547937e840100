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

//! Bump-in-the-wire ZRTP filter.
//!
//! [`ZrtpFilter`] sits between the network and an RTP session. Packets from
//! the network enter through [`ZrtpFilter::recv_rtp`] and
//! [`ZrtpFilter::recv_rtcp`]; ZRTP messages are consumed and handed to the
//! handshake engine, everything else is unprotected once SRTP is active and
//! returned for delivery to the session. Packets from the session enter
//! through [`ZrtpFilter::send_rtp`] and [`ZrtpFilter::send_rtcp`] and come
//! back protected, or untouched while the handshake is still running.
//!
//! The host supplies a [`Transport`] for the ZRTP messages the filter
//! originates and a [`Clock`] for the retransmission timer. Protocol events
//! are delivered to registered [`ZrtpObserver`]s.

mod config;
mod error;
mod events;
mod filter;
mod host;
mod io;

pub use config::FilterConfig;
pub use error::FilterError;
pub use events::{ZrtpNotification, ZrtpObserver};
pub use filter::{FilterStats, ZrtpFilter};
pub use io::{Clock, ThreadClock, TimerTask, Transport};

pub use zrtp_core::{EnableSecurity, EnrollmentCode, ZrtpOptions, ZrtpState, ZrtpStatus};
pub use zrtp_crypto::SasType;
