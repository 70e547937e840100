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
use zrtp_cache::CacheError;
use zrtp_core::ZrtpError;
use zrtp_proto::DecodeError;
use zrtp_srtp::SrtpError;

/// Errors returned by the filter.
///
/// A packet-level error means the packet was dropped; the session itself is
/// unaffected.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("ZRTP is disabled on this filter")]
    Disabled,

    #[error("dropped ZRTP packet: {0}")]
    Decode(#[from] DecodeError),

    #[error("dropped media packet: {0}")]
    Srtp(#[from] SrtpError),

    #[error(transparent)]
    Zrtp(#[from] ZrtpError),

    #[error("cannot open ZID cache: {0}")]
    Cache(#[from] CacheError),
}
