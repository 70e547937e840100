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

/// Errors from SRTP/SRTCP protection.
///
/// `Replay` and `Auth` mean the packet must be dropped; the context is unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SrtpError {
    #[error("replayed or too old packet, index {0}")]
    Replay(u64),

    #[error("authentication tag mismatch")]
    Auth,

    #[error("malformed packet: {0}")]
    Malformed(&'static str),

    #[error("invalid key material: {0}")]
    Key(&'static str),
}
