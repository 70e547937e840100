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

/// Errors returned by the engine's user-facing operations.
///
/// Protocol failures during a handshake are not errors of this kind; they
/// are reported through [`ZrtpCallback::negotiation_failed`](crate::ZrtpCallback::negotiation_failed).
#[derive(Debug, Error)]
pub enum ZrtpError {
    #[error("multi-stream parameters are already set")]
    MultiStreamAlreadySet,

    #[error("multi-stream parameters must be set before start")]
    AlreadyStarted,

    #[error("session exported multi-stream parameters and cannot become a multi-stream session")]
    IsMaster,

    #[error("malformed multi-stream parameters: {0}")]
    BadMultiStreamParams(&'static str),

    #[error("session is not secure")]
    NotSecure,

    #[error("not allowed: {0}")]
    NotAllowed(&'static str),

    #[error("no enrollment pending")]
    NoEnrollmentPending,

    #[error("no peer known for this session")]
    NoPeer,

    #[error("crypto failure: {0}")]
    Crypto(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
