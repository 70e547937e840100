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

//! Status reports delivered through [`ZrtpCallback::send_info`] and
//! [`ZrtpCallback::negotiation_failed`].
//!
//! [`ZrtpCallback::send_info`]: crate::ZrtpCallback::send_info
//! [`ZrtpCallback::negotiation_failed`]: crate::ZrtpCallback::negotiation_failed

use std::fmt;

macro_rules! status_codes {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:expr => $desc:expr,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            /// Stable numeric code.
            pub fn code(&self) -> u32 {
                match self {
                    $($name::$variant => $code,)*
                }
            }

            pub fn description(&self) -> &'static str {
                match self {
                    $($name::$variant => $desc,)*
                }
            }

            pub fn from_code(code: u32) -> Option<Self> {
                Self::ALL.iter().copied().find(|c| c.code() == code)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.description())
            }
        }
    };
}

status_codes! {
    /// Progress of a successful negotiation.
    InfoCode {
        HelloReceived = 1 => "Hello received, preparing a Commit",
        CommitDhGenerated = 2 => "Commit: generated a public DH key",
        RespCommitReceived = 3 => "Responder: Commit received, preparing DHPart1",
        Dh1DhGenerated = 4 => "DHPart1: generated a public DH key",
        InitDh1Received = 5 => "Initiator: DHPart1 received, preparing DHPart2",
        RespDh2Received = 6 => "Responder: DHPart2 received, preparing Confirm1",
        InitConf1Received = 7 => "Initiator: Confirm1 received, preparing Confirm2",
        RespConf2Received = 8 => "Responder: Confirm2 received, preparing Conf2Ack",
        RsMatchFound = 9 => "At least one retained secret matches - security OK",
        SecureStateOn = 10 => "Entered secure state",
        SecureStateOff = 11 => "No more security for this session",
    }
}

status_codes! {
    /// Conditions the user should know about; the session continues.
    WarningCode {
        DhAesMismatch = 1 => "Negotiated a 256 bit cipher with a 128 bit strength key agreement",
        GoClearReceived = 2 => "Received a GoClear message",
        DhShort = 3 => "Received a DH public value of unexpected length",
        NoRsMatch = 4 => "No retained secret found - you must verify the SAS",
        CrcMismatch = 5 => "ZRTP packet checksum mismatch - packet dropped",
        SrtpAuthError = 6 => "Dropping packet because SRTP authentication failed",
        SrtpReplayError = 7 => "Dropping packet because SRTP replay check failed",
        NoExpectedRsMatch = 8 => "Valid retained secrets available but no match found - must verify SAS",
    }
}

status_codes! {
    /// Local failures that abort the negotiation.
    SevereCode {
        HelloHmacFailed = 1 => "Hash HMAC check of Hello failed",
        CommitHmacFailed = 2 => "Hash HMAC check of Commit failed",
        Dh1HmacFailed = 3 => "Hash HMAC check of DHPart1 failed",
        Dh2HmacFailed = 4 => "Hash HMAC check of DHPart2 failed",
        CannotSend = 5 => "Cannot send data - connection or peer down?",
        ProtocolError = 6 => "Internal protocol error occurred",
        NoTimer = 7 => "Cannot start a timer",
        TooMuchRetries = 8 => "Too many retries during ZRTP negotiation - connection or peer down?",
    }
}

status_codes! {
    /// Error codes carried in the Error message (RFC 6189 Section 5.9).
    ErrorCode {
        MalformedPacket = 0x10 => "Malformed packet (CRC OK, but wrong structure)",
        CriticalSwError = 0x20 => "Critical software error",
        UnsuppZrtpVersion = 0x30 => "Unsupported ZRTP version",
        HelloCompMismatch = 0x40 => "Hello components mismatch",
        UnsuppHashType = 0x51 => "Hash type not supported",
        UnsuppCipherType = 0x52 => "Cipher type not supported",
        UnsuppPkExchange = 0x53 => "Public key exchange not supported",
        UnsuppSrtpAuthTag = 0x54 => "SRTP auth. tag not supported",
        UnsuppSasScheme = 0x55 => "SAS scheme not supported",
        NoSharedSecret = 0x56 => "No shared secret available, DH mode required",
        DhErrorWrongPv = 0x61 => "DH Error: bad pvi or pvr ( == 1, 0, or p-1)",
        DhErrorWrongHvi = 0x62 => "DH Error: hvi != hashed data",
        SasUntrustedMitm = 0x63 => "Received relayed SAS from untrusted MiTM",
        ConfirmHmacWrong = 0x70 => "Auth. Error: Bad Confirm pkt HMAC",
        NonceReused = 0x80 => "Nonce reuse",
        EqualZidHello = 0x90 => "Equal ZIDs in Hello",
        SsrcCollision = 0x91 => "SSRC collision",
        ServiceUnavailable = 0xa0 => "Service unavailable",
        ProtocolTimeout = 0xb0 => "Protocol timeout error",
        GoClearNotAllowed = 0x100 => "GoClear received but not allowed",
    }
}

status_codes! {
    /// PBX enrollment questions and results.
    EnrollmentCode {
        Request = 0 => "Trusted MiTM enrollment requested",
        Canceled = 1 => "Trusted MiTM enrollment canceled by user",
        Failed = 2 => "Trusted MiTM enrollment failed",
        Ok = 3 => "Trusted MiTM enrollment OK",
    }
}

/// One status report: a severity tier and its sub-code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZrtpStatus {
    Info(InfoCode),
    Warning(WarningCode),
    Severe(SevereCode),
    /// A protocol error sent to or received from the peer.
    ZrtpError(ErrorCode),
    Enrollment(EnrollmentCode),
}

impl ZrtpStatus {
    /// Name of the severity tier.
    pub fn severity(&self) -> &'static str {
        match self {
            ZrtpStatus::Info(_) => "Info",
            ZrtpStatus::Warning(_) => "Warning",
            ZrtpStatus::Severe(_) => "Severe",
            ZrtpStatus::ZrtpError(_) => "ZrtpError",
            ZrtpStatus::Enrollment(_) => "Enrollment",
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            ZrtpStatus::Info(c) => c.code(),
            ZrtpStatus::Warning(c) => c.code(),
            ZrtpStatus::Severe(c) => c.code(),
            ZrtpStatus::ZrtpError(c) => c.code(),
            ZrtpStatus::Enrollment(c) => c.code(),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ZrtpStatus::Info(c) => c.description(),
            ZrtpStatus::Warning(c) => c.description(),
            ZrtpStatus::Severe(c) => c.description(),
            ZrtpStatus::ZrtpError(c) => c.description(),
            ZrtpStatus::Enrollment(c) => c.description(),
        }
    }

    /// True for tiers that end the negotiation.
    pub fn is_failure(&self) -> bool {
        matches!(self, ZrtpStatus::Severe(_) | ZrtpStatus::ZrtpError(_))
    }
}

impl fmt::Display for ZrtpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:#x}: {}", self.severity(), self.code(), self.description())
    }
}
