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

//! The backend-independent retained-secret record.

use std::time::{SystemTime, UNIX_EPOCH};

/// ZRTP endpoint identifier, 96 bits.
pub type Zid = [u8; 12];

/// Length of a retained secret and of the trusted MiTM key.
pub const RS_LEN: usize = 32;

/// Expiry value for a secret that never expires.
pub const NEVER_EXPIRES: i64 = -1;

/// Cache expiry sent in Confirm that means "keep forever".
pub const CONFIRM_EXPIRY_FOREVER: u32 = 0xffff_ffff;

/// Record flags, bit-compatible with the version 2 file record.
pub mod flags {
    pub const VALID: u8 = 0x01;
    pub const SAS_VERIFIED: u8 = 0x02;
    pub const RS1_VALID: u8 = 0x04;
    pub const RS2_VALID: u8 = 0x08;
    pub const MITM_KEY: u8 = 0x10;
    pub const OWN_ZID: u8 = 0x20;
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// What the cache knows about one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZidRecord {
    pub zid: Zid,
    pub flags: u8,
    pub rs1: [u8; RS_LEN],
    /// Absolute expiry in Unix seconds, or [`NEVER_EXPIRES`].
    pub rs1_expires: i64,
    pub rs2: [u8; RS_LEN],
    pub rs2_expires: i64,
    pub mitm_key: [u8; RS_LEN],
    /// Last time a session with this peer went secure. Not kept by the file backend.
    pub last_use: i64,
}

impl ZidRecord {
    /// A fresh, valid record with no secrets.
    pub fn new(zid: Zid) -> Self {
        Self {
            zid,
            flags: flags::VALID,
            rs1: [0; RS_LEN],
            rs1_expires: 0,
            rs2: [0; RS_LEN],
            rs2_expires: 0,
            mitm_key: [0; RS_LEN],
            last_use: 0,
        }
    }

    fn live(&self, flag: u8, expires: i64, now: i64) -> bool {
        self.flags & flag != 0 && (expires == NEVER_EXPIRES || now <= expires)
    }

    /// rs1 if present and not expired at `now`.
    pub fn rs1(&self, now: i64) -> Option<&[u8; RS_LEN]> {
        self.live(flags::RS1_VALID, self.rs1_expires, now).then_some(&self.rs1)
    }

    /// rs2 if present and not expired at `now`.
    pub fn rs2(&self, now: i64) -> Option<&[u8; RS_LEN]> {
        self.live(flags::RS2_VALID, self.rs2_expires, now).then_some(&self.rs2)
    }

    /// True if the record ever held a retained secret, expired or not.
    pub fn has_any_secret(&self) -> bool {
        self.flags & (flags::RS1_VALID | flags::RS2_VALID) != 0
    }

    /// Stores a new rs1 and shifts the previous one into rs2.
    ///
    /// `expiry` is the interval negotiated in Confirm: zero keeps nothing,
    /// `0xffffffff` keeps it forever.
    pub fn set_new_rs1(&mut self, rs: &[u8], expiry: u32, now: i64) {
        if expiry == 0 || rs.len() < RS_LEN {
            return;
        }
        self.rs2 = self.rs1;
        self.rs2_expires = self.rs1_expires;
        if self.flags & flags::RS1_VALID != 0 {
            self.flags |= flags::RS2_VALID;
        }
        self.rs1.copy_from_slice(&rs[..RS_LEN]);
        self.rs1_expires = if expiry == CONFIRM_EXPIRY_FOREVER {
            NEVER_EXPIRES
        } else {
            now + i64::from(expiry)
        };
        self.flags |= flags::RS1_VALID;
    }

    pub fn is_sas_verified(&self) -> bool {
        self.flags & flags::SAS_VERIFIED != 0
    }

    pub fn set_sas_verified(&mut self) {
        self.flags |= flags::SAS_VERIFIED;
    }

    pub fn reset_sas_verified(&mut self) {
        self.flags &= !flags::SAS_VERIFIED;
    }

    /// The trusted MiTM key registered during PBX enrollment.
    pub fn mitm_key(&self) -> Option<&[u8; RS_LEN]> {
        (self.flags & flags::MITM_KEY != 0).then_some(&self.mitm_key)
    }

    pub fn set_mitm_key(&mut self, key: &[u8]) {
        if key.len() >= RS_LEN {
            self.mitm_key.copy_from_slice(&key[..RS_LEN]);
            self.flags |= flags::MITM_KEY;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rs1_shifts_previous() {
        let mut rec = ZidRecord::new([1; 12]);
        assert!(rec.rs1(100).is_none());
        assert!(!rec.has_any_secret());

        rec.set_new_rs1(&[0xaa; 32], CONFIRM_EXPIRY_FOREVER, 100);
        assert_eq!(rec.rs1(100), Some(&[0xaa; 32]));
        assert!(rec.rs2(100).is_none());

        rec.set_new_rs1(&[0xbb; 32], 60, 200);
        assert_eq!(rec.rs1(200), Some(&[0xbb; 32]));
        assert_eq!(rec.rs2(200), Some(&[0xaa; 32]));
        assert!(rec.rs1(261).is_none());
        assert_eq!(rec.rs2(10_000), Some(&[0xaa; 32]));
    }

    #[test]
    fn test_zero_expiry_keeps_nothing() {
        let mut rec = ZidRecord::new([1; 12]);
        rec.set_new_rs1(&[0xaa; 32], 0, 100);
        assert!(!rec.has_any_secret());
    }

    #[test]
    fn test_flags() {
        let mut rec = ZidRecord::new([2; 12]);
        rec.set_sas_verified();
        assert!(rec.is_sas_verified());
        rec.reset_sas_verified();
        assert!(!rec.is_sas_verified());
        assert!(rec.mitm_key().is_none());
        rec.set_mitm_key(&[7; 48]);
        assert_eq!(rec.mitm_key(), Some(&[7; 32]));
    }
}
