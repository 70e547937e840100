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

//! Replay protection and packet index estimation (RFC 3711 3.3.1, 3.3.2).

use crate::error::SrtpError;

/// Number of indices below the highest one that are still accepted.
pub const REPLAY_WINDOW: u64 = 64;

/// Sliding window over packet indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayWindow {
    top: Option<u64>,
    bitmap: u64,
}

impl ReplayWindow {
    /// Highest accepted index.
    pub fn top(&self) -> Option<u64> {
        self.top
    }

    /// Fails if `index` was already accepted or is behind the window. Does not mutate.
    pub fn check(&self, index: u64) -> Result<(), SrtpError> {
        let Some(top) = self.top else {
            return Ok(());
        };
        if index > top {
            return Ok(());
        }
        let delta = top - index;
        if delta >= REPLAY_WINDOW || self.bitmap & (1 << delta) != 0 {
            return Err(SrtpError::Replay(index));
        }
        Ok(())
    }

    /// Records `index` as accepted.
    pub fn accept(&mut self, index: u64) {
        match self.top {
            None => {
                self.top = Some(index);
                self.bitmap = 1;
            }
            Some(top) if index > top => {
                let shift = index - top;
                self.bitmap = if shift >= REPLAY_WINDOW { 0 } else { self.bitmap << shift };
                self.bitmap |= 1;
                self.top = Some(index);
            }
            Some(top) => {
                let delta = top - index;
                if delta < REPLAY_WINDOW {
                    self.bitmap |= 1 << delta;
                }
            }
        }
    }
}

/// Estimates the 48-bit SRTP index of `seq` given the highest index seen.
///
/// Returns `None` when the guess would need a negative ROC.
pub fn estimate_index(top: Option<u64>, seq: u16) -> Option<u64> {
    let Some(top) = top else {
        return Some(u64::from(seq));
    };
    let roc = (top >> 16) as i64;
    let s_l = (top & 0xffff) as i64;
    let seq = i64::from(seq);

    let v = if s_l < 32768 {
        if seq - s_l > 32768 {
            roc - 1
        } else {
            roc
        }
    } else if s_l - 32768 > seq {
        roc + 1
    } else {
        roc
    };

    (v >= 0).then(|| ((v as u64) << 16) | seq as u64)
}
