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

//! Retransmission bookkeeping for the T1 and T2 protocol timers.
//!
//! The timer itself lives in the host; the engine only computes the next
//! interval and counts retries.

use crate::options::TimerSchedule;

#[derive(Debug, Clone)]
pub(crate) struct RetryTimer {
    schedule: TimerSchedule,
    current_ms: u32,
    retries: u32,
    armed: bool,
}

impl RetryTimer {
    pub fn new() -> Self {
        Self {
            schedule: TimerSchedule::T1,
            current_ms: 0,
            retries: 0,
            armed: false,
        }
    }

    /// Arms the timer with a fresh schedule and returns the first interval.
    pub fn start(&mut self, schedule: TimerSchedule) -> u32 {
        self.schedule = schedule;
        self.current_ms = schedule.start_ms;
        self.retries = 0;
        self.armed = true;
        self.current_ms
    }

    /// Counts one retransmission and returns the next interval, or `None`
    /// once the retry budget is spent. Exhaustion disarms the timer.
    pub fn next(&mut self) -> Option<u32> {
        if !self.armed {
            return None;
        }
        if self.retries >= self.schedule.max_retries {
            self.armed = false;
            return None;
        }
        self.retries += 1;
        self.current_ms = self.current_ms.saturating_mul(2).min(self.schedule.cap_ms);
        Some(self.current_ms)
    }

    pub fn cancel(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_t1_doubles_to_cap() {
        let mut timer = RetryTimer::new();
        assert_eq!(timer.start(TimerSchedule::T1), 50);
        let intervals: Vec<u32> = std::iter::from_fn(|| timer.next()).collect();
        assert_eq!(intervals.len(), 20);
        assert_eq!(&intervals[..4], &[100, 200, 200, 200]);
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_t2_schedule() {
        let mut timer = RetryTimer::new();
        assert_eq!(timer.start(TimerSchedule::T2), 150);
        let intervals: Vec<u32> = std::iter::from_fn(|| timer.next()).collect();
        assert_eq!(intervals, vec![300, 600, 1200, 1200, 1200, 1200, 1200, 1200, 1200, 1200]);
        assert_eq!(timer.retries(), 10);
    }

    #[test]
    fn test_cancel_and_restart() {
        let mut timer = RetryTimer::new();
        timer.start(TimerSchedule::T2);
        timer.next();
        timer.cancel();
        assert_eq!(timer.next(), None);
        assert_eq!(timer.start(TimerSchedule::T1), 50);
        assert_eq!(timer.retries(), 0);
    }
}
