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

//! What the filter needs from the surrounding media pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Work to run when a timer expires.
pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Network side of the filter, used for the ZRTP packets the filter
/// originates. Media packets are returned to the caller instead.
pub trait Transport: Send + Sync {
    /// Sends one framed ZRTP packet. Returns false if it could not be sent.
    fn send_packet(&self, packet: &[u8]) -> bool;
}

/// Single-shot timer service.
///
/// The filter keeps at most one timer armed. Scheduling a new task replaces
/// the pending one.
pub trait Clock: Send + Sync {
    fn schedule(&self, delay: Duration, task: TimerTask) -> bool;

    /// Cancels the pending task, if any.
    fn cancel(&self) -> bool;
}

/// A [`Clock`] that runs each task on its own sleeping thread.
///
/// Cancelled or replaced tasks are skipped when their thread wakes up.
#[derive(Debug, Default, Clone)]
pub struct ThreadClock {
    generation: Arc<AtomicU64>,
}

impl ThreadClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for ThreadClock {
    fn schedule(&self, delay: Duration, task: TimerTask) -> bool {
        let armed = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let spawned = std::thread::Builder::new()
            .name("zrtp-timer".to_string())
            .spawn(move || {
                std::thread::sleep(delay);
                if generation.load(Ordering::SeqCst) == armed {
                    task();
                }
            });
        if let Err(e) = &spawned {
            log::error!("cannot spawn timer thread: {e}");
        }
        spawned.is_ok()
    }

    fn cancel(&self) -> bool {
        self.generation.fetch_add(1, Ordering::SeqCst);
        true
    }
}
