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
//! Two filters wired back to back over in-memory wires, with manual clocks.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use zrtp_cache::{InMemoryCache, ZidCache};
use zrtp_filter::{
    Clock, FilterConfig, TimerTask, Transport, ZrtpFilter, ZrtpNotification, ZrtpObserver,
    ZrtpStatus,
};

/// Collects what the filter sends towards the network.
#[derive(Default)]
pub struct Wire {
    outbox: Mutex<VecDeque<Vec<u8>>>,
}

impl Transport for Wire {
    fn send_packet(&self, packet: &[u8]) -> bool {
        self.outbox.lock().push_back(packet.to_vec());
        true
    }
}

/// Holds the armed timer until the test fires it.
#[derive(Default)]
pub struct ManualClock {
    pending: Mutex<Option<TimerTask>>,
    pub history: Mutex<Vec<Duration>>,
}

impl Clock for ManualClock {
    fn schedule(&self, delay: Duration, task: TimerTask) -> bool {
        self.history.lock().push(delay);
        *self.pending.lock() = Some(task);
        true
    }

    fn cancel(&self) -> bool {
        self.pending.lock().take();
        true
    }
}

impl ManualClock {
    /// Runs the armed task. Returns false if nothing was armed.
    pub fn fire(&self) -> bool {
        let task = self.pending.lock().take();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.lock().is_some()
    }
}

#[derive(Default)]
pub struct Events {
    seen: Mutex<Vec<ZrtpNotification>>,
}

impl ZrtpObserver for Events {
    fn on_notification(&self, notification: &ZrtpNotification) {
        self.seen.lock().push(notification.clone());
    }
}

impl Events {
    pub fn all(&self) -> Vec<ZrtpNotification> {
        self.seen.lock().clone()
    }

    pub fn contains(&self, notification: &ZrtpNotification) -> bool {
        self.seen.lock().contains(notification)
    }

    pub fn has_status(&self, status: ZrtpStatus) -> bool {
        self.contains(&ZrtpNotification::Status(status))
    }

    pub fn sas(&self) -> Option<String> {
        self.seen.lock().iter().find_map(|n| match n {
            ZrtpNotification::Sas { sas, .. } => Some(sas.clone()),
            _ => None,
        })
    }
}

pub struct Endpoint {
    pub filter: ZrtpFilter,
    pub wire: Arc<Wire>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<Events>,
}

impl Endpoint {
    pub fn new(config: FilterConfig) -> Self {
        Self::with_cache(config, Arc::new(InMemoryCache::new()))
    }

    pub fn with_cache(config: FilterConfig, cache: Arc<dyn ZidCache>) -> Self {
        let wire = Arc::new(Wire::default());
        let clock = Arc::new(ManualClock::default());
        let events = Arc::new(Events::default());
        let filter = ZrtpFilter::with_cache(config, cache, wire.clone(), clock.clone());
        filter.add_observer(events.clone());
        Self {
            filter,
            wire,
            clock,
            events,
        }
    }

    /// Builds the filter through [`ZrtpFilter::new`], opening the named cache.
    pub fn open(config: FilterConfig) -> Self {
        let wire = Arc::new(Wire::default());
        let clock = Arc::new(ManualClock::default());
        let events = Arc::new(Events::default());
        let filter = ZrtpFilter::new(config, wire.clone(), clock.clone()).unwrap();
        filter.add_observer(events.clone());
        Self {
            filter,
            wire,
            clock,
            events,
        }
    }

    pub fn take_outbox(&self) -> Vec<Vec<u8>> {
        self.wire.outbox.lock().drain(..).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    AtoB,
    BtoA,
}

/// Message name of a framed ZRTP packet.
pub fn frame_name(packet: &[u8]) -> String {
    zrtp_proto::decode(packet)
        .map(|frame| frame.packet.name())
        .unwrap_or_else(|_| "?".to_string())
}

/// Moves packets between the two filters until both wires are quiet.
///
/// `wire` sees every packet and may drop it by returning `None`.
pub fn pump_with(
    a: &Endpoint,
    b: &Endpoint,
    mut wire: impl FnMut(Dir, Vec<u8>) -> Option<Vec<u8>>,
) -> Vec<(Dir, String)> {
    let mut transcript = Vec::new();
    for _ in 0..64 {
        let from_a = a.take_outbox();
        let from_b = b.take_outbox();
        if from_a.is_empty() && from_b.is_empty() {
            break;
        }
        for (dir, packets, to) in [(Dir::AtoB, from_a, b), (Dir::BtoA, from_b, a)] {
            for packet in packets {
                transcript.push((dir, frame_name(&packet)));
                if let Some(packet) = wire(dir, packet) {
                    assert!(to.filter.recv_rtp(&packet).unwrap().is_none());
                }
            }
        }
    }
    transcript
}

pub fn pump(a: &Endpoint, b: &Endpoint) -> Vec<(Dir, String)> {
    pump_with(a, b, |_, packet| Some(packet))
}

/// Explicitly started filter.
pub fn manual() -> FilterConfig {
    FilterConfig {
        auto_start: false,
        ..FilterConfig::default()
    }
}

/// Explicitly started filter that waits for the peer's Commit.
pub fn passive() -> FilterConfig {
    let mut config = manual();
    config.options.passive = true;
    config
}

/// A secure session, Alice as Initiator.
pub fn secure_pair() -> (Endpoint, Endpoint) {
    let alice = Endpoint::new(manual());
    let bob = Endpoint::new(passive());
    alice.filter.start().unwrap();
    bob.filter.start().unwrap();
    pump(&alice, &bob);
    assert!(alice.filter.is_secure());
    assert!(bob.filter.is_secure());
    (alice, bob)
}

/// A minimal RTP packet, payload type 96.
pub fn rtp_packet(ssrc: u32, sequence: u16, payload: &[u8]) -> Vec<u8> {
    let mut packet = vec![0x80, 0x60];
    packet.extend_from_slice(&sequence.to_be_bytes());
    packet.extend_from_slice(&(u32::from(sequence) * 160).to_be_bytes());
    packet.extend_from_slice(&ssrc.to_be_bytes());
    packet.extend_from_slice(payload);
    packet
}

/// An empty RTCP sender report.
pub fn rtcp_packet(ssrc: u32) -> Vec<u8> {
    let mut packet = vec![0x80, 200, 0x00, 0x06];
    packet.extend_from_slice(&ssrc.to_be_bytes());
    packet.extend_from_slice(&[0x11; 20]);
    packet
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
