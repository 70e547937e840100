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

//! Loopback harness: two engines wired back to back, with the timer and
//! every callback recorded instead of acted upon.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use zrtp_cache::{InMemoryCache, ZidCache};
use zrtp_core::{
    EnableSecurity, EnrollmentCode, SrtpSecrets, ZrtpCallback, ZrtpEngine, ZrtpOptions, ZrtpStatus,
};
use zrtp_proto::ZrtpPacket;

#[derive(Default)]
pub struct Recorded {
    pub outbox: VecDeque<Vec<u8>>,
    pub sent_names: Vec<String>,
    pub timer: Option<u32>,
    pub timer_history: Vec<u32>,
    pub statuses: Vec<ZrtpStatus>,
    pub failures: Vec<ZrtpStatus>,
    pub secrets_ready: Vec<(EnableSecurity, SrtpSecrets)>,
    pub secrets_off: Vec<EnableSecurity>,
    pub secure_on: Vec<(String, String, bool)>,
    pub go_clear: usize,
    pub not_supported: bool,
    pub ask_enrollment: Vec<EnrollmentCode>,
    pub inform_enrollment: Vec<EnrollmentCode>,
    pub refuse_send: bool,
}

/// Callback that records everything the engine asks for.
#[derive(Default)]
pub struct Recorder {
    pub inner: Mutex<Recorded>,
}

pub fn message_name(message: &[u8]) -> String {
    ZrtpPacket::parse(message)
        .map(|p| p.name())
        .unwrap_or_else(|_| "?".to_string())
}

impl ZrtpCallback for Recorder {
    fn send_data(&self, message: &[u8]) -> bool {
        let mut inner = self.inner.lock();
        if inner.refuse_send {
            return false;
        }
        inner.sent_names.push(message_name(message));
        inner.outbox.push_back(message.to_vec());
        true
    }

    fn activate_timer(&self, ms: u32) -> bool {
        let mut inner = self.inner.lock();
        inner.timer = Some(ms);
        inner.timer_history.push(ms);
        true
    }

    fn cancel_timer(&self) -> bool {
        self.inner.lock().timer = None;
        true
    }

    fn send_info(&self, status: ZrtpStatus) {
        self.inner.lock().statuses.push(status);
    }

    fn srtp_secrets_ready(&self, secrets: &SrtpSecrets, part: EnableSecurity) -> bool {
        self.inner.lock().secrets_ready.push((part, secrets.clone()));
        true
    }

    fn srtp_secrets_off(&self, part: EnableSecurity) {
        self.inner.lock().secrets_off.push(part);
    }

    fn srtp_secrets_on(&self, cipher: &str, sas: &str, verified: bool) {
        self.inner
            .lock()
            .secure_on
            .push((cipher.to_string(), sas.to_string(), verified));
    }

    fn handle_go_clear(&self) {
        self.inner.lock().go_clear += 1;
    }

    fn negotiation_failed(&self, status: ZrtpStatus) {
        self.inner.lock().failures.push(status);
    }

    fn not_supported_by_other(&self) {
        self.inner.lock().not_supported = true;
    }

    fn ask_enrollment(&self, code: EnrollmentCode) {
        self.inner.lock().ask_enrollment.push(code);
    }

    fn inform_enrollment(&self, code: EnrollmentCode) {
        self.inner.lock().inform_enrollment.push(code);
    }
}

/// One endpoint: engine plus its recorder.
pub struct Peer {
    pub engine: ZrtpEngine,
    pub recorder: Arc<Recorder>,
    pub cache: Arc<dyn ZidCache>,
}

impl Peer {
    pub fn new(options: ZrtpOptions, cache: Arc<dyn ZidCache>) -> Self {
        let recorder = Arc::new(Recorder::default());
        let engine = ZrtpEngine::new(recorder.clone(), cache.clone(), options);
        Self { engine, recorder, cache }
    }

    pub fn with_zid(zid: u8, options: ZrtpOptions) -> Self {
        Self::new(options, Arc::new(InMemoryCache::with_zid([zid; 12])))
    }

    pub fn take_outbox(&self) -> Vec<Vec<u8>> {
        self.recorder.inner.lock().outbox.drain(..).collect()
    }

    pub fn timer(&self) -> Option<u32> {
        self.recorder.inner.lock().timer
    }

    pub fn has_status(&self, status: ZrtpStatus) -> bool {
        self.recorder.inner.lock().statuses.contains(&status)
    }

    pub fn failures(&self) -> Vec<ZrtpStatus> {
        self.recorder.inner.lock().failures.clone()
    }

    pub fn sent_names(&self) -> Vec<String> {
        self.recorder.inner.lock().sent_names.clone()
    }

    pub fn secure_on(&self) -> Vec<(String, String, bool)> {
        self.recorder.inner.lock().secure_on.clone()
    }

    /// Fires the armed timer; returns false if none was armed.
    pub fn fire_timer(&mut self) -> bool {
        if self.recorder.inner.lock().timer.take().is_none() {
            return false;
        }
        self.engine.process_timeout();
        true
    }
}

/// Direction of a message in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    AtoB,
    BtoA,
}

/// Delivers messages back and forth until both outboxes are empty.
///
/// `wire` may drop a message (return `None`) or rewrite it.
pub fn pump_with<F>(a: &mut Peer, b: &mut Peer, mut wire: F) -> Vec<(Dir, String)>
where
    F: FnMut(Dir, Vec<u8>) -> Option<Vec<u8>>,
{
    let mut transcript = Vec::new();
    for _ in 0..64 {
        let from_a = a.take_outbox();
        let from_b = b.take_outbox();
        if from_a.is_empty() && from_b.is_empty() {
            break;
        }
        for message in from_a {
            transcript.push((Dir::AtoB, message_name(&message)));
            if let Some(message) = wire(Dir::AtoB, message) {
                b.engine.process_message(&message);
            }
        }
        for message in from_b {
            transcript.push((Dir::BtoA, message_name(&message)));
            if let Some(message) = wire(Dir::BtoA, message) {
                a.engine.process_message(&message);
            }
        }
    }
    transcript
}

pub fn pump(a: &mut Peer, b: &mut Peer) -> Vec<(Dir, String)> {
    pump_with(a, b, |_, m| Some(m))
}

/// Options of an endpoint that waits for the other side's Commit.
pub fn passive() -> ZrtpOptions {
    ZrtpOptions {
        passive: true,
        ..ZrtpOptions::default()
    }
}

/// Runs a complete handshake with `a` as Initiator.
pub fn handshake(a: &mut Peer, b: &mut Peer) -> Vec<(Dir, String)> {
    a.engine.start();
    b.engine.start();
    pump(a, b)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
