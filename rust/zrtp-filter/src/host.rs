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

//! The engine's view of the filter: framing, timer and SRTP slots.

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use zrtp_core::{EnableSecurity, EnrollmentCode, SrtpSecrets, ZrtpCallback, ZrtpStatus};
use zrtp_srtp::{CounterCipher, SrtpParams, SrtpStreams};

use crate::events::{ZrtpNotification, ZrtpObserver};
use crate::filter::Session;
use crate::io::{Clock, Transport};

/// Packet counters, updated without locking.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub protected: AtomicU64,
    pub unprotected: AtomicU64,
    pub unprotect_errors: AtomicU64,
    pub zrtp_received: AtomicU64,
    pub zrtp_sent: AtomicU64,
    pub crc_errors: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Implements [`ZrtpCallback`] for one filter.
///
/// Every method runs while the session lock is held. Notifications are only
/// queued here and delivered by [`FilterHost::dispatch`] once the lock is
/// released.
pub(crate) struct FilterHost {
    session: Weak<Session>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    sequence: AtomicU16,
    pub local_ssrc: AtomicU32,
    timer_generation: AtomicU64,
    /// Set while the receiver is keyed but the sender is not, the window in
    /// which authenticated SRTP from the peer replaces a lost Conf2Ack.
    pub awaiting_sender: AtomicBool,
    pub sender: Mutex<Option<SrtpStreams>>,
    pub receiver: Mutex<Option<SrtpStreams>>,
    pub counters: Counters,
    pending: Mutex<Vec<ZrtpNotification>>,
    observers: RwLock<Vec<Arc<dyn ZrtpObserver>>>,
}

impl FilterHost {
    pub fn new(
        session: Weak<Session>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        local_ssrc: u32,
    ) -> Self {
        let seq = zrtp_crypto::random_array::<2>();
        Self {
            session,
            transport,
            clock,
            sequence: AtomicU16::new(u16::from_be_bytes(seq)),
            local_ssrc: AtomicU32::new(local_ssrc),
            timer_generation: AtomicU64::new(0),
            awaiting_sender: AtomicBool::new(false),
            sender: Mutex::new(None),
            receiver: Mutex::new(None),
            counters: Counters::default(),
            pending: Mutex::new(Vec::new()),
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn add_observer(&self, observer: Arc<dyn ZrtpObserver>) {
        self.observers.write().push(observer);
    }

    pub fn notify(&self, notification: ZrtpNotification) {
        self.pending.lock().push(notification);
    }

    /// Delivers queued notifications. Must not be called with the session
    /// lock held.
    pub fn dispatch(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        if pending.is_empty() {
            return;
        }
        let observers = self.observers.read().clone();
        for notification in &pending {
            for observer in &observers {
                observer.on_notification(notification);
            }
        }
    }

    /// True if `generation` is the timer armed last.
    pub fn timer_is_current(&self, generation: u64) -> bool {
        self.timer_generation.load(Ordering::SeqCst) == generation
    }

    fn slot(&self, part: EnableSecurity) -> &Mutex<Option<SrtpStreams>> {
        match part {
            EnableSecurity::ForSender => &self.sender,
            EnableSecurity::ForReceiver => &self.receiver,
        }
    }
}

/// SRTP parameters for one direction of a negotiated session.
fn srtp_params(secrets: &SrtpSecrets, part: EnableSecurity) -> SrtpParams {
    let (key, salt) = match part {
        EnableSecurity::ForSender => secrets.sender_key(),
        EnableSecurity::ForReceiver => secrets.receiver_key(),
    };
    SrtpParams {
        cipher: if secrets.cipher.is_twofish() {
            CounterCipher::Twofish
        } else {
            CounterCipher::Aes
        },
        master_key: key.to_vec(),
        master_salt: salt.to_vec(),
        tag_len: secrets.tag_len(),
    }
}

impl ZrtpCallback for FilterHost {
    fn send_data(&self, message: &[u8]) -> bool {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let ssrc = self.local_ssrc.load(Ordering::Relaxed);
        let packet = match zrtp_proto::frame::seal(sequence, ssrc, message) {
            Ok(packet) => packet,
            Err(e) => {
                log::error!("cannot frame ZRTP message: {e}");
                return false;
            }
        };
        if !self.transport.send_packet(&packet) {
            log::warn!("transport refused a ZRTP packet of {} bytes", packet.len());
            return false;
        }
        Counters::bump(&self.counters.zrtp_sent);
        true
    }

    fn activate_timer(&self, ms: u32) -> bool {
        let armed = self.timer_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let session = self.session.clone();
        self.clock.schedule(
            Duration::from_millis(u64::from(ms)),
            Box::new(move || {
                if let Some(session) = session.upgrade() {
                    session.timer_expired(armed);
                }
            }),
        )
    }

    fn cancel_timer(&self) -> bool {
        self.timer_generation.fetch_add(1, Ordering::SeqCst);
        self.clock.cancel()
    }

    fn send_info(&self, status: ZrtpStatus) {
        self.notify(ZrtpNotification::Status(status));
    }

    fn srtp_secrets_ready(&self, secrets: &SrtpSecrets, part: EnableSecurity) -> bool {
        let streams = match SrtpStreams::new(&srtp_params(secrets, part)) {
            Ok(streams) => streams,
            Err(e) => {
                log::error!("cannot create SRTP contexts {part:?}: {e}");
                return false;
            }
        };
        log::debug!("SRTP active {part:?} with {:?}/{:?}", secrets.cipher, secrets.auth_tag);
        *self.slot(part).lock() = Some(streams);
        self.awaiting_sender
            .store(part == EnableSecurity::ForReceiver, Ordering::SeqCst);
        true
    }

    fn srtp_secrets_off(&self, part: EnableSecurity) {
        log::debug!("SRTP off {part:?}");
        self.slot(part).lock().take();
        self.awaiting_sender.store(false, Ordering::SeqCst);
        self.notify(ZrtpNotification::SecurityOff(part));
    }

    fn srtp_secrets_on(&self, cipher: &str, sas: &str, verified: bool) {
        self.notify(ZrtpNotification::Algorithm {
            cipher: cipher.to_string(),
            verified,
        });
        if !sas.is_empty() {
            self.notify(ZrtpNotification::Sas {
                sas: sas.to_string(),
                verified,
            });
        }
    }

    fn handle_go_clear(&self) {
        self.notify(ZrtpNotification::GoClear);
    }

    fn negotiation_failed(&self, status: ZrtpStatus) {
        self.notify(ZrtpNotification::NegotiationFailed(status));
    }

    fn not_supported_by_other(&self) {
        self.notify(ZrtpNotification::NotSupported);
    }

    fn ask_enrollment(&self, code: EnrollmentCode) {
        self.notify(ZrtpNotification::AskEnrollment(code));
    }

    fn inform_enrollment(&self, code: EnrollmentCode) {
        self.notify(ZrtpNotification::InformEnrollment(code));
    }
}
