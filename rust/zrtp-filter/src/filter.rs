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

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use zrtp_cache::{InMemoryCache, Zid, ZidCache};
use zrtp_core::{WarningCode, ZrtpEngine, ZrtpState, ZrtpStatus};
use zrtp_crypto::SasType;
use zrtp_proto::{is_zrtp_candidate, RawFrame};
use zrtp_srtp::rtp::{is_rtcp, RtpHeader};
use zrtp_srtp::{SrtpError, SrtpStreams};

use crate::config::FilterConfig;
use crate::error::FilterError;
use crate::events::{ZrtpNotification, ZrtpObserver};
use crate::host::{Counters, FilterHost};
use crate::io::{Clock, Transport};

/// Snapshot of the filter's packet counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Outbound RTP/RTCP packets protected.
    pub protected: u64,
    /// Inbound SRTP/SRTCP packets unprotected.
    pub unprotected: u64,
    /// Inbound packets dropped for a failed tag or replay check.
    pub unprotect_errors: u64,
    pub zrtp_received: u64,
    pub zrtp_sent: u64,
    /// ZRTP packets dropped for a bad CRC.
    pub crc_errors: u64,
}

/// State shared between the filter handle and its timer tasks.
pub(crate) struct Session {
    config: FilterConfig,
    enabled: AtomicBool,
    /// Latched by the first start, explicit or automatic.
    started: AtomicBool,
    ssrc_learned: AtomicBool,
    peer_ssrc: AtomicU32,
    cache: Arc<dyn ZidCache>,
    host: Arc<FilterHost>,
    /// The session lock. Holding it brackets every engine transition and
    /// every SRTP context swap the engine triggers.
    engine: Mutex<ZrtpEngine>,
}

impl Session {
    /// Runs `f` under the session lock, then delivers the notifications it
    /// produced.
    fn with_engine<R>(&self, f: impl FnOnce(&mut ZrtpEngine) -> R) -> R {
        let result = {
            let mut engine = self.engine.lock();
            let from = engine.state();
            let result = f(&mut engine);
            let to = engine.state();
            if from != to {
                self.host.notify(ZrtpNotification::StateChanged { from, to });
            }
            result
        };
        self.host.dispatch();
        result
    }

    pub(crate) fn timer_expired(&self, generation: u64) {
        self.with_engine(|engine| {
            if self.host.timer_is_current(generation) {
                engine.process_timeout();
            } else {
                log::trace!("dropping superseded timer {generation}");
            }
        });
    }

    fn start_engine(&self) {
        self.started.store(true, Ordering::SeqCst);
        let ssrc = self.host.local_ssrc.load(Ordering::Relaxed);
        self.with_engine(|engine| {
            engine.set_local_ssrc(ssrc);
            engine.start();
        });
    }

    fn auto_start(&self) {
        if !self.config.auto_start || !self.enabled.load(Ordering::SeqCst) {
            return;
        }
        if !self.started.swap(true, Ordering::SeqCst) {
            log::debug!("first media packet, starting ZRTP");
            self.start_engine();
        }
    }
}

/// A ZRTP endpoint for one media stream, placed between the network and an
/// RTP session.
///
/// All methods take `&self`; the filter can be shared between the threads
/// delivering inbound and outbound packets and the clock's timer thread.
pub struct ZrtpFilter {
    session: Arc<Session>,
}

impl ZrtpFilter {
    /// Creates a filter, opening the cache named in `config`.
    pub fn new(
        config: FilterConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, FilterError> {
        let cache: Arc<dyn ZidCache> = match &config.cache_name {
            Some(name) => zrtp_cache::open_cache(name)?,
            None => Arc::new(InMemoryCache::new()),
        };
        Ok(Self::with_cache(config, cache, transport, clock))
    }

    /// Creates a filter on an already open cache, e.g. the one of the master
    /// stream when this filter carries a multi-stream session.
    pub fn with_cache(
        config: FilterConfig,
        cache: Arc<dyn ZidCache>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let session = Arc::new_cyclic(|weak| {
            let host = Arc::new(FilterHost::new(weak.clone(), transport, clock, config.local_ssrc));
            let engine = ZrtpEngine::new(host.clone(), cache.clone(), config.engine_options());
            Session {
                enabled: AtomicBool::new(config.enable_zrtp),
                started: AtomicBool::new(false),
                ssrc_learned: AtomicBool::new(false),
                peer_ssrc: AtomicU32::new(0),
                cache,
                host,
                engine: Mutex::new(engine),
                config,
            }
        });
        Self { session }
    }

    pub fn add_observer(&self, observer: Arc<dyn ZrtpObserver>) {
        self.session.host.add_observer(observer);
    }

    pub fn config(&self) -> &FilterConfig {
        &self.session.config
    }

    /// The cache this filter's sessions retain secrets in.
    pub fn cache(&self) -> Arc<dyn ZidCache> {
        Arc::clone(&self.session.cache)
    }

    pub fn is_enabled(&self) -> bool {
        self.session.enabled.load(Ordering::SeqCst)
    }

    /// Switches ZRTP processing on or off. Active SRTP is not affected.
    pub fn set_enabled(&self, enabled: bool) {
        self.session.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Starts the handshake explicitly.
    pub fn start(&self) -> Result<(), FilterError> {
        if !self.is_enabled() {
            return Err(FilterError::Disabled);
        }
        self.session.start_engine();
        Ok(())
    }

    /// Stops the handshake, cancels the timer and drops all SRTP contexts.
    pub fn stop(&self) {
        self.session.with_engine(|engine| engine.stop());
    }

    /// Handles a packet from the network on the RTP port.
    ///
    /// Returns the packet to deliver to the RTP session, or `None` if it was
    /// a ZRTP packet and has been consumed. An error means the packet was
    /// dropped.
    pub fn recv_rtp(&self, packet: &[u8]) -> Result<Option<Vec<u8>>, FilterError> {
        if is_zrtp_candidate(packet) {
            self.recv_zrtp(packet)?;
            return Ok(None);
        }
        if is_rtcp(packet) {
            return self.recv_rtcp(packet).map(Some);
        }
        self.session.auto_start();

        let host = &self.session.host;
        let result = match host.receiver.lock().as_mut() {
            Some(streams) => streams.unprotect_rtp(packet),
            None => return Ok(Some(packet.to_vec())),
        };
        let plain = self.unprotected(result)?;
        if host.awaiting_sender.load(Ordering::SeqCst) {
            self.session.with_engine(|engine| engine.conf2_ack_secure());
        }
        Ok(Some(plain))
    }

    /// Handles a packet from the network on the RTCP port.
    pub fn recv_rtcp(&self, packet: &[u8]) -> Result<Vec<u8>, FilterError> {
        let result = match self.session.host.receiver.lock().as_mut() {
            Some(streams) => streams.unprotect_rtcp(packet),
            None => return Ok(packet.to_vec()),
        };
        self.unprotected(result)
    }

    /// Handles an RTP packet from the session, returning what to send.
    pub fn send_rtp(&self, packet: &[u8]) -> Result<Vec<u8>, FilterError> {
        if is_rtcp(packet) {
            return self.send_rtcp(packet);
        }
        if let Ok(header) = RtpHeader::parse(packet) {
            self.learn_local_ssrc(header.ssrc);
        }
        self.session.auto_start();
        self.protect(packet, SrtpStreams::protect_rtp)
    }

    /// Handles an RTCP packet from the session, returning what to send.
    pub fn send_rtcp(&self, packet: &[u8]) -> Result<Vec<u8>, FilterError> {
        self.protect(packet, SrtpStreams::protect_rtcp)
    }

    fn protect(
        &self,
        packet: &[u8],
        op: fn(&mut SrtpStreams, &[u8]) -> Result<Vec<u8>, SrtpError>,
    ) -> Result<Vec<u8>, FilterError> {
        let host = &self.session.host;
        let mut sender = host.sender.lock();
        let Some(streams) = sender.as_mut() else {
            return Ok(packet.to_vec());
        };
        let protected = op(streams, packet)?;
        Counters::bump(&host.counters.protected);
        Ok(protected)
    }

    /// Counts an unprotect result and reports failures.
    fn unprotected(&self, result: Result<Vec<u8>, SrtpError>) -> Result<Vec<u8>, FilterError> {
        let host = &self.session.host;
        match result {
            Ok(plain) => {
                Counters::bump(&host.counters.unprotected);
                Ok(plain)
            }
            Err(e) => {
                Counters::bump(&host.counters.unprotect_errors);
                let warning = match e {
                    SrtpError::Auth => Some(WarningCode::SrtpAuthError),
                    SrtpError::Replay(_) => Some(WarningCode::SrtpReplayError),
                    SrtpError::Malformed(_) | SrtpError::Key(_) => None,
                };
                log::debug!("dropping inbound media packet: {e}");
                if let Some(code) = warning {
                    host.notify(ZrtpNotification::Status(ZrtpStatus::Warning(code)));
                    host.dispatch();
                }
                Err(e.into())
            }
        }
    }

    fn recv_zrtp(&self, packet: &[u8]) -> Result<(), FilterError> {
        if !self.is_enabled() {
            log::trace!("ZRTP disabled, dropping ZRTP packet");
            return Ok(());
        }
        let host = &self.session.host;
        let frame = match RawFrame::open(packet) {
            Ok(frame) => frame,
            Err(e) if e.is_checksum() => {
                log::warn!("ZRTP packet failed CRC check");
                Counters::bump(&host.counters.crc_errors);
                host.notify(ZrtpNotification::Status(ZrtpStatus::Warning(
                    WarningCode::CrcMismatch,
                )));
                host.dispatch();
                return Err(e.into());
            }
            Err(e) => {
                log::debug!("dropping non-ZRTP packet: {e}");
                return Err(e.into());
            }
        };
        Counters::bump(&host.counters.zrtp_received);
        self.session.peer_ssrc.store(frame.ssrc, Ordering::Relaxed);
        self.session.auto_start();
        self.session.with_engine(|engine| engine.process_message(frame.message));
        Ok(())
    }

    fn learn_local_ssrc(&self, ssrc: u32) {
        if self.session.ssrc_learned.swap(true, Ordering::SeqCst) {
            return;
        }
        log::debug!("local SSRC {ssrc:#010x}");
        self.session.host.local_ssrc.store(ssrc, Ordering::Relaxed);
        self.session.with_engine(|engine| engine.set_local_ssrc(ssrc));
    }

    pub fn local_ssrc(&self) -> u32 {
        self.session.host.local_ssrc.load(Ordering::Relaxed)
    }

    /// Sets the local SSRC hint used before outbound RTP is seen.
    pub fn set_local_ssrc(&self, ssrc: u32) {
        self.session.host.local_ssrc.store(ssrc, Ordering::Relaxed);
        self.session.with_engine(|engine| engine.set_local_ssrc(ssrc));
    }

    /// SSRC of the last valid ZRTP packet received, zero before that.
    pub fn peer_ssrc(&self) -> u32 {
        self.session.peer_ssrc.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> FilterStats {
        let c = &self.session.host.counters;
        let get = |counter: &std::sync::atomic::AtomicU64| counter.load(Ordering::Relaxed);
        FilterStats {
            protected: get(&c.protected),
            unprotected: get(&c.unprotected),
            unprotect_errors: get(&c.unprotect_errors),
            zrtp_received: get(&c.zrtp_received),
            zrtp_sent: get(&c.zrtp_sent),
            crc_errors: get(&c.crc_errors),
        }
    }

    /// True while outbound media is protected.
    pub fn is_send_secure(&self) -> bool {
        self.session.host.sender.lock().is_some()
    }

    /// True while inbound media is expected to be protected.
    pub fn is_recv_secure(&self) -> bool {
        self.session.host.receiver.lock().is_some()
    }

    pub fn state(&self) -> ZrtpState {
        self.session.engine.lock().state()
    }

    pub fn is_secure(&self) -> bool {
        self.session.engine.lock().is_secure()
    }

    pub fn sas(&self) -> Option<String> {
        self.session.engine.lock().sas().map(str::to_string)
    }

    pub fn is_sas_verified(&self) -> bool {
        self.session.engine.lock().is_sas_verified()
    }

    /// Negotiated algorithms, e.g. `AES1/HS32/X255/B32`.
    pub fn cipher_info(&self) -> Option<String> {
        self.session.engine.lock().cipher_info()
    }

    pub fn peer_zid(&self) -> Option<Zid> {
        self.session.engine.lock().peer_zid()
    }

    pub fn peer_client_id(&self) -> Option<String> {
        self.session.engine.lock().peer_client_id()
    }

    pub fn set_sas_verified(&self) -> Result<(), FilterError> {
        Ok(self.session.with_engine(|engine| engine.set_sas_verified())?)
    }

    pub fn reset_sas_verified(&self) -> Result<(), FilterError> {
        Ok(self.session.with_engine(|engine| engine.reset_sas_verified())?)
    }

    /// Asks the peer to switch the session back to clear.
    pub fn request_go_clear(&self) -> Result<(), FilterError> {
        Ok(self.session.with_engine(|engine| engine.request_go_clear())?)
    }

    /// Answers a pending enrollment request.
    pub fn accept_enrollment(&self, accept: bool) -> Result<(), FilterError> {
        Ok(self.session.with_engine(|engine| engine.accept_enrollment(accept))?)
    }

    /// PBX only: relays the SAS of another call leg to this peer.
    pub fn send_sas_relay(&self, sas_hash: &[u8], sas_type: SasType) -> Result<(), FilterError> {
        Ok(self
            .session
            .with_engine(|engine| engine.send_sas_relay(sas_hash, sas_type))?)
    }

    /// The multi-stream parameter blob of a secure master session.
    ///
    /// Available once; later calls return `None`.
    pub fn multi_stream_params(&self) -> Option<Vec<u8>> {
        self.session.engine.lock().multi_stream_params()
    }

    /// Turns this filter into a multi-stream session. Must precede start.
    pub fn set_multi_stream_params(&self, blob: &[u8]) -> Result<(), FilterError> {
        Ok(self.session.engine.lock().set_multi_stream_params(blob)?)
    }

    pub fn is_multi_stream(&self) -> bool {
        self.session.engine.lock().is_multi_stream()
    }

    /// True if the peer offered multi-stream mode in its Hello.
    pub fn multi_stream_available(&self) -> bool {
        self.session.engine.lock().multi_stream_available()
    }
}

impl Drop for ZrtpFilter {
    fn drop(&mut self) {
        let mut engine = self.session.engine.lock();
        if engine.state() != ZrtpState::Idle {
            engine.stop();
        }
    }
}

impl std::fmt::Debug for ZrtpFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZrtpFilter")
            .field("enabled", &self.is_enabled())
            .field("local_ssrc", &self.local_ssrc())
            .field("peer_ssrc", &self.peer_ssrc())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
