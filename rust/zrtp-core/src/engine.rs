/*
 * Copyright 2006 - 2018, Werner Dittmann
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

//! The ZRTP protocol engine.
//!
//! [`ZrtpEngine`] is driven from outside: the host feeds received ZRTP
//! messages to [`ZrtpEngine::process_message`], timer expiries to
//! [`ZrtpEngine::process_timeout`], and gets everything back through its
//! [`ZrtpCallback`]. The engine keeps no lock of its own; the host must
//! serialize calls.

use std::sync::Arc;

use zrtp_cache::{unix_now, Zid, ZidCache, ZidRecord, RS_LEN};
use zrtp_crypto::{
    constant_time_eq, derive_multi_stream_s0, derive_s0, derive_session_keys, id_list,
    kdf_context, negotiate, random_array, retained_secret_id, AlgorithmId, DiffieHellman, Hash,
    HashAlgorithm, KeyAgreement, SasType, ZrtpKeys,
};
use zrtp_proto::{
    mac_covered, set_trailing_mac, AckKind, CommitMode, CommitPacket, ConfirmBody, ConfirmPacket,
    DHPartPacket, ErrorPacket, GoClearPacket, HelloPacket, PingAckPacket, PingPacket,
    SasRelayBody, SasRelayPacket, ZrtpPacket, KA_MULTI_STREAM, MAC_LEN, ZRTP_VERSION,
};

use crate::callback::{EnableSecurity, Role, SrtpSecrets, ZrtpCallback};
use crate::error::ZrtpError;
use crate::keys::{implicit_hash, implicit_mac, HashChain, NegotiatedAlgorithms};
use crate::multistream::MultiStreamParams;
use crate::options::{TimerSchedule, ZrtpOptions};
use crate::state::ZrtpState;
use crate::status::{EnrollmentCode, ErrorCode, InfoCode, SevereCode, WarningCode, ZrtpStatus};
use crate::timer::RetryTimer;

/// A parsed message together with the exact bytes it travelled as.
struct Message<P> {
    packet: P,
    raw: Vec<u8>,
}

/// What we know about the peer after its Hello.
struct PeerHello {
    packet: HelloPacket,
    raw: Vec<u8>,
    /// Cache record as it was when the Hello arrived.
    record: Option<ZidRecord>,
}

#[derive(Default)]
struct RetainedSecrets {
    rs1: Option<[u8; RS_LEN]>,
    rs2: Option<[u8; RS_LEN]>,
    pbx: Option<[u8; RS_LEN]>,
}

fn truncated_mac(mac: &[u8]) -> [u8; MAC_LEN] {
    let mut out = [0u8; MAC_LEN];
    out.copy_from_slice(&mac[..MAC_LEN]);
    out
}

fn message_name(message: &[u8]) -> String {
    message
        .get(4..12)
        .map(|t| String::from_utf8_lossy(t).trim_end().to_string())
        .unwrap_or_default()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Accepts a committed algorithm if we offer it or it is mandatory.
fn supported<A: AlgorithmId>(local: &[A], id: &[u8; 4]) -> Option<A> {
    A::from_id(id).filter(|alg| local.contains(alg) || *alg == A::MANDATORY)
}

/// One ZRTP session.
pub struct ZrtpEngine {
    callback: Arc<dyn ZrtpCallback>,
    cache: Arc<dyn ZidCache>,
    options: ZrtpOptions,
    own_zid: Zid,
    local_ssrc: u32,

    state: ZrtpState,
    role: Option<Role>,
    started: bool,
    timer: RetryTimer,
    chain: HashChain,
    own_hello: Vec<u8>,
    /// The message repeated on timeout, or on a repeated peer message.
    sent: Option<Vec<u8>>,

    peer: Option<PeerHello>,
    algorithms: Option<NegotiatedAlgorithms>,
    dh: Option<(KeyAgreement, Box<dyn DiffieHellman>)>,
    own_pv: Vec<u8>,
    own_commit: Option<Message<CommitPacket>>,
    own_dh2: Option<Vec<u8>>,
    peer_commit: Option<Message<CommitPacket>>,
    dh1: Option<Message<DHPartPacket>>,
    dh2: Option<Message<DHPartPacket>>,
    keys: Option<ZrtpKeys>,
    sas: Option<String>,
    sas_verified: bool,
    peer_confirm: Option<ConfirmBody>,
    sender_active: bool,
    receiver_active: bool,

    multi_stream: Option<MultiStreamParams>,
    exported: bool,
    pending_enrollment: Option<Vec<u8>>,
    relay_pending: bool,
}

impl ZrtpEngine {
    /// Creates an idle session. The own ZID comes from the cache.
    pub fn new(callback: Arc<dyn ZrtpCallback>, cache: Arc<dyn ZidCache>, options: ZrtpOptions) -> Self {
        let own_zid = cache.own_zid();
        Self {
            callback,
            cache,
            options,
            own_zid,
            local_ssrc: 0,
            state: ZrtpState::Idle,
            role: None,
            started: false,
            timer: RetryTimer::new(),
            chain: HashChain::new(),
            own_hello: Vec::new(),
            sent: None,
            peer: None,
            algorithms: None,
            dh: None,
            own_pv: Vec::new(),
            own_commit: None,
            own_dh2: None,
            peer_commit: None,
            dh1: None,
            dh2: None,
            keys: None,
            sas: None,
            sas_verified: false,
            peer_confirm: None,
            sender_active: false,
            receiver_active: false,
            multi_stream: None,
            exported: false,
            pending_enrollment: None,
            relay_pending: false,
        }
    }

    /// Starts the discovery phase by sending Hello.
    ///
    /// Only valid in Idle or after a failed negotiation.
    pub fn start(&mut self) {
        if !matches!(self.state, ZrtpState::Idle | ZrtpState::Error) {
            log::warn!("start ignored in {:?}", self.state);
            return;
        }
        log::info!("starting ZRTP session, ZID {}", to_hex(&self.own_zid));
        self.reset_session();
        self.started = true;
        self.own_hello = self.build_hello();
        let hello = self.own_hello.clone();
        if !self.send(&hello) {
            return;
        }
        self.set_state(ZrtpState::Detect);
        self.start_timer(self.options.t1);
    }

    /// Stops the session and removes any SRTP secrets.
    pub fn stop(&mut self) {
        log::info!("stopping ZRTP session in {:?}", self.state);
        self.cancel_timer();
        self.secrets_off();
        self.set_state(ZrtpState::Idle);
    }

    /// Handles one received ZRTP message (framing and CRC already removed).
    pub fn process_message(&mut self, message: &[u8]) {
        let packet = match ZrtpPacket::parse(message) {
            Ok(packet) => packet,
            Err(e) => {
                log::debug!("dropping malformed ZRTP message: {e}");
                return;
            }
        };
        log::debug!("{:?}: received {}", self.state, packet.name());

        match (self.state, packet) {
            (_, ZrtpPacket::Ping(ping)) => self.answer_ping(ping),
            (_, ZrtpPacket::PingAck(_)) => {}

            (ZrtpState::Idle, ZrtpPacket::GoClear(_)) if self.keys.is_some() => {
                // Our ClearAck got lost.
                self.send_ack(AckKind::ClearAck);
            }
            (ZrtpState::Idle, _) => {}
            (ZrtpState::Error, ZrtpPacket::Error(_)) => {
                self.send_ack(AckKind::ErrorAck);
            }
            (ZrtpState::Error, _) => {}
            (ZrtpState::WaitErrorAck, ZrtpPacket::ErrorAck) => {
                self.cancel_timer();
                self.sent = None;
                self.set_state(ZrtpState::Error);
            }
            (ZrtpState::WaitClearAck, ZrtpPacket::Error(error))
                if error.error_code == ErrorCode::GoClearNotAllowed.code() =>
            {
                self.go_clear_refused();
            }
            (_, ZrtpPacket::Error(error)) => self.peer_error(error.error_code),

            (ZrtpState::Detect, ZrtpPacket::Hello(hello)) => {
                if self.accept_hello(hello, message) && self.send_ack(AckKind::HelloAck) {
                    // T1 keeps running: our Hello is not acknowledged yet.
                    self.set_state(ZrtpState::AckSent);
                }
            }
            (ZrtpState::Detect, ZrtpPacket::HelloAck) => {
                self.cancel_timer();
                self.set_state(ZrtpState::AckDetected);
            }
            (ZrtpState::AckDetected, ZrtpPacket::Hello(hello)) => {
                if !self.accept_hello(hello, message) {
                    return;
                }
                // Our Commit doubles as the HelloACK.
                if !self.options.passive {
                    self.send_commit();
                } else if self.send_ack(AckKind::HelloAck) {
                    self.set_state(ZrtpState::WaitCommit);
                }
            }
            (ZrtpState::AckSent | ZrtpState::WaitCommit, ZrtpPacket::Hello(_)) => {
                self.send_ack(AckKind::HelloAck);
            }
            (ZrtpState::AckSent, ZrtpPacket::HelloAck) => {
                self.cancel_timer();
                self.commit_or_wait();
            }
            (ZrtpState::AckSent | ZrtpState::WaitCommit, ZrtpPacket::Commit(commit)) => {
                self.cancel_timer();
                self.responder_commit(commit, message);
            }

            (ZrtpState::CommitSent, ZrtpPacket::Commit(commit)) => {
                self.commit_contention(commit, message)
            }
            (ZrtpState::CommitSent, ZrtpPacket::DHPart1(dh1)) if !self.is_multi_stream() => {
                self.initiator_dh1(dh1, message)
            }
            (ZrtpState::CommitSent, ZrtpPacket::Confirm1(confirm)) if self.is_multi_stream() => {
                self.initiator_confirm1(confirm)
            }
            (ZrtpState::WaitConfirm1, ZrtpPacket::Confirm1(confirm)) => {
                self.initiator_confirm1(confirm)
            }
            (ZrtpState::WaitConfAck, ZrtpPacket::Conf2Ack) => self.initiator_secure(),

            (ZrtpState::WaitDHPart2, ZrtpPacket::Commit(_)) => self.resend(),
            (ZrtpState::WaitDHPart2, ZrtpPacket::DHPart2(dh2)) => self.responder_dh2(dh2, message),
            (ZrtpState::WaitConfirm2, ZrtpPacket::Commit(_) | ZrtpPacket::DHPart2(_)) => {
                self.resend()
            }
            (ZrtpState::WaitConfirm2, ZrtpPacket::Confirm2(confirm)) => {
                self.responder_confirm2(confirm)
            }

            (ZrtpState::Secure, ZrtpPacket::Confirm2(_)) => {
                // Our Conf2Ack got lost.
                self.send_ack(AckKind::Conf2Ack);
            }
            (ZrtpState::Secure, ZrtpPacket::GoClear(go_clear)) => self.peer_go_clear(go_clear),
            (ZrtpState::Secure, ZrtpPacket::SasRelay(relay)) => self.peer_sas_relay(relay),
            (ZrtpState::Secure, ZrtpPacket::RelayAck) if self.relay_pending => {
                self.relay_pending = false;
                self.sent = None;
                self.cancel_timer();
            }
            (ZrtpState::WaitClearAck, ZrtpPacket::ClearAck) => self.clear_acknowledged(),

            (state, packet) => log::debug!("ignoring {} in {state:?}", packet.name()),
        }
    }

    /// Handles expiry of the timer armed through [`ZrtpCallback::activate_timer`].
    pub fn process_timeout(&mut self) {
        if !self.timer.is_armed() {
            log::debug!("stale timeout in {:?}", self.state);
            return;
        }
        let Some(ms) = self.timer.next() else {
            self.callback.cancel_timer();
            self.retries_exhausted();
            return;
        };
        let message = match self.state {
            ZrtpState::Detect | ZrtpState::AckSent => Some(self.own_hello.clone()),
            _ => self.sent.clone(),
        };
        let Some(message) = message else {
            self.cancel_timer();
            return;
        };
        log::debug!(
            "{:?}: resending {} (retry {})",
            self.state,
            message_name(&message),
            self.timer.retries()
        );
        if !self.send(&message) {
            return;
        }
        if !self.callback.activate_timer(ms) {
            self.timer.cancel();
            self.fail(SevereCode::NoTimer);
        }
    }

    /// The first SRTP packet from the peer authenticated, which proves it
    /// got Confirm2 even if Conf2Ack was lost.
    pub fn conf2_ack_secure(&mut self) {
        if self.state == ZrtpState::WaitConfAck {
            log::debug!("SRTP from peer stands in for Conf2Ack");
            self.initiator_secure();
        }
    }

    /// SSRC reported in PingACK.
    pub fn set_local_ssrc(&mut self, ssrc: u32) {
        self.local_ssrc = ssrc;
    }

    pub fn state(&self) -> ZrtpState {
        self.state
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_secure(&self) -> bool {
        self.state == ZrtpState::Secure
    }

    pub fn options(&self) -> &ZrtpOptions {
        &self.options
    }

    pub fn own_zid(&self) -> Zid {
        self.own_zid
    }

    pub fn peer_zid(&self) -> Option<Zid> {
        self.peer.as_ref().map(|p| p.packet.zid)
    }

    /// Client id the peer sent in Hello, trailing spaces removed.
    pub fn peer_client_id(&self) -> Option<String> {
        self.peer
            .as_ref()
            .map(|p| String::from_utf8_lossy(&p.packet.client_id).trim_end().to_string())
    }

    /// The peer's Hello had the M flag set.
    pub fn peer_is_mitm(&self) -> bool {
        self.peer.as_ref().map_or(false, |p| p.packet.mitm)
    }

    /// The rendered SAS, once keys are derived. Empty in multi-stream mode.
    pub fn sas(&self) -> Option<&str> {
        self.sas.as_deref()
    }

    /// The full sashash, the value a SAS signature covers.
    pub fn sas_hash(&self) -> Option<&[u8]> {
        self.keys.as_ref().map(|k| k.sas_hash.as_slice())
    }

    pub fn is_sas_verified(&self) -> bool {
        self.sas_verified
    }

    pub fn algorithms(&self) -> Option<NegotiatedAlgorithms> {
        self.algorithms
    }

    /// Negotiated algorithms as reported to `srtp_secrets_on`.
    pub fn cipher_info(&self) -> Option<String> {
        self.keys.as_ref()?;
        self.algorithms.map(|a| a.describe())
    }

    /// Key material exported for use outside SRTP.
    pub fn exported_key(&self) -> Option<&[u8]> {
        self.keys.as_ref().map(|k| k.exported_key.as_slice())
    }

    /// 64-bit endpoint hash carried in Ping and PingACK.
    pub fn endpoint_hash(&self) -> [u8; 8] {
        truncated_mac(&implicit_hash(&self.own_zid))
    }

    /// Marks the peer's SAS as verified by the user.
    pub fn set_sas_verified(&mut self) -> Result<(), ZrtpError> {
        let peer_zid = self.peer_zid().ok_or(ZrtpError::NoPeer)?;
        self.cache.update_record(&peer_zid, &mut |r| r.set_sas_verified())?;
        self.sas_verified = true;
        Ok(())
    }

    pub fn reset_sas_verified(&mut self) -> Result<(), ZrtpError> {
        let peer_zid = self.peer_zid().ok_or(ZrtpError::NoPeer)?;
        self.cache.update_record(&peer_zid, &mut |r| r.reset_sas_verified())?;
        self.sas_verified = false;
        Ok(())
    }

    /// Asks the peer to switch the session back to clear.
    pub fn request_go_clear(&mut self) -> Result<(), ZrtpError> {
        if self.state != ZrtpState::Secure {
            return Err(ZrtpError::NotSecure);
        }
        if !(self.options.allow_clear && self.peer_allows_clear()) {
            return Err(ZrtpError::NotAllowed("GoClear"));
        }
        let role = self.role.ok_or(ZrtpError::NotSecure)?;
        let clear_hmac = self.clear_mac(role).ok_or(ZrtpError::NotSecure)?;
        log::info!("requesting clear mode");
        if self.sender_active {
            self.sender_active = false;
            self.callback.srtp_secrets_off(EnableSecurity::ForSender);
        }
        if self.send_kept(GoClearPacket { clear_hmac }.to_bytes()) {
            self.set_state(ZrtpState::WaitClearAck);
            self.start_timer(self.options.t2);
        }
        Ok(())
    }

    /// Relays the SAS of another call leg; only a trusted MiTM does this.
    pub fn send_sas_relay(&mut self, sas_hash: &[u8], sas_type: SasType) -> Result<(), ZrtpError> {
        if !self.options.mitm_mode {
            return Err(ZrtpError::NotAllowed("SAS relay needs MiTM mode"));
        }
        if self.state != ZrtpState::Secure {
            return Err(ZrtpError::NotSecure);
        }
        if sas_hash.len() < 32 {
            return Err(ZrtpError::NotAllowed("SAS hash shorter than 32 bytes"));
        }
        let role = self.role.ok_or(ZrtpError::NotSecure)?;
        let algorithms = self.algorithms.ok_or(ZrtpError::NotSecure)?;
        let (hmac_key, zrtp_key) = self.confirm_keys(role).ok_or(ZrtpError::NotSecure)?;

        let mut trusted_sas_hash = [0u8; 32];
        trusted_sas_hash.copy_from_slice(&sas_hash[..32]);
        let body = SasRelayBody {
            flags: 0,
            sas_type: sas_type.id(),
            trusted_sas_hash,
            signature: Vec::new(),
        };
        let iv = random_array::<16>();
        let encrypted = algorithms
            .cipher
            .provider()
            .encrypt(&zrtp_key, &iv, &body.to_bytes())
            .map_err(|e| ZrtpError::Crypto(e.to_string()))?;
        let mac = truncated_mac(&algorithms.hash.provider().hmac(&hmac_key, &encrypted));

        if self.send_kept(SasRelayPacket { mac, iv, encrypted }.to_bytes()) {
            self.relay_pending = true;
            self.start_timer(self.options.t2);
        }
        Ok(())
    }

    /// Answers a pending [`ZrtpCallback::ask_enrollment`].
    pub fn accept_enrollment(&mut self, accept: bool) -> Result<(), ZrtpError> {
        let key = self
            .pending_enrollment
            .take()
            .ok_or(ZrtpError::NoEnrollmentPending)?;
        if !accept {
            self.callback.inform_enrollment(EnrollmentCode::Canceled);
            return Ok(());
        }
        let peer_zid = self.peer_zid().ok_or(ZrtpError::NoPeer)?;
        match self.cache.update_record(&peer_zid, &mut |r| r.set_mitm_key(&key)) {
            Ok(_) => {
                log::info!("enrolled with trusted MiTM {}", to_hex(&peer_zid));
                self.callback.inform_enrollment(EnrollmentCode::Ok);
                Ok(())
            }
            Err(e) => {
                self.callback.inform_enrollment(EnrollmentCode::Failed);
                Err(e.into())
            }
        }
    }

    /// Exports the parameters further streams to the same peer start from.
    ///
    /// Only a secure master session exports, and only once.
    pub fn multi_stream_params(&mut self) -> Option<Vec<u8>> {
        if self.state != ZrtpState::Secure || self.exported || self.is_multi_stream() {
            return None;
        }
        let algorithms = self.algorithms?;
        let peer_zid = self.peer_zid()?;
        let zrtp_session = self.keys.as_ref()?.zrtp_session.clone();
        self.exported = true;
        let params = MultiStreamParams {
            algorithms: NegotiatedAlgorithms {
                key_agreement: KeyAgreement::Mult,
                ..algorithms
            },
            peer_zid,
            zrtp_session,
        };
        Some(params.to_bytes())
    }

    /// Turns this session into a multi-stream session of a secure master.
    pub fn set_multi_stream_params(&mut self, blob: &[u8]) -> Result<(), ZrtpError> {
        if self.exported {
            return Err(ZrtpError::IsMaster);
        }
        if self.started {
            return Err(ZrtpError::AlreadyStarted);
        }
        if self.multi_stream.is_some() {
            return Err(ZrtpError::MultiStreamAlreadySet);
        }
        let params = MultiStreamParams::from_bytes(blob)?;
        log::debug!("multi-stream parameters set: {params:?}");
        self.multi_stream = Some(params);
        Ok(())
    }

    /// True if this session runs (or will try to run) in multi-stream mode.
    pub fn is_multi_stream(&self) -> bool {
        match self.algorithms {
            Some(algorithms) => algorithms.key_agreement == KeyAgreement::Mult,
            None => self.multi_stream.is_some(),
        }
    }

    /// The peer's Hello offers multi-stream mode.
    pub fn multi_stream_available(&self) -> bool {
        self.peer
            .as_ref()
            .map_or(false, |p| p.packet.key_agreements.contains(&KA_MULTI_STREAM))
    }

    // Discovery

    fn reset_session(&mut self) {
        self.role = None;
        self.timer = RetryTimer::new();
        self.chain = HashChain::new();
        self.sent = None;
        self.peer = None;
        self.algorithms = None;
        self.dh = None;
        self.own_pv.clear();
        self.own_commit = None;
        self.own_dh2 = None;
        self.peer_commit = None;
        self.dh1 = None;
        self.dh2 = None;
        self.keys = None;
        self.sas = None;
        self.sas_verified = false;
        self.peer_confirm = None;
        self.sender_active = false;
        self.receiver_active = false;
        self.pending_enrollment = None;
        self.relay_pending = false;
    }

    fn build_hello(&self) -> Vec<u8> {
        let hello = HelloPacket {
            version: ZRTP_VERSION,
            client_id: self.options.client_id_bytes(),
            hash_h3: self.chain.h3,
            zid: self.own_zid,
            signature_capable: false,
            mitm: self.options.mitm_mode,
            passive: self.options.passive,
            hashes: id_list(&self.options.hashes),
            ciphers: id_list(&self.options.ciphers),
            auth_tags: id_list(&self.options.auth_tags),
            key_agreements: id_list(&self.options.offered_key_agreements()),
            sas_types: id_list(&self.options.sas_types),
            mac: [0; MAC_LEN],
        };
        let mut raw = hello.to_bytes();
        let mac = implicit_mac(&self.chain.h2, mac_covered(&raw));
        set_trailing_mac(&mut raw, &mac);
        raw
    }

    /// Validates the peer Hello, loads its cache record and prepares our Commit.
    fn accept_hello(&mut self, hello: HelloPacket, raw: &[u8]) -> bool {
        if !hello.version.starts_with(b"1.1") {
            log::warn!(
                "peer speaks ZRTP version {}",
                String::from_utf8_lossy(&hello.version)
            );
            self.protocol_error(ErrorCode::UnsuppZrtpVersion);
            return false;
        }
        if hello.zid == self.own_zid {
            self.protocol_error(ErrorCode::EqualZidHello);
            return false;
        }
        self.callback.send_info(ZrtpStatus::Info(InfoCode::HelloReceived));

        let record = match self.cache.get_record(&hello.zid) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("ZID cache lookup failed: {e}");
                None
            }
        };
        log::debug!(
            "peer ZID {} client '{}' known {} mitm {} passive {}",
            to_hex(&hello.zid),
            String::from_utf8_lossy(&hello.client_id).trim_end(),
            record.is_some(),
            hello.mitm,
            hello.passive
        );
        self.peer = Some(PeerHello {
            packet: hello,
            raw: raw.to_vec(),
            record,
        });
        self.prepare_commit()
    }

    fn dh_key_agreements(&self) -> Vec<KeyAgreement> {
        self.options
            .key_agreements
            .iter()
            .copied()
            .filter(|ka| *ka != KeyAgreement::Mult)
            .collect()
    }

    /// Builds the Commit we send if we end up Initiator. In DH mode this
    /// also builds DHPart2, which hvi covers.
    fn prepare_commit(&mut self) -> bool {
        let Some(peer) = self.peer.as_ref() else {
            return false;
        };
        let offer = peer.packet.clone();
        let peer_raw = peer.raw.clone();

        // Multi-stream only towards the peer the master session keyed with.
        let multi_stream = self
            .multi_stream
            .as_ref()
            .filter(|params| {
                offer.key_agreements.contains(&KA_MULTI_STREAM) && offer.zid == params.peer_zid
            })
            .map(|params| params.algorithms);
        if multi_stream.is_none() && self.multi_stream.is_some() {
            log::info!("peer {} is not the master's peer, using DH mode", to_hex(&offer.zid));
        }

        let (algorithms, mode) = match multi_stream {
            Some(algorithms) => {
                self.own_dh2 = None;
                (algorithms, CommitMode::MultiStream { nonce: random_array() })
            }
            None => {
                let algorithms = NegotiatedAlgorithms {
                    hash: negotiate(&self.options.hashes, &offer.hashes),
                    cipher: negotiate(&self.options.ciphers, &offer.ciphers),
                    auth_tag: negotiate(&self.options.auth_tags, &offer.auth_tags),
                    key_agreement: negotiate(&self.dh_key_agreements(), &offer.key_agreements),
                    sas: negotiate(&self.options.sas_types, &offer.sas_types),
                };
                self.algorithms = Some(algorithms);
                if !self.generate_keypair(algorithms.key_agreement) {
                    return false;
                }
                let dh2 = self.build_dh_part(DHPartPacket::MESSAGE_TYPE_DH2, Role::Initiator);
                let hvi = algorithms.hash_256(&[&dh2.raw[..], &peer_raw[..]]);
                self.own_dh2 = Some(dh2.raw);
                (algorithms, CommitMode::DiffieHellman { hvi })
            }
        };
        self.algorithms = Some(algorithms);

        let mut commit = CommitPacket {
            hash_h2: self.chain.h2,
            zid: self.own_zid,
            hash_alg: algorithms.hash.id(),
            cipher_alg: algorithms.cipher.id(),
            auth_tag_alg: algorithms.auth_tag.id(),
            key_agreement_alg: algorithms.key_agreement.id(),
            sas_alg: algorithms.sas.id(),
            mode,
            mac: [0; MAC_LEN],
        };
        let mut raw = commit.to_bytes();
        commit.mac = implicit_mac(&self.chain.h1, mac_covered(&raw));
        set_trailing_mac(&mut raw, &commit.mac);
        self.own_commit = Some(Message { packet: commit, raw });
        true
    }

    fn generate_keypair(&mut self, key_agreement: KeyAgreement) -> bool {
        let Some(mut dh) = key_agreement.provider() else {
            self.fail(SevereCode::ProtocolError);
            return false;
        };
        match dh.generate_keypair() {
            Ok(pv) => {
                self.own_pv = pv;
                self.dh = Some((key_agreement, dh));
                true
            }
            Err(e) => {
                log::error!("cannot generate {} key pair: {e}", key_agreement.name());
                self.protocol_error(ErrorCode::CriticalSwError);
                false
            }
        }
    }

    /// Our Hello is acknowledged: commit unless passive.
    fn commit_or_wait(&mut self) {
        if self.options.passive {
            self.set_state(ZrtpState::WaitCommit);
        } else {
            self.send_commit();
        }
    }

    fn send_commit(&mut self) {
        let Some(commit) = self.own_commit.as_ref().map(|c| c.raw.clone()) else {
            self.fail(SevereCode::ProtocolError);
            return;
        };
        self.role = Some(Role::Initiator);
        self.warn_strength_mismatch();
        if !self.send_kept(commit) {
            return;
        }
        if !self.is_multi_stream() {
            self.callback.send_info(ZrtpStatus::Info(InfoCode::CommitDhGenerated));
        }
        self.set_state(ZrtpState::CommitSent);
        self.start_timer(self.options.t2);
    }

    fn warn_strength_mismatch(&self) {
        if self.algorithms.map_or(false, |a| a.strength_mismatch()) {
            self.callback.send_info(ZrtpStatus::Warning(WarningCode::DhAesMismatch));
        }
    }

    // Commit

    fn commit_contention(&mut self, commit: CommitPacket, raw: &[u8]) {
        let Some(ours) = self.own_commit.as_ref() else {
            return;
        };
        let we_win = match (ours.packet.is_multi_stream(), commit.is_multi_stream()) {
            (false, true) => true,
            (true, false) => false,
            _ => ours.packet.contention_value() > commit.contention_value(),
        };
        if we_win {
            log::debug!("Commit contention: staying Initiator");
            return;
        }
        log::debug!("Commit contention: peer wins, becoming Responder");
        self.cancel_timer();
        self.sent = None;
        self.responder_commit(commit, raw);
    }

    /// Checks the committed algorithms, answering with Error if unsupported.
    fn committed_algorithms(&mut self, commit: &CommitPacket) -> Option<NegotiatedAlgorithms> {
        if commit.is_multi_stream() {
            let Some(params) = self.multi_stream.as_ref() else {
                self.protocol_error(ErrorCode::UnsuppPkExchange);
                return None;
            };
            if params.peer_zid != commit.zid {
                log::warn!(
                    "multi-stream Commit from {}, master keyed with {}",
                    to_hex(&commit.zid),
                    to_hex(&params.peer_zid)
                );
                self.protocol_error(ErrorCode::UnsuppPkExchange);
                return None;
            }
            let algorithms = params.algorithms;
            let mismatch = if commit.hash_alg != algorithms.hash.id() {
                Some(ErrorCode::UnsuppHashType)
            } else if commit.cipher_alg != algorithms.cipher.id() {
                Some(ErrorCode::UnsuppCipherType)
            } else if commit.auth_tag_alg != algorithms.auth_tag.id() {
                Some(ErrorCode::UnsuppSrtpAuthTag)
            } else {
                None
            };
            if let Some(code) = mismatch {
                self.protocol_error(code);
                return None;
            }
            return Some(algorithms);
        }

        let hash = supported(&self.options.hashes, &commit.hash_alg);
        let cipher = supported(&self.options.ciphers, &commit.cipher_alg);
        let auth_tag = supported(&self.options.auth_tags, &commit.auth_tag_alg);
        let key_agreement = supported(&self.dh_key_agreements(), &commit.key_agreement_alg);
        let sas = supported(&self.options.sas_types, &commit.sas_alg);
        match (hash, cipher, auth_tag, key_agreement, sas) {
            (Some(hash), Some(cipher), Some(auth_tag), Some(key_agreement), Some(sas)) => {
                Some(NegotiatedAlgorithms {
                    hash,
                    cipher,
                    auth_tag,
                    key_agreement,
                    sas,
                })
            }
            _ => {
                let code = if hash.is_none() {
                    ErrorCode::UnsuppHashType
                } else if cipher.is_none() {
                    ErrorCode::UnsuppCipherType
                } else if auth_tag.is_none() {
                    ErrorCode::UnsuppSrtpAuthTag
                } else if key_agreement.is_none() {
                    ErrorCode::UnsuppPkExchange
                } else {
                    ErrorCode::UnsuppSasScheme
                };
                self.protocol_error(code);
                None
            }
        }
    }

    fn responder_commit(&mut self, commit: CommitPacket, raw: &[u8]) {
        if self.peer_zid() != Some(commit.zid) {
            log::warn!("Commit ZID {} does not match the peer Hello", to_hex(&commit.zid));
            self.protocol_error(ErrorCode::MalformedPacket);
            return;
        }
        if !self.check_peer_hello(&commit.hash_h2) {
            return;
        }
        let Some(algorithms) = self.committed_algorithms(&commit) else {
            return;
        };
        self.role = Some(Role::Responder);
        self.algorithms = Some(algorithms);
        self.own_commit = None;
        self.own_dh2 = None;
        self.callback.send_info(ZrtpStatus::Info(InfoCode::RespCommitReceived));
        self.warn_strength_mismatch();

        let multi_stream = commit.is_multi_stream();
        self.peer_commit = Some(Message {
            packet: commit,
            raw: raw.to_vec(),
        });

        if multi_stream {
            let total_hash = algorithms
                .hash
                .provider()
                .digest_parts(&[&self.own_hello[..], raw]);
            self.derive_multi_stream_keys(&total_hash);
            self.send_confirm1();
            return;
        }

        if self.dh.as_ref().map(|(ka, _)| *ka) != Some(algorithms.key_agreement)
            && !self.generate_keypair(algorithms.key_agreement)
        {
            return;
        }
        let dh1 = self.build_dh_part(DHPartPacket::MESSAGE_TYPE_DH1, Role::Responder);
        let dh1_raw = dh1.raw.clone();
        self.dh1 = Some(dh1);
        if !self.send_kept(dh1_raw) {
            return;
        }
        self.callback.send_info(ZrtpStatus::Info(InfoCode::Dh1DhGenerated));
        self.set_state(ZrtpState::WaitDHPart2);
    }

    // DHPart

    fn retained_secrets(&self) -> RetainedSecrets {
        let now = unix_now();
        match self.peer.as_ref().and_then(|p| p.record.as_ref()) {
            Some(record) => RetainedSecrets {
                rs1: record.rs1(now).copied(),
                rs2: record.rs2(now).copied(),
                pbx: record.mitm_key().copied(),
            },
            None => RetainedSecrets::default(),
        }
    }

    fn hash_provider(&self) -> Box<dyn Hash> {
        self.algorithms
            .map_or(HashAlgorithm::MANDATORY, |a| a.hash)
            .provider()
    }

    fn build_dh_part(&self, message_type: [u8; 8], role: Role) -> Message<DHPartPacket> {
        let secrets = self.retained_secrets();
        let hash = self.hash_provider();
        let id = |secret: Option<[u8; RS_LEN]>| match secret {
            Some(secret) => retained_secret_id(&*hash, &secret, role.label()),
            None => random_array(),
        };
        let mut packet = DHPartPacket {
            hash_h1: self.chain.h1,
            rs1_id: id(secrets.rs1),
            rs2_id: id(secrets.rs2),
            aux_secret_id: random_array(),
            pbx_secret_id: id(secrets.pbx),
            public_value: self.own_pv.clone(),
            mac: [0; MAC_LEN],
        };
        let mut raw = packet.to_bytes(message_type);
        packet.mac = implicit_mac(&self.chain.h0, mac_covered(&raw));
        set_trailing_mac(&mut raw, &packet.mac);
        Message { packet, raw }
    }

    fn shared_secret(&mut self, public_value: &[u8]) -> Option<Vec<u8>> {
        let expected = self.algorithms.map_or(0, |a| a.key_agreement.public_key_len());
        if public_value.len() != expected {
            log::warn!("peer public value has {} bytes, expected {expected}", public_value.len());
            self.callback.send_info(ZrtpStatus::Warning(WarningCode::DhShort));
            self.protocol_error(ErrorCode::DhErrorWrongPv);
            return None;
        }
        let Some((_, mut dh)) = self.dh.take() else {
            self.fail(SevereCode::ProtocolError);
            return None;
        };
        match dh.compute_shared_secret(public_value) {
            Ok(secret) => Some(secret),
            Err(e) => {
                log::warn!("rejecting peer public value: {e}");
                self.protocol_error(ErrorCode::DhErrorWrongPv);
                None
            }
        }
    }

    fn initiator_dh1(&mut self, dh1: DHPartPacket, raw: &[u8]) {
        if !self.check_peer_hello(&implicit_hash(&dh1.hash_h1)) {
            return;
        }
        self.cancel_timer();
        self.callback.send_info(ZrtpStatus::Info(InfoCode::InitDh1Received));

        let Some(dh_result) = self.shared_secret(&dh1.public_value) else {
            return;
        };
        let (Some(peer_hello), Some(commit), Some(dh2)) = (
            self.peer.as_ref().map(|p| p.raw.clone()),
            self.own_commit.as_ref().map(|c| c.raw.clone()),
            self.own_dh2.clone(),
        ) else {
            self.fail(SevereCode::ProtocolError);
            return;
        };
        let total_hash = self
            .hash_provider()
            .digest_parts(&[&peer_hello[..], &commit[..], raw, &dh2[..]]);
        self.derive_dh_keys(&dh_result, &dh1, &total_hash);
        self.dh1 = Some(Message {
            packet: dh1,
            raw: raw.to_vec(),
        });

        if !self.send_kept(dh2) {
            return;
        }
        self.set_state(ZrtpState::WaitConfirm1);
        self.start_timer(self.options.t2);
    }

    fn responder_dh2(&mut self, dh2: DHPartPacket, raw: &[u8]) {
        if !self.check_peer_commit(&dh2.hash_h1) {
            return;
        }
        let (Some(commit), Some(algorithms), Some(dh1)) = (
            self.peer_commit.as_ref(),
            self.algorithms,
            self.dh1.as_ref(),
        ) else {
            self.fail(SevereCode::ProtocolError);
            return;
        };
        let CommitMode::DiffieHellman { hvi } = commit.packet.mode else {
            self.fail(SevereCode::ProtocolError);
            return;
        };
        let commit_raw = commit.raw.clone();
        let dh1_raw = dh1.raw.clone();
        if !constant_time_eq(&algorithms.hash_256(&[raw, &self.own_hello[..]]), &hvi) {
            self.protocol_error(ErrorCode::DhErrorWrongHvi);
            return;
        }
        self.callback.send_info(ZrtpStatus::Info(InfoCode::RespDh2Received));

        let Some(dh_result) = self.shared_secret(&dh2.public_value) else {
            return;
        };
        let total_hash = algorithms
            .hash
            .provider()
            .digest_parts(&[&self.own_hello[..], &commit_raw[..], &dh1_raw[..], raw]);
        self.derive_dh_keys(&dh_result, &dh2, &total_hash);
        self.dh2 = Some(Message {
            packet: dh2,
            raw: raw.to_vec(),
        });
        self.send_confirm1();
    }

    // Key derivation

    /// (ZIDi, ZIDr) for the current role.
    fn zids(&self) -> Option<(Zid, Zid)> {
        let peer = self.peer_zid()?;
        match self.role? {
            Role::Initiator => Some((self.own_zid, peer)),
            Role::Responder => Some((peer, self.own_zid)),
        }
    }

    /// Finds s1 and s3 by comparing the peer's secret IDs with ours.
    fn match_secrets(&self, peer_dh: &DHPartPacket, peer_role: Role) -> (Option<[u8; RS_LEN]>, Option<[u8; RS_LEN]>) {
        let secrets = self.retained_secrets();
        let hash = self.hash_provider();
        let matches = |secret: &[u8; RS_LEN], ids: &[[u8; 8]]| {
            let id = retained_secret_id(&*hash, secret, peer_role.label());
            ids.iter().any(|peer_id| constant_time_eq(peer_id, &id))
        };
        let peer_ids = [peer_dh.rs1_id, peer_dh.rs2_id];
        let s1 = [secrets.rs1, secrets.rs2]
            .into_iter()
            .flatten()
            .find(|secret| matches(secret, &peer_ids));
        let s3 = secrets.pbx.filter(|key| matches(key, &[peer_dh.pbx_secret_id]));
        (s1, s3)
    }

    fn report_secret_match(&mut self, matched: bool) {
        let record = self.peer.as_ref().and_then(|p| p.record.as_ref());
        let had_secret = record.map_or(false, |r| r.has_any_secret());
        self.sas_verified = matched && record.map_or(false, |r| r.is_sas_verified());
        if matched {
            self.callback.send_info(ZrtpStatus::Info(InfoCode::RsMatchFound));
            return;
        }
        if !had_secret {
            self.callback.send_info(ZrtpStatus::Warning(WarningCode::NoRsMatch));
            return;
        }
        log::warn!("cached secrets for this peer do not match, SAS must be verified");
        self.callback.send_info(ZrtpStatus::Warning(WarningCode::NoExpectedRsMatch));
        if let Some(peer_zid) = self.peer_zid() {
            match self.cache.update_record(&peer_zid, &mut |r| r.reset_sas_verified()) {
                Ok(record) => {
                    if let Some(peer) = self.peer.as_mut() {
                        peer.record = Some(record);
                    }
                }
                Err(e) => log::error!("cannot reset SAS verified flag: {e}"),
            }
        }
    }

    fn derive_dh_keys(&mut self, dh_result: &[u8], peer_dh: &DHPartPacket, total_hash: &[u8]) {
        let (Some(role), Some((zid_i, zid_r)), Some(algorithms)) = (self.role, self.zids(), self.algorithms) else {
            return;
        };
        let (s1, s3) = self.match_secrets(peer_dh, role.peer());
        self.report_secret_match(s1.is_some());

        let hash = algorithms.hash.provider();
        let s0 = derive_s0(
            &*hash,
            dh_result,
            &zid_i,
            &zid_r,
            total_hash,
            s1.as_ref().map(|s| &s[..]),
            None,
            s3.as_ref().map(|s| &s[..]),
        );
        let context = kdf_context(&zid_i, &zid_r, total_hash);
        let keys = derive_session_keys(&*hash, &s0, &context, algorithms.cipher.key_len());
        self.sas = Some(algorithms.sas.render(&keys.sas_hash));
        self.keys = Some(keys);
    }

    fn derive_multi_stream_keys(&mut self, total_hash: &[u8]) {
        let (Some((zid_i, zid_r)), Some(params)) = (self.zids(), self.multi_stream.as_ref()) else {
            return;
        };
        let hash = params.algorithms.hash.provider();
        let context = kdf_context(&zid_i, &zid_r, total_hash);
        let s0 = derive_multi_stream_s0(&*hash, &params.zrtp_session, &context);
        let keys = derive_session_keys(&*hash, &s0, &context, params.algorithms.cipher.key_len());
        self.sas = Some(String::new());
        self.keys = Some(keys);
    }

    // Confirm

    /// HMAC key and ZRTP key of the given role.
    fn confirm_keys(&self, role: Role) -> Option<(Vec<u8>, Vec<u8>)> {
        let keys = self.keys.as_ref()?;
        Some(match role {
            Role::Initiator => (keys.hmac_key_i.clone(), keys.zrtp_key_i.clone()),
            Role::Responder => (keys.hmac_key_r.clone(), keys.zrtp_key_r.clone()),
        })
    }

    fn build_confirm(&self, message_type: [u8; 8]) -> Option<Vec<u8>> {
        let role = self.role?;
        let algorithms = self.algorithms?;
        let (hmac_key, zrtp_key) = self.confirm_keys(role)?;
        let multi_stream = self.is_multi_stream();
        let signature = match (&self.keys, multi_stream) {
            (Some(keys), false) => self.callback.sign_sas(&keys.sas_hash).unwrap_or_default(),
            _ => Vec::new(),
        };
        let body = ConfirmBody {
            hash_h0: self.chain.h0,
            enrollment: self.options.mitm_mode && self.options.enrollment && !multi_stream,
            sas_verified: self.sas_verified,
            allow_clear: self.options.allow_clear,
            disclosure: false,
            cache_expiry: self.options.cache_expiry,
            signature,
        };
        let iv = random_array::<16>();
        let encrypted = match algorithms.cipher.provider().encrypt(&zrtp_key, &iv, &body.to_bytes()) {
            Ok(encrypted) => encrypted,
            Err(e) => {
                log::error!("cannot encrypt Confirm: {e}");
                return None;
            }
        };
        let confirm_mac = truncated_mac(&algorithms.hash.provider().hmac(&hmac_key, &encrypted));
        Some(ConfirmPacket { confirm_mac, iv, encrypted }.to_bytes(message_type))
    }

    fn send_confirm1(&mut self) {
        let Some(confirm1) = self.build_confirm(ConfirmPacket::MESSAGE_TYPE_CONF1) else {
            self.protocol_error(ErrorCode::CriticalSwError);
            return;
        };
        if !self.activate(EnableSecurity::ForReceiver) {
            return;
        }
        if self.send_kept(confirm1) {
            self.set_state(ZrtpState::WaitConfirm2);
        }
    }

    /// Authenticates and decrypts a Confirm sent by the peer.
    fn open_confirm(&mut self, confirm: &ConfirmPacket) -> Option<ConfirmBody> {
        let peer_role = self.role?.peer();
        let algorithms = self.algorithms?;
        let (hmac_key, zrtp_key) = self.confirm_keys(peer_role)?;

        let mac = algorithms.hash.provider().hmac(&hmac_key, &confirm.encrypted);
        if !constant_time_eq(&mac[..MAC_LEN], &confirm.confirm_mac) {
            self.protocol_error(ErrorCode::ConfirmHmacWrong);
            return None;
        }
        let plain = match algorithms
            .cipher
            .provider()
            .decrypt(&zrtp_key, &confirm.iv, &confirm.encrypted)
        {
            Ok(plain) => plain,
            Err(e) => {
                log::error!("cannot decrypt Confirm: {e}");
                self.protocol_error(ErrorCode::CriticalSwError);
                return None;
            }
        };
        match ConfirmBody::parse(&plain) {
            Ok(body) => Some(body),
            Err(e) => {
                log::warn!("malformed Confirm body: {e}");
                self.protocol_error(ErrorCode::MalformedPacket);
                None
            }
        }
    }

    /// Checks the peer Hello once its H2 is known.
    fn check_peer_hello(&mut self, h2: &[u8; 32]) -> bool {
        let authentic = self.peer.as_ref().map_or(false, |p| {
            implicit_hash(h2) == p.packet.hash_h3
                && constant_time_eq(&implicit_mac(h2, mac_covered(&p.raw)), &p.packet.mac)
        });
        if !authentic {
            self.fail(SevereCode::HelloHmacFailed);
        }
        authentic
    }

    /// Checks the peer Commit once its H1 is known.
    fn check_peer_commit(&mut self, h1: &[u8; 32]) -> bool {
        let authentic = self.peer_commit.as_ref().map_or(false, |c| {
            implicit_hash(h1) == c.packet.hash_h2
                && constant_time_eq(&implicit_mac(h1, mac_covered(&c.raw)), &c.packet.mac)
        });
        if !authentic {
            self.fail(SevereCode::CommitHmacFailed);
        }
        authentic
    }

    /// Checks the peer DHPart once its H0 is known.
    fn check_peer_dh_part(&mut self, h0: &[u8; 32]) -> bool {
        let (message, code) = match self.role {
            Some(Role::Initiator) => (self.dh1.as_ref(), SevereCode::Dh1HmacFailed),
            _ => (self.dh2.as_ref(), SevereCode::Dh2HmacFailed),
        };
        let authentic = message.map_or(false, |m| {
            implicit_hash(h0) == m.packet.hash_h1
                && constant_time_eq(&implicit_mac(h0, mac_covered(&m.raw)), &m.packet.mac)
        });
        if !authentic {
            self.fail(code);
        }
        authentic
    }

    fn accept_peer_confirm(&mut self, body: ConfirmBody) {
        let sas_hash = self.keys.as_ref().map(|k| k.sas_hash.clone()).unwrap_or_default();
        if !body.signature.is_empty() && !self.callback.check_sas_signature(&sas_hash, &body.signature) {
            log::warn!("peer SAS signature does not verify");
            self.sas_verified = false;
        }
        if !body.sas_verified {
            self.sas_verified = false;
        }
        if body.enrollment && !self.options.mitm_mode && self.options.enrollment && !self.is_multi_stream() {
            log::info!("peer offers trusted MiTM enrollment");
            self.pending_enrollment = self.keys.as_ref().map(|k| k.trusted_mitm_key.clone());
            self.callback.ask_enrollment(EnrollmentCode::Request);
        }
        self.peer_confirm = Some(body);
    }

    /// Shifts rs1 to rs2 and stores the new retained secret.
    fn save_retained_secret(&mut self) {
        if self.is_multi_stream() {
            return;
        }
        let (Some(peer_zid), Some(keys), Some(peer_confirm)) =
            (self.peer_zid(), self.keys.as_ref(), self.peer_confirm.as_ref())
        else {
            return;
        };
        let expiry = self.options.cache_expiry.min(peer_confirm.cache_expiry);
        let new_rs1 = keys.new_rs1.clone();
        let now = unix_now();
        let result = self.cache.update_record(&peer_zid, &mut |r| {
            r.set_new_rs1(&new_rs1, expiry, now);
            r.last_use = now;
        });
        if let Err(e) = result {
            log::error!("cannot store retained secret: {e}");
        }
    }

    fn initiator_confirm1(&mut self, confirm: ConfirmPacket) {
        let multi_stream = self.is_multi_stream();
        if multi_stream && self.keys.is_none() {
            let (Some(peer_hello), Some(commit)) = (
                self.peer.as_ref().map(|p| p.raw.clone()),
                self.own_commit.as_ref().map(|c| c.raw.clone()),
            ) else {
                self.fail(SevereCode::ProtocolError);
                return;
            };
            let total_hash = self.hash_provider().digest_parts(&[&peer_hello[..], &commit[..]]);
            self.derive_multi_stream_keys(&total_hash);
        }
        let Some(body) = self.open_confirm(&confirm) else {
            return;
        };
        let authentic = if multi_stream {
            let h1 = implicit_hash(&body.hash_h0);
            self.check_peer_hello(&implicit_hash(&h1))
        } else {
            self.check_peer_dh_part(&body.hash_h0)
        };
        if !authentic {
            return;
        }
        self.cancel_timer();
        self.callback.send_info(ZrtpStatus::Info(InfoCode::InitConf1Received));
        self.accept_peer_confirm(body);
        if !self.activate(EnableSecurity::ForReceiver) {
            return;
        }
        self.save_retained_secret();

        let Some(confirm2) = self.build_confirm(ConfirmPacket::MESSAGE_TYPE_CONF2) else {
            self.protocol_error(ErrorCode::CriticalSwError);
            return;
        };
        if !self.send_kept(confirm2) {
            return;
        }
        self.set_state(ZrtpState::WaitConfAck);
        self.start_timer(self.options.t2);
    }

    fn responder_confirm2(&mut self, confirm: ConfirmPacket) {
        let Some(body) = self.open_confirm(&confirm) else {
            return;
        };
        let authentic = if self.is_multi_stream() {
            self.check_peer_commit(&implicit_hash(&body.hash_h0))
        } else {
            self.check_peer_dh_part(&body.hash_h0)
        };
        if !authentic {
            return;
        }
        self.callback.send_info(ZrtpStatus::Info(InfoCode::RespConf2Received));
        self.accept_peer_confirm(body);
        self.save_retained_secret();
        if !self.activate(EnableSecurity::ForSender) {
            return;
        }
        if self.send_ack(AckKind::Conf2Ack) {
            self.enter_secure();
        }
    }

    fn initiator_secure(&mut self) {
        if self.activate(EnableSecurity::ForSender) {
            self.enter_secure();
        }
    }

    fn enter_secure(&mut self) {
        self.cancel_timer();
        self.sent = None;
        self.set_state(ZrtpState::Secure);
        self.callback.send_info(ZrtpStatus::Info(InfoCode::SecureStateOn));

        if self.options.mitm_mode && self.options.enrollment && !self.is_multi_stream() {
            self.store_trusted_mitm_key();
        }
        let cipher = self.cipher_info().unwrap_or_default();
        let sas = self.sas.clone().unwrap_or_default();
        log::info!("ZRTP secure: {cipher}, SAS '{sas}', verified {}", self.sas_verified);
        self.callback.srtp_secrets_on(&cipher, &sas, self.sas_verified);
    }

    /// A PBX remembers the key it offered for enrollment.
    fn store_trusted_mitm_key(&mut self) {
        let (Some(peer_zid), Some(keys)) = (self.peer_zid(), self.keys.as_ref()) else {
            return;
        };
        let key = keys.trusted_mitm_key.clone();
        if let Err(e) = self.cache.update_record(&peer_zid, &mut |r| r.set_mitm_key(&key)) {
            log::error!("cannot store trusted MiTM key: {e}");
        }
    }

    // SRTP secrets

    fn srtp_secrets(&self) -> Option<SrtpSecrets> {
        let keys = self.keys.as_ref()?;
        let algorithms = self.algorithms?;
        Some(SrtpSecrets {
            cipher: algorithms.cipher,
            auth_tag: algorithms.auth_tag,
            role: self.role?,
            key_initiator: keys.srtp_key_i.clone(),
            salt_initiator: keys.srtp_salt_i.clone(),
            key_responder: keys.srtp_key_r.clone(),
            salt_responder: keys.srtp_salt_r.clone(),
        })
    }

    fn activate(&mut self, part: EnableSecurity) -> bool {
        let Some(secrets) = self.srtp_secrets() else {
            self.fail(SevereCode::ProtocolError);
            return false;
        };
        if !self.callback.srtp_secrets_ready(&secrets, part) {
            log::error!("host refused SRTP secrets for {part:?}");
            self.protocol_error(ErrorCode::CriticalSwError);
            return false;
        }
        match part {
            EnableSecurity::ForSender => self.sender_active = true,
            EnableSecurity::ForReceiver => self.receiver_active = true,
        }
        true
    }

    fn secrets_off(&mut self) {
        if self.sender_active {
            self.sender_active = false;
            self.callback.srtp_secrets_off(EnableSecurity::ForSender);
        }
        if self.receiver_active {
            self.receiver_active = false;
            self.callback.srtp_secrets_off(EnableSecurity::ForReceiver);
        }
    }

    // GoClear, SASrelay, Ping

    fn peer_allows_clear(&self) -> bool {
        self.peer_confirm.as_ref().map_or(false, |c| c.allow_clear)
    }

    fn clear_mac(&self, role: Role) -> Option<[u8; MAC_LEN]> {
        let (hmac_key, _) = self.confirm_keys(role)?;
        let mac = self
            .algorithms?
            .hash
            .provider()
            .hmac(&hmac_key, &GoClearPacket::MESSAGE_TYPE);
        Some(truncated_mac(&mac))
    }

    fn peer_go_clear(&mut self, go_clear: GoClearPacket) {
        let Some(expected) = self.role.and_then(|role| self.clear_mac(role.peer())) else {
            return;
        };
        if !constant_time_eq(&expected, &go_clear.clear_hmac) {
            log::warn!("dropping GoClear with bad clear_hmac");
            return;
        }
        self.callback.send_info(ZrtpStatus::Warning(WarningCode::GoClearReceived));
        if !(self.options.allow_clear && self.peer_allows_clear()) {
            log::warn!("GoClear received but clear mode is not allowed");
            let refusal = ErrorPacket {
                error_code: ErrorCode::GoClearNotAllowed.code(),
            };
            self.send(&refusal.to_bytes());
            return;
        }
        self.secrets_off();
        if !self.send_ack(AckKind::ClearAck) {
            return;
        }
        self.set_state(ZrtpState::Idle);
        self.callback.send_info(ZrtpStatus::Info(InfoCode::SecureStateOff));
        self.callback.handle_go_clear();
    }

    fn clear_acknowledged(&mut self) {
        self.cancel_timer();
        self.sent = None;
        self.secrets_off();
        self.set_state(ZrtpState::Idle);
        self.callback.send_info(ZrtpStatus::Info(InfoCode::SecureStateOff));
    }

    /// The peer refused our GoClear: protect outgoing media again.
    fn go_clear_refused(&mut self) {
        log::warn!("peer refused GoClear");
        self.cancel_timer();
        self.sent = None;
        if !self.send_ack(AckKind::ErrorAck) {
            return;
        }
        if self.activate(EnableSecurity::ForSender) {
            self.set_state(ZrtpState::Secure);
        }
    }

    fn peer_sas_relay(&mut self, relay: SasRelayPacket) {
        let (Some(role), Some(algorithms)) = (self.role, self.algorithms) else {
            return;
        };
        let Some((hmac_key, zrtp_key)) = self.confirm_keys(role.peer()) else {
            return;
        };
        let mac = algorithms.hash.provider().hmac(&hmac_key, &relay.encrypted);
        if !constant_time_eq(&mac[..MAC_LEN], &relay.mac) {
            log::warn!("dropping SASrelay with bad MAC");
            return;
        }
        let body = algorithms
            .cipher
            .provider()
            .decrypt(&zrtp_key, &relay.iv, &relay.encrypted)
            .ok()
            .and_then(|plain| SasRelayBody::parse(&plain).ok());
        let Some(body) = body else {
            log::warn!("dropping undecodable SASrelay");
            return;
        };
        if !self.send_ack(AckKind::RelayAck) {
            return;
        }

        let trusted = self.peer.as_ref().map_or(false, |p| {
            p.packet.mitm && p.record.as_ref().and_then(|r| r.mitm_key()).is_some()
        });
        if !trusted {
            log::warn!("ignoring SAS relayed by an untrusted MiTM");
            return;
        }
        let sas_type = SasType::from_id(&body.sas_type).unwrap_or(algorithms.sas);
        let sas = sas_type.render(&body.trusted_sas_hash);
        log::info!("trusted MiTM relayed SAS '{sas}'");
        self.sas = Some(sas.clone());
        self.sas_verified = false;
        let cipher = self.cipher_info().unwrap_or_default();
        self.callback.srtp_secrets_on(&cipher, &sas, false);
    }

    fn answer_ping(&mut self, ping: PingPacket) {
        let ack = PingAckPacket {
            version: ZRTP_VERSION,
            endpoint_hash: self.endpoint_hash(),
            received_endpoint_hash: ping.endpoint_hash,
            ssrc: self.local_ssrc,
        };
        if !self.callback.send_data(&ack.to_bytes()) {
            log::warn!("cannot send PingACK");
        }
    }

    // Errors and timers

    fn peer_error(&mut self, code: u32) {
        let error = ErrorCode::from_code(code).unwrap_or(ErrorCode::CriticalSwError);
        log::warn!("peer reported ZRTP error {code:#x}: {error}");
        self.cancel_timer();
        self.sent = None;
        self.secrets_off();
        if !self.send_ack(AckKind::ErrorAck) {
            return;
        }
        self.set_state(ZrtpState::Error);
        self.callback.negotiation_failed(ZrtpStatus::ZrtpError(error));
    }

    /// Tells the peer about a protocol error and waits for its ErrorAck.
    fn protocol_error(&mut self, code: ErrorCode) {
        log::error!("ZRTP protocol error in {:?}: {code}", self.state);
        self.cancel_timer();
        self.secrets_off();
        self.callback.negotiation_failed(ZrtpStatus::ZrtpError(code));
        let message = ErrorPacket { error_code: code.code() }.to_bytes();
        if self.send_kept(message) {
            self.set_state(ZrtpState::WaitErrorAck);
            self.start_timer(self.options.t2);
        }
    }

    /// Aborts the negotiation without telling the peer.
    fn fail(&mut self, code: SevereCode) {
        log::error!("ZRTP negotiation failed in {:?}: {code}", self.state);
        self.cancel_timer();
        self.sent = None;
        self.secrets_off();
        self.set_state(ZrtpState::Error);
        self.callback.negotiation_failed(ZrtpStatus::Severe(code));
    }

    fn retries_exhausted(&mut self) {
        match self.state {
            ZrtpState::Detect => {
                log::warn!("no answer to Hello, peer does not support ZRTP");
                self.set_state(ZrtpState::Idle);
                self.callback.not_supported_by_other();
            }
            ZrtpState::AckSent => {
                // The peer sent Hello, so it speaks ZRTP even if its HelloAck got lost.
                self.commit_or_wait();
            }
            ZrtpState::WaitErrorAck => {
                self.sent = None;
                self.set_state(ZrtpState::Error);
            }
            ZrtpState::Secure => {
                log::warn!("SASrelay not acknowledged");
                self.relay_pending = false;
                self.sent = None;
            }
            _ => self.fail(SevereCode::TooMuchRetries),
        }
    }

    fn start_timer(&mut self, schedule: TimerSchedule) -> bool {
        let ms = self.timer.start(schedule);
        if self.callback.activate_timer(ms) {
            return true;
        }
        self.timer.cancel();
        self.fail(SevereCode::NoTimer);
        false
    }

    fn cancel_timer(&mut self) {
        if self.timer.is_armed() {
            self.timer.cancel();
            self.callback.cancel_timer();
        }
    }

    fn set_state(&mut self, next: ZrtpState) {
        if self.state != next {
            log::debug!("{:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    // Sending

    /// Hands one message to the host; a refused send aborts the session.
    fn send(&mut self, message: &[u8]) -> bool {
        log::trace!("sending {}", message_name(message));
        if self.callback.send_data(message) {
            return true;
        }
        self.fail(SevereCode::CannotSend);
        false
    }

    fn send_ack(&mut self, kind: AckKind) -> bool {
        self.send(&kind.to_bytes())
    }

    /// Sends a message and keeps it for retransmission.
    fn send_kept(&mut self, message: Vec<u8>) -> bool {
        if !self.send(&message) {
            return false;
        }
        self.sent = Some(message);
        true
    }

    fn resend(&mut self) {
        if let Some(message) = self.sent.clone() {
            log::debug!("peer repeated itself, resending {}", message_name(&message));
            self.send(&message);
        }
    }
}

impl std::fmt::Debug for ZrtpEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZrtpEngine")
            .field("state", &self.state)
            .field("role", &self.role)
            .field("own_zid", &to_hex(&self.own_zid))
            .field("algorithms", &self.algorithms)
            .finish_non_exhaustive()
    }
}
