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

mod common;

use common::{handshake, passive, Dir, Peer};
use zrtp_core::{EnableSecurity, InfoCode, Role, WarningCode, ZrtpOptions, ZrtpState, ZrtpStatus};
use zrtp_proto::{PingAckPacket, PingPacket};

fn names(transcript: &[(Dir, String)], dir: Dir) -> Vec<&str> {
    transcript
        .iter()
        .filter(|(d, _)| *d == dir)
        .map(|(_, n)| n.as_str())
        .collect()
}

#[test]
fn test_full_zrtp_handshake() {
    common::init_logging();
    let mut alice = Peer::with_zid(0x11, ZrtpOptions::default());
    let mut bob = Peer::with_zid(0x22, passive());

    let transcript = handshake(&mut alice, &mut bob);

    assert_eq!(
        names(&transcript, Dir::AtoB),
        ["Hello", "HelloACK", "Commit", "DHPart2", "Confirm2"]
    );
    assert_eq!(
        names(&transcript, Dir::BtoA),
        ["Hello", "HelloACK", "DHPart1", "Confirm1", "Conf2ACK"]
    );

    assert_eq!(alice.engine.state(), ZrtpState::Secure);
    assert_eq!(bob.engine.state(), ZrtpState::Secure);
    assert_eq!(alice.engine.role(), Some(Role::Initiator));
    assert_eq!(bob.engine.role(), Some(Role::Responder));
    assert_eq!(alice.timer(), None);
    assert_eq!(bob.timer(), None);

    // Both ends render the same SAS and report the same algorithms.
    let sas = alice.engine.sas().unwrap().to_string();
    assert_eq!(sas.len(), 4);
    assert_eq!(bob.engine.sas(), Some(sas.as_str()));
    assert_eq!(alice.engine.cipher_info(), bob.engine.cipher_info());
    assert_eq!(alice.engine.exported_key(), bob.engine.exported_key());
    assert!(!alice.engine.is_sas_verified());

    let cipher = alice.engine.cipher_info().unwrap();
    assert_eq!(alice.secure_on(), vec![(cipher.clone(), sas.clone(), false)]);
    assert_eq!(bob.secure_on(), vec![(cipher, sas, false)]);

    assert_eq!(alice.engine.peer_zid(), Some([0x22; 12]));
    assert_eq!(
        bob.engine.peer_client_id().as_deref(),
        Some(alice.engine.options().client_id.as_str())
    );
}

#[test]
fn test_srtp_secrets_mirror_each_other() {
    let mut alice = Peer::with_zid(0x11, ZrtpOptions::default());
    let mut bob = Peer::with_zid(0x22, passive());
    handshake(&mut alice, &mut bob);

    let a = alice.recorder.inner.lock().secrets_ready.clone();
    let b = bob.recorder.inner.lock().secrets_ready.clone();

    // Receiver is keyed before the sender on both sides.
    let parts = |v: &[(EnableSecurity, _)]| v.iter().map(|(p, _)| *p).collect::<Vec<_>>();
    assert_eq!(parts(&a), [EnableSecurity::ForReceiver, EnableSecurity::ForSender]);
    assert_eq!(parts(&b), [EnableSecurity::ForReceiver, EnableSecurity::ForSender]);

    let (_, a) = &a[1];
    let (_, b) = &b[1];
    assert_eq!(a.role, Role::Initiator);
    assert_eq!(b.role, Role::Responder);
    assert_eq!(a.sender_key(), b.receiver_key());
    assert_eq!(a.receiver_key(), b.sender_key());
    assert_ne!(a.sender_key(), a.receiver_key());
    assert_eq!(a.key_initiator.len(), a.cipher.key_len());
    assert_eq!(a.salt_initiator.len(), 14);
}

#[test]
fn test_progress_reported() {
    let mut alice = Peer::with_zid(0x11, ZrtpOptions::default());
    let mut bob = Peer::with_zid(0x22, passive());
    handshake(&mut alice, &mut bob);

    for code in [
        InfoCode::HelloReceived,
        InfoCode::CommitDhGenerated,
        InfoCode::InitDh1Received,
        InfoCode::InitConf1Received,
        InfoCode::SecureStateOn,
    ] {
        assert!(alice.has_status(ZrtpStatus::Info(code)), "{code:?}");
    }
    for code in [
        InfoCode::HelloReceived,
        InfoCode::RespCommitReceived,
        InfoCode::Dh1DhGenerated,
        InfoCode::RespDh2Received,
        InfoCode::RespConf2Received,
        InfoCode::SecureStateOn,
    ] {
        assert!(bob.has_status(ZrtpStatus::Info(code)), "{code:?}");
    }
    // First contact: nothing cached yet.
    assert!(alice.has_status(ZrtpStatus::Warning(WarningCode::NoRsMatch)));
    assert!(bob.has_status(ZrtpStatus::Warning(WarningCode::NoRsMatch)));
    assert!(alice.failures().is_empty());
}

#[test]
fn test_symmetric_start_resolves_commit_contention() {
    let mut alice = Peer::with_zid(0x11, ZrtpOptions::default());
    let mut bob = Peer::with_zid(0x22, ZrtpOptions::default());

    let transcript = handshake(&mut alice, &mut bob);

    assert!(alice.engine.is_secure());
    assert!(bob.engine.is_secure());
    assert_ne!(alice.engine.role(), bob.engine.role());
    assert_eq!(alice.engine.sas(), bob.engine.sas());
    // Both sent a Commit, only one DHPart1 follows.
    let commits = transcript.iter().filter(|(_, n)| n == "Commit").count();
    let dh1 = transcript.iter().filter(|(_, n)| n == "DHPart1").count();
    assert_eq!(commits, 2);
    assert_eq!(dh1, 1);
}

#[test]
fn test_strongest_common_algorithms_chosen() {
    use zrtp_crypto::{CipherAlgorithm, HashAlgorithm, SasType};

    let strong = ZrtpOptions {
        hashes: vec![HashAlgorithm::S384, HashAlgorithm::S256],
        ciphers: vec![CipherAlgorithm::Aes3, CipherAlgorithm::Aes1],
        sas_types: vec![SasType::B256],
        ..ZrtpOptions::default()
    };
    let mut alice = Peer::with_zid(0x11, strong);
    let mut bob = Peer::with_zid(0x22, passive());
    handshake(&mut alice, &mut bob);

    let algorithms = alice.engine.algorithms().unwrap();
    assert_eq!(algorithms.hash, HashAlgorithm::S384);
    assert_eq!(algorithms.cipher, CipherAlgorithm::Aes3);
    assert_eq!(algorithms.sas, SasType::B256);
    assert_eq!(bob.engine.algorithms(), Some(algorithms));
    // Two PGP words.
    assert_eq!(alice.engine.sas().unwrap().split(' ').count(), 2);
    assert!(alice.has_status(ZrtpStatus::Warning(WarningCode::DhAesMismatch)));
}

#[test]
fn test_ping_answered_in_any_state() {
    let mut alice = Peer::with_zid(0x11, ZrtpOptions::default());
    alice.engine.set_local_ssrc(0xcafe_f00d);

    let ping = PingPacket {
        version: *b"1.10",
        endpoint_hash: [5; 8],
    };
    alice.engine.process_message(&ping.to_bytes());

    let out = alice.take_outbox();
    assert_eq!(out.len(), 1);
    let ack = PingAckPacket::parse(&out[0]).unwrap();
    assert_eq!(ack.received_endpoint_hash, [5; 8]);
    assert_eq!(ack.endpoint_hash, alice.engine.endpoint_hash());
    assert_eq!(ack.ssrc, 0xcafe_f00d);
    assert_eq!(alice.engine.state(), ZrtpState::Idle);
}

#[test]
fn test_garbage_and_stray_messages_ignored() {
    let mut alice = Peer::with_zid(0x11, ZrtpOptions::default());
    let mut bob = Peer::with_zid(0x22, passive());

    alice.engine.process_message(&[0x50, 0x5a, 0, 3, 1, 2, 3]);
    assert!(alice.take_outbox().is_empty());

    alice.engine.start();
    let hello = alice.take_outbox();
    // A second start while negotiating does nothing.
    alice.engine.start();
    assert!(alice.take_outbox().is_empty());

    // Bob is idle: Alice's Hello goes unanswered.
    bob.engine.process_message(&hello[0]);
    assert!(bob.take_outbox().is_empty());
    assert_eq!(bob.engine.state(), ZrtpState::Idle);
}

#[test]
fn test_stop_turns_secrets_off() {
    let mut alice = Peer::with_zid(0x11, ZrtpOptions::default());
    let mut bob = Peer::with_zid(0x22, passive());
    handshake(&mut alice, &mut bob);

    alice.engine.stop();
    assert_eq!(alice.engine.state(), ZrtpState::Idle);
    let off = alice.recorder.inner.lock().secrets_off.clone();
    assert_eq!(off.len(), 2);
    assert!(off.contains(&EnableSecurity::ForSender));
    assert!(off.contains(&EnableSecurity::ForReceiver));
}
