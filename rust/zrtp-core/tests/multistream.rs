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
use zrtp_core::{ErrorCode, ZrtpError, ZrtpOptions, ZrtpState, ZrtpStatus};
use zrtp_crypto::KeyAgreement;

/// A secure master session plus the parameter blob each side exported.
fn master() -> (Peer, Peer, Vec<u8>, Vec<u8>) {
    let mut alice = Peer::with_zid(0x11, ZrtpOptions::default());
    let mut bob = Peer::with_zid(0x22, passive());
    handshake(&mut alice, &mut bob);
    let blob_a = alice.engine.multi_stream_params().unwrap();
    let blob_b = bob.engine.multi_stream_params().unwrap();
    (alice, bob, blob_a, blob_b)
}

#[test]
fn test_multi_stream_session() {
    let (mut alice, bob, blob_a, blob_b) = master();
    // Exported once only.
    assert!(alice.engine.multi_stream_params().is_none());

    let mut alice2 = Peer::new(ZrtpOptions::default(), alice.cache.clone());
    let mut bob2 = Peer::new(passive(), bob.cache.clone());
    alice2.engine.set_multi_stream_params(&blob_a).unwrap();
    bob2.engine.set_multi_stream_params(&blob_b).unwrap();
    assert!(alice2.engine.is_multi_stream());

    let transcript = handshake(&mut alice2, &mut bob2);
    let sent: Vec<(Dir, &str)> = transcript.iter().map(|(d, n)| (*d, n.as_str())).collect();
    assert_eq!(
        sent.iter().filter(|(d, _)| *d == Dir::AtoB).map(|(_, n)| *n).collect::<Vec<_>>(),
        ["Hello", "HelloACK", "Commit", "Confirm2"]
    );
    assert_eq!(
        sent.iter().filter(|(d, _)| *d == Dir::BtoA).map(|(_, n)| *n).collect::<Vec<_>>(),
        ["Hello", "HelloACK", "Confirm1", "Conf2ACK"]
    );

    assert!(alice2.engine.is_secure());
    assert!(bob2.engine.is_secure());
    assert!(alice2.engine.multi_stream_available());
    assert_eq!(alice2.engine.algorithms().unwrap().key_agreement, KeyAgreement::Mult);
    assert_eq!(
        alice2.engine.algorithms().unwrap().cipher,
        alice.engine.algorithms().unwrap().cipher
    );
    // No SAS of its own; fresh keys nonetheless.
    assert_eq!(alice2.engine.sas(), Some(""));
    assert_eq!(alice2.secure_on()[0].1, "");
    assert_eq!(alice2.engine.exported_key(), bob2.engine.exported_key());
    assert_ne!(alice2.engine.exported_key(), alice.engine.exported_key());

    let a = alice2.recorder.inner.lock().secrets_ready.clone();
    let b = bob2.recorder.inner.lock().secrets_ready.clone();
    assert_eq!(a[1].1.sender_key(), b[1].1.receiver_key());

    // A slave never exports, and the master never imports.
    assert!(alice2.engine.multi_stream_params().is_none());
    assert!(matches!(
        alice.engine.set_multi_stream_params(&blob_a),
        Err(ZrtpError::IsMaster)
    ));

    // Retained secrets are untouched by multi-stream sessions.
    let record = alice.cache.get_record(&[0x22; 12]).unwrap().unwrap();
    assert!(record.rs2(zrtp_cache::unix_now()).is_none());
}

#[test]
fn test_one_blob_serves_several_streams() {
    let (alice, bob, blob_a, blob_b) = master();
    for _ in 0..2 {
        let mut alice2 = Peer::new(ZrtpOptions::default(), alice.cache.clone());
        let mut bob2 = Peer::new(passive(), bob.cache.clone());
        alice2.engine.set_multi_stream_params(&blob_a).unwrap();
        bob2.engine.set_multi_stream_params(&blob_b).unwrap();
        handshake(&mut alice2, &mut bob2);
        assert!(alice2.engine.is_secure() && bob2.engine.is_secure());
    }
}

#[test]
fn test_multi_stream_parameter_misuse() {
    let (_alice, _bob, blob_a, _) = master();

    let mut fresh = Peer::with_zid(0x33, ZrtpOptions::default());
    fresh.engine.set_multi_stream_params(&blob_a).unwrap();
    assert!(matches!(
        fresh.engine.set_multi_stream_params(&blob_a),
        Err(ZrtpError::MultiStreamAlreadySet)
    ));

    let mut started = Peer::with_zid(0x44, ZrtpOptions::default());
    started.engine.start();
    assert!(matches!(
        started.engine.set_multi_stream_params(&blob_a),
        Err(ZrtpError::AlreadyStarted)
    ));

    let mut damaged = Peer::with_zid(0x55, ZrtpOptions::default());
    assert!(matches!(
        damaged.engine.set_multi_stream_params(&blob_a[..10]),
        Err(ZrtpError::BadMultiStreamParams(_))
    ));

    // Not secure yet: nothing to export.
    assert!(started.engine.multi_stream_params().is_none());
}

#[test]
fn test_multi_stream_commit_without_master_is_refused() {
    let (alice, _bob, blob_a, _) = master();
    let mut alice2 = Peer::new(ZrtpOptions::default(), alice.cache.clone());
    let mut stranger = Peer::with_zid(0x22, passive());
    alice2.engine.set_multi_stream_params(&blob_a).unwrap();

    handshake(&mut alice2, &mut stranger);

    let refused = ZrtpStatus::ZrtpError(ErrorCode::UnsuppPkExchange);
    assert_eq!(stranger.failures(), vec![refused]);
    assert_eq!(alice2.failures(), vec![refused]);
    assert_eq!(alice2.engine.state(), ZrtpState::Error);
    assert_eq!(stranger.engine.state(), ZrtpState::Error);
}

#[test]
fn test_slave_uses_dh_with_a_different_peer() {
    let (alice, _bob, blob_a, _) = master();

    // 1. A slave bound to bob meets carol, who offers Mult too.
    let mut alice2 = Peer::new(ZrtpOptions::default(), alice.cache.clone());
    let mut carol = Peer::with_zid(0x33, passive());
    alice2.engine.set_multi_stream_params(&blob_a).unwrap();

    // 2. Full DH exchange instead of a refused multi-stream Commit.
    let transcript = handshake(&mut alice2, &mut carol);
    assert!(transcript.iter().any(|(_, name)| name == "DHPart1"));
    assert!(alice2.failures().is_empty());
    assert!(carol.failures().is_empty());

    // 3. Both ends secure, with a real key agreement and a SAS.
    assert!(alice2.engine.is_secure());
    assert!(carol.engine.is_secure());
    assert!(!alice2.engine.is_multi_stream());
    assert_ne!(alice2.engine.algorithms().unwrap().key_agreement, KeyAgreement::Mult);
    assert_eq!(alice2.engine.sas(), carol.engine.sas());
    assert_ne!(alice2.engine.sas(), Some(""));
}

#[test]
fn test_multi_stream_commit_from_other_zid_is_refused() {
    let (_alice, bob, blob_a, blob_b) = master();

    // bob's slave is bound to alice (0x11); mallory holds alice's blob, bound to bob.
    let mut mallory = Peer::with_zid(0x44, ZrtpOptions::default());
    let mut bob2 = Peer::new(passive(), bob.cache.clone());
    mallory.engine.set_multi_stream_params(&blob_a).unwrap();
    bob2.engine.set_multi_stream_params(&blob_b).unwrap();

    handshake(&mut mallory, &mut bob2);

    let refused = ZrtpStatus::ZrtpError(ErrorCode::UnsuppPkExchange);
    assert_eq!(bob2.failures(), vec![refused]);
    assert_eq!(mallory.failures(), vec![refused]);
    assert!(!bob2.engine.is_secure());
    assert_eq!(bob2.engine.state(), ZrtpState::Error);
}
