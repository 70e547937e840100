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

use common::{message_name, passive, pump_with, Dir, Peer};
use zrtp_core::{EnableSecurity, ErrorCode, SevereCode, ZrtpOptions, ZrtpState, ZrtpStatus};
use zrtp_proto::ErrorPacket;

/// Runs a handshake where `tamper` may rewrite any message in flight.
fn tampered<F>(alice: &mut Peer, bob: &mut Peer, mut tamper: F)
where
    F: FnMut(Dir, &str, &mut Vec<u8>),
{
    alice.engine.start();
    bob.engine.start();
    pump_with(alice, bob, |dir, mut m| {
        let name = message_name(&m);
        tamper(dir, &name, &mut m);
        Some(m)
    });
}

fn pair() -> (Peer, Peer) {
    (
        Peer::with_zid(0x11, ZrtpOptions::default()),
        Peer::with_zid(0x22, passive()),
    )
}

#[test]
fn test_modified_hello_detected_at_commit() {
    let (mut alice, mut bob) = pair();
    tampered(&mut alice, &mut bob, |dir, name, m| {
        if dir == Dir::AtoB && name == "Hello" {
            // Inside the client id.
            m[20] ^= 0x01;
        }
    });

    assert_eq!(bob.failures(), vec![ZrtpStatus::Severe(SevereCode::HelloHmacFailed)]);
    assert_eq!(bob.engine.state(), ZrtpState::Error);
    assert_eq!(alice.engine.state(), ZrtpState::CommitSent);
}

#[test]
fn test_equal_zids_rejected() {
    let mut alice = Peer::with_zid(0x11, ZrtpOptions::default());
    let mut bob = Peer::with_zid(0x11, passive());
    tampered(&mut alice, &mut bob, |_, _, _| {});

    let equal = ZrtpStatus::ZrtpError(ErrorCode::EqualZidHello);
    assert_eq!(alice.failures().first(), Some(&equal));
    assert_eq!(bob.failures().first(), Some(&equal));
    assert_eq!(alice.engine.state(), ZrtpState::Error);
    assert_eq!(bob.engine.state(), ZrtpState::Error);
    assert_eq!(alice.timer(), None);
}

#[test]
fn test_unsupported_version_answered_with_error() {
    let (mut alice, mut bob) = pair();
    tampered(&mut alice, &mut bob, |dir, name, m| {
        if dir == Dir::AtoB && name == "Hello" {
            m[12..16].copy_from_slice(b"2.00");
        }
    });

    let unsupported = ZrtpStatus::ZrtpError(ErrorCode::UnsuppZrtpVersion);
    assert_eq!(bob.failures(), vec![unsupported]);
    assert_eq!(alice.failures(), vec![unsupported]);
    assert!(alice.sent_names().contains(&"ErrorACK".to_string()));
    // Bob got the ErrorACK and stopped retransmitting.
    assert_eq!(bob.engine.state(), ZrtpState::Error);
    assert_eq!(bob.timer(), None);
}

#[test]
fn test_unsupported_committed_cipher() {
    let (mut alice, mut bob) = pair();
    tampered(&mut alice, &mut bob, |_, name, m| {
        if name == "Commit" {
            m[60..64].copy_from_slice(b"XXXX");
        }
    });
    let refused = ZrtpStatus::ZrtpError(ErrorCode::UnsuppCipherType);
    assert_eq!(bob.failures(), vec![refused]);
    assert_eq!(alice.failures(), vec![refused]);
}

#[test]
fn test_dh_part2_not_matching_hvi() {
    let (mut alice, mut bob) = pair();
    tampered(&mut alice, &mut bob, |_, name, m| {
        if name == "DHPart2" {
            let last = m.len() - 1;
            m[last] ^= 0x80;
        }
    });
    let wrong_hvi = ZrtpStatus::ZrtpError(ErrorCode::DhErrorWrongHvi);
    assert_eq!(bob.failures(), vec![wrong_hvi]);
    assert_eq!(alice.engine.state(), ZrtpState::Error);
}

#[test]
fn test_modified_confirm_rejected() {
    let (mut alice, mut bob) = pair();
    tampered(&mut alice, &mut bob, |_, name, m| {
        if name == "Confirm1" {
            let last = m.len() - 1;
            m[last] ^= 0x01;
        }
    });

    let bad_mac = ZrtpStatus::ZrtpError(ErrorCode::ConfirmHmacWrong);
    assert_eq!(alice.failures(), vec![bad_mac]);
    assert_eq!(bob.failures(), vec![bad_mac]);
    assert_eq!(alice.engine.state(), ZrtpState::Error);
    assert_eq!(bob.engine.state(), ZrtpState::Error);
    // Bob had already keyed his receiver.
    assert_eq!(
        bob.recorder.inner.lock().secrets_off,
        vec![EnableSecurity::ForReceiver]
    );
    assert!(alice.secure_on().is_empty());
}

#[test]
fn test_unknown_peer_error_code() {
    let mut alice = Peer::with_zid(0x11, ZrtpOptions::default());
    let error = ErrorPacket { error_code: 0x999 }.to_bytes();

    // Ignored while idle.
    alice.engine.process_message(&error);
    assert!(alice.take_outbox().is_empty());

    alice.engine.start();
    alice.take_outbox();
    alice.engine.process_message(&error);
    assert_eq!(
        alice.failures(),
        vec![ZrtpStatus::ZrtpError(ErrorCode::CriticalSwError)]
    );
    assert_eq!(alice.sent_names().last().map(String::as_str), Some("ErrorACK"));
    assert_eq!(alice.engine.state(), ZrtpState::Error);
    assert_eq!(alice.timer(), None);
}
