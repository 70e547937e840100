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

use common::{handshake, passive, pump, Peer};
use zrtp_core::{
    EnableSecurity, EnrollmentCode, InfoCode, WarningCode, ZrtpError, ZrtpOptions, ZrtpState,
    ZrtpStatus,
};
use zrtp_crypto::{render_sas_base32, SasType};

fn allow_clear(options: ZrtpOptions) -> ZrtpOptions {
    ZrtpOptions {
        allow_clear: true,
        ..options
    }
}

#[test]
fn test_go_clear_and_back() {
    let mut alice = Peer::with_zid(0x11, allow_clear(ZrtpOptions::default()));
    let mut bob = Peer::with_zid(0x22, allow_clear(passive()));
    handshake(&mut alice, &mut bob);

    alice.engine.request_go_clear().unwrap();
    assert_eq!(alice.engine.state(), ZrtpState::WaitClearAck);
    assert_eq!(alice.timer(), Some(150));
    // Outgoing media is in the clear right away.
    assert_eq!(
        alice.recorder.inner.lock().secrets_off,
        vec![EnableSecurity::ForSender]
    );

    pump(&mut alice, &mut bob);

    assert_eq!(alice.engine.state(), ZrtpState::Idle);
    assert_eq!(bob.engine.state(), ZrtpState::Idle);
    assert_eq!(alice.timer(), None);
    assert_eq!(bob.recorder.inner.lock().go_clear, 1);
    assert!(bob.has_status(ZrtpStatus::Warning(WarningCode::GoClearReceived)));
    assert!(alice.has_status(ZrtpStatus::Info(InfoCode::SecureStateOff)));
    assert!(bob.has_status(ZrtpStatus::Info(InfoCode::SecureStateOff)));
    assert_eq!(alice.recorder.inner.lock().secrets_off.len(), 2);
    assert_eq!(bob.recorder.inner.lock().secrets_off.len(), 2);

    // Going secure again picks up the secret retained a moment ago.
    handshake(&mut alice, &mut bob);
    assert!(alice.engine.is_secure());
    assert!(alice.has_status(ZrtpStatus::Info(InfoCode::RsMatchFound)));
}

#[test]
fn test_go_clear_needs_both_sides() {
    let mut alice = Peer::with_zid(0x11, allow_clear(ZrtpOptions::default()));
    let mut bob = Peer::with_zid(0x22, passive());

    assert!(matches!(alice.engine.request_go_clear(), Err(ZrtpError::NotSecure)));
    handshake(&mut alice, &mut bob);

    // Bob did not set the A flag, and does not allow it himself.
    assert!(matches!(alice.engine.request_go_clear(), Err(ZrtpError::NotAllowed(_))));
    assert!(matches!(bob.engine.request_go_clear(), Err(ZrtpError::NotAllowed(_))));
    assert!(alice.engine.is_secure());
    assert!(alice.take_outbox().is_empty());
}

#[test]
fn test_pbx_enrollment() {
    let mut pbx = Peer::with_zid(0x11, ZrtpOptions::pbx());
    let mut client = Peer::with_zid(0x22, passive());
    handshake(&mut pbx, &mut client);
    assert!(client.engine.peer_is_mitm());

    assert_eq!(
        client.recorder.inner.lock().ask_enrollment,
        vec![EnrollmentCode::Request]
    );
    assert!(pbx.recorder.inner.lock().ask_enrollment.is_empty());

    client.engine.accept_enrollment(true).unwrap();
    assert_eq!(
        client.recorder.inner.lock().inform_enrollment,
        vec![EnrollmentCode::Ok]
    );
    let record = client.cache.get_record(&[0x11; 12]).unwrap().unwrap();
    assert!(record.mitm_key().is_some());
    // The PBX keeps the same key for its client.
    let pbx_record = pbx.cache.get_record(&[0x22; 12]).unwrap().unwrap();
    assert_eq!(pbx_record.mitm_key(), record.mitm_key());

    assert!(matches!(
        client.engine.accept_enrollment(true),
        Err(ZrtpError::NoEnrollmentPending)
    ));
}

#[test]
fn test_enrollment_declined() {
    let mut pbx = Peer::with_zid(0x11, ZrtpOptions::pbx());
    let mut client = Peer::with_zid(0x22, passive());
    handshake(&mut pbx, &mut client);

    client.engine.accept_enrollment(false).unwrap();
    assert_eq!(
        client.recorder.inner.lock().inform_enrollment,
        vec![EnrollmentCode::Canceled]
    );
    let record = client.cache.get_record(&[0x11; 12]).unwrap().unwrap();
    assert!(record.mitm_key().is_none());
}

#[test]
fn test_sas_relay_from_enrolled_pbx() {
    let mut pbx = Peer::with_zid(0x11, ZrtpOptions::pbx());
    let mut client = Peer::with_zid(0x22, passive());
    handshake(&mut pbx, &mut client);
    client.engine.accept_enrollment(true).unwrap();

    // Next call through the same PBX.
    let mut pbx = Peer::new(ZrtpOptions::pbx(), pbx.cache.clone());
    let mut client = Peer::new(passive(), client.cache.clone());
    handshake(&mut pbx, &mut client);
    assert_eq!(pbx.engine.sas(), client.engine.sas());

    let other_leg = [0x42; 32];
    pbx.engine.send_sas_relay(&other_leg, SasType::B32).unwrap();
    assert_eq!(pbx.timer(), Some(150));
    pump(&mut pbx, &mut client);

    let relayed = render_sas_base32(&other_leg);
    assert_eq!(client.engine.sas(), Some(relayed.as_str()));
    let on = client.secure_on();
    assert_eq!(on.len(), 2);
    assert_eq!(on[1].1, relayed);
    assert!(!on[1].2);
    // RelayACK stopped the retransmission.
    assert_eq!(pbx.timer(), None);
    assert!(pbx.sent_names().contains(&"SASrelay".to_string()));
}

#[test]
fn test_sas_relay_from_untrusted_peer_ignored() {
    let mut pbx = Peer::with_zid(0x11, ZrtpOptions::pbx());
    let mut client = Peer::with_zid(0x22, passive());
    handshake(&mut pbx, &mut client);
    let sas = client.engine.sas().map(str::to_string);

    pbx.engine.send_sas_relay(&[0x42; 32], SasType::B32).unwrap();
    pump(&mut pbx, &mut client);

    // Acknowledged, not adopted.
    assert!(client.sent_names().contains(&"RelayACK".to_string()));
    assert_eq!(client.engine.sas().map(str::to_string), sas);
    assert_eq!(client.secure_on().len(), 1);
}

#[test]
fn test_only_mitm_relays_sas() {
    let mut alice = Peer::with_zid(0x11, ZrtpOptions::default());
    let mut bob = Peer::with_zid(0x22, passive());
    handshake(&mut alice, &mut bob);
    assert!(matches!(
        alice.engine.send_sas_relay(&[0; 32], SasType::B32),
        Err(ZrtpError::NotAllowed(_))
    ));
}
