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

use common::{
    init_logging, manual, passive, pump, pump_with, rtcp_packet, rtp_packet, secure_pair, Dir,
    Endpoint,
};
use zrtp_core::{InfoCode, WarningCode};
use zrtp_filter::{
    EnableSecurity, FilterConfig, FilterError, ZrtpNotification, ZrtpState, ZrtpStatus,
};
use zrtp_srtp::SrtpError;

#[test]
fn test_handshake_protects_media_both_ways() {
    init_logging();
    let (alice, bob) = secure_pair();

    // 1. Both sides announce the same SAS and algorithms.
    let sas = alice.events.sas().unwrap();
    assert_eq!(bob.events.sas(), Some(sas.clone()));
    assert_eq!(alice.filter.sas(), Some(sas));
    assert_eq!(alice.filter.cipher_info(), bob.filter.cipher_info());
    assert!(alice
        .events
        .all()
        .iter()
        .any(|n| matches!(n, ZrtpNotification::Algorithm { verified: false, .. })));
    assert!(alice.events.contains(&ZrtpNotification::StateChanged {
        from: ZrtpState::WaitConfAck,
        to: ZrtpState::Secure,
    }));
    assert!(alice.filter.is_send_secure() && alice.filter.is_recv_secure());

    // 2. RTP from Alice is protected on the way out and restored at Bob.
    let rtp = rtp_packet(0xa11c_e000, 100, b"first protected frame");
    let srtp = alice.filter.send_rtp(&rtp).unwrap();
    assert_ne!(srtp, rtp);
    assert!(srtp.len() > rtp.len());
    assert_eq!(&srtp[..12], &rtp[..12]);
    assert_eq!(bob.filter.recv_rtp(&srtp).unwrap(), Some(rtp));

    // 3. And the other way round.
    let rtp = rtp_packet(0x0000_b0b0, 9, b"reply");
    let srtp = bob.filter.send_rtp(&rtp).unwrap();
    assert_eq!(alice.filter.recv_rtp(&srtp).unwrap(), Some(rtp));

    // 4. RTCP, on its own port and multiplexed on the RTP port.
    let rtcp = rtcp_packet(0xa11c_e000);
    let srtcp = alice.filter.send_rtcp(&rtcp).unwrap();
    assert_ne!(srtcp, rtcp);
    assert_eq!(bob.filter.recv_rtcp(&srtcp).unwrap(), rtcp);
    let srtcp = alice.filter.send_rtp(&rtcp).unwrap();
    assert_eq!(bob.filter.recv_rtp(&srtcp).unwrap(), Some(rtcp));

    assert_eq!(alice.filter.stats().protected, 3);
    assert_eq!(bob.filter.stats().unprotected, 3);
    assert_eq!(bob.filter.stats().unprotect_errors, 0);
}

#[test]
fn test_replayed_and_tampered_packets_are_dropped() {
    init_logging();
    let (alice, bob) = secure_pair();
    let first = alice.filter.send_rtp(&rtp_packet(7, 1, b"one")).unwrap();
    assert!(bob.filter.recv_rtp(&first).unwrap().is_some());

    // 1. A replay is dropped with a warning.
    assert!(matches!(
        bob.filter.recv_rtp(&first),
        Err(FilterError::Srtp(SrtpError::Replay(_)))
    ));
    assert!(bob.events.has_status(ZrtpStatus::Warning(WarningCode::SrtpReplayError)));

    // 2. A flipped payload bit fails authentication.
    let mut second = alice.filter.send_rtp(&rtp_packet(7, 2, b"two")).unwrap();
    second[13] ^= 0x80;
    assert!(matches!(
        bob.filter.recv_rtp(&second),
        Err(FilterError::Srtp(SrtpError::Auth))
    ));
    assert!(bob.events.has_status(ZrtpStatus::Warning(WarningCode::SrtpAuthError)));

    // 3. The session survives both.
    let third = alice.filter.send_rtp(&rtp_packet(7, 3, b"three")).unwrap();
    assert_eq!(bob.filter.recv_rtp(&third).unwrap(), Some(rtp_packet(7, 3, b"three")));
    assert!(bob.filter.is_secure());
    assert_eq!(bob.filter.stats().unprotect_errors, 2);
    assert_eq!(bob.filter.stats().unprotected, 2);
}

#[test]
fn test_srtp_from_peer_replaces_lost_conf2_ack() {
    init_logging();
    let alice = Endpoint::new(manual());
    let bob = Endpoint::new(passive());
    alice.filter.start().unwrap();
    bob.filter.start().unwrap();
    pump_with(&alice, &bob, |dir, packet| {
        (dir != Dir::BtoA || common::frame_name(&packet) != "Conf2ACK").then_some(packet)
    });

    // 1. Alice has keys to receive but still waits to send.
    assert_eq!(alice.filter.state(), ZrtpState::WaitConfAck);
    assert!(alice.filter.is_recv_secure());
    assert!(!alice.filter.is_send_secure());
    assert!(bob.filter.is_secure());

    // 2. Bob's first SRTP packet proves he got Confirm2.
    let rtp = rtp_packet(0xb0b, 1, b"media");
    let srtp = bob.filter.send_rtp(&rtp).unwrap();
    assert_eq!(alice.filter.recv_rtp(&srtp).unwrap(), Some(rtp));
    assert_eq!(alice.filter.state(), ZrtpState::Secure);
    assert!(alice.filter.is_send_secure());
    assert!(!alice.clock.is_armed());
}

#[test]
fn test_lost_commit_is_resent_on_timeout() {
    init_logging();
    let alice = Endpoint::new(manual());
    let bob = Endpoint::new(passive());
    alice.filter.start().unwrap();
    bob.filter.start().unwrap();
    let mut dropped = false;
    pump_with(&alice, &bob, |_, packet| {
        if !dropped && common::frame_name(&packet) == "Commit" {
            dropped = true;
            return None;
        }
        Some(packet)
    });
    assert!(dropped);
    assert_eq!(alice.filter.state(), ZrtpState::CommitSent);

    // The clock calls back into the filter, which resends Commit.
    assert!(alice.clock.fire());
    pump(&alice, &bob);
    assert!(alice.filter.is_secure());
    assert!(bob.filter.is_secure());
}

#[test]
fn test_stop_switches_media_back_to_clear() {
    let (alice, _bob) = secure_pair();
    alice.filter.stop();

    assert!(alice
        .events
        .contains(&ZrtpNotification::SecurityOff(EnableSecurity::ForSender)));
    assert!(alice
        .events
        .contains(&ZrtpNotification::SecurityOff(EnableSecurity::ForReceiver)));
    assert_eq!(alice.filter.state(), ZrtpState::Idle);
    let rtp = rtp_packet(1, 1, b"clear again");
    assert_eq!(alice.filter.send_rtp(&rtp).unwrap(), rtp);
}

#[test]
fn test_multi_stream_filters_share_master_cache() {
    init_logging();
    let (alice, bob) = secure_pair();
    let blob_a = alice.filter.multi_stream_params().unwrap();
    let blob_b = bob.filter.multi_stream_params().unwrap();
    assert!(alice.filter.multi_stream_params().is_none());

    // 1. Video streams bootstrap from the audio master.
    let alice_video = Endpoint::with_cache(manual(), alice.filter.cache());
    let bob_video = Endpoint::with_cache(passive(), bob.filter.cache());
    alice_video.filter.set_multi_stream_params(&blob_a).unwrap();
    bob_video.filter.set_multi_stream_params(&blob_b).unwrap();
    assert!(alice_video.filter.is_multi_stream());
    alice_video.filter.start().unwrap();
    bob_video.filter.start().unwrap();
    let transcript = pump(&alice_video, &bob_video);

    // 2. No DH exchange and no SAS of their own.
    assert!(transcript.iter().all(|(_, name)| !name.starts_with("DHPart")));
    assert!(alice_video.filter.is_secure());
    assert!(bob_video.filter.is_secure());
    assert!(alice_video.filter.multi_stream_available());
    assert_eq!(alice_video.events.sas(), None);
    assert!(alice_video.filter.cipher_info().unwrap().contains("Mult"));

    // 3. Independent keys: video SRTP does not open on the audio stream.
    let rtp = rtp_packet(0x7, 1, b"video frame");
    let srtp = alice_video.filter.send_rtp(&rtp).unwrap();
    assert_eq!(bob_video.filter.recv_rtp(&srtp).unwrap(), Some(rtp));
    assert!(matches!(
        bob.filter.recv_rtp(&srtp),
        Err(FilterError::Srtp(SrtpError::Auth))
    ));
}

#[test]
fn test_named_cache_gives_continuity() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = |name: &str, passive: bool| {
        let mut config = FilterConfig {
            auto_start: false,
            cache_name: Some(dir.path().join(name)),
            ..FilterConfig::default()
        };
        config.options.passive = passive;
        config
    };
    let run = || {
        let alice = Endpoint::open(config("alice.db", false));
        let bob = Endpoint::open(config("bob.zid", true));
        alice.filter.start().unwrap();
        bob.filter.start().unwrap();
        pump(&alice, &bob);
        assert!(alice.filter.is_secure());
        assert_eq!(alice.filter.peer_zid(), Some(bob.filter.cache().own_zid()));
        (alice, bob)
    };

    // 1. First contact: nothing retained, the SAS must be compared.
    let (alice, bob) = run();
    assert!(alice.events.has_status(ZrtpStatus::Warning(WarningCode::NoRsMatch)));
    alice.filter.set_sas_verified().unwrap();
    bob.filter.set_sas_verified().unwrap();
    drop((alice, bob));

    // 2. Second call: retained secrets match and the SAS stays verified.
    let (alice, bob) = run();
    assert!(alice.events.has_status(ZrtpStatus::Info(InfoCode::RsMatchFound)));
    assert!(!alice.events.has_status(ZrtpStatus::Warning(WarningCode::NoRsMatch)));
    assert!(alice.filter.is_sas_verified());
    assert!(bob
        .events
        .all()
        .iter()
        .any(|n| matches!(n, ZrtpNotification::Sas { verified: true, .. })));
}
