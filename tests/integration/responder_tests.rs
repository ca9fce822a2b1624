//! Receiver loop: POLL in, readings out.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use fanlink::app::ports::Reading;
use fanlink::app::responder::Responder;
use fanlink::link::supervisor::{ConnectionSupervisor, LinkEvent, LinkMode};

use crate::mock_link::{FixedSource, MockOpener, ReadStep, SharedScript, SimTime, push_reads};

const NUDGE: &[u8] = b"\n\n\n";

fn responder(source: FixedSource) -> (Responder<MockOpener, FixedSource>, SharedScript, SimTime) {
    let (opener, script) = MockOpener::new();
    let mut time = SimTime::new();
    let mut sup = ConnectionSupervisor::new(opener, Duration::from_secs(1));
    sup.connect(&mut time).unwrap();
    (Responder::new(sup, source), script, time)
}

fn replies(script: &SharedScript) -> Vec<u8> {
    script.borrow().written[NUDGE.len()..].to_vec()
}

#[test]
fn poll_is_answered_with_two_decimals() {
    let (mut r, script, mut time) = responder(FixedSource::valid(42.5, 39.1));
    push_reads(&script, [ReadStep::Data(b"POLL\r\n".to_vec())]);

    assert!(matches!(r.step(&mut time), LinkEvent::Frame(_)));
    assert_eq!(replies(&script), b"CPU:42.50|NVME:39.10\n");
    assert_eq!(r.answered(), 1);
    assert_eq!(r.supervisor().mode(), LinkMode::Normal);
}

#[test]
fn fragmented_request_is_reassembled() {
    let (mut r, script, mut time) = responder(FixedSource::valid(50.0, 40.0));
    push_reads(
        &script,
        [
            ReadStep::Data(b"PO".to_vec()),
            ReadStep::Data(b"LL\r".to_vec()),
            ReadStep::Data(b"\n".to_vec()),
        ],
    );

    assert_eq!(r.step(&mut time), LinkEvent::Pending);
    assert_eq!(r.step(&mut time), LinkEvent::Pending);
    assert!(matches!(r.step(&mut time), LinkEvent::Frame(_)));
    assert_eq!(r.answered(), 1);
}

#[test]
fn back_to_back_requests_are_answered_in_order() {
    let (mut r, script, mut time) = responder(FixedSource::valid(45.0, 41.0));
    push_reads(&script, [ReadStep::Data(b"\r\nPOLL\nPOLL\r\n".to_vec())]);

    r.step(&mut time);
    r.step(&mut time);
    assert_eq!(r.answered(), 2);
    assert_eq!(
        replies(&script),
        b"CPU:45.00|NVME:41.00\nCPU:45.00|NVME:41.00\n"
    );
}

#[test]
fn noise_during_resync_is_ignored() {
    let (mut r, script, mut time) = responder(FixedSource::valid(45.0, 41.0));
    push_reads(
        &script,
        [
            ReadStep::Data(b"MP:44.00|NVME:3\n".to_vec()),
            ReadStep::Data(b"   \n".to_vec()),
        ],
    );

    r.step(&mut time);
    r.step(&mut time);
    assert_eq!(r.answered(), 0);
    assert!(replies(&script).is_empty());
    assert_eq!(r.supervisor().mode(), LinkMode::StartupResync);
}

#[test]
fn invalid_readings_still_produce_a_reply() {
    let source = FixedSource {
        cpu: Reading {
            value: 61.0,
            valid: false,
        },
        nvme: Reading {
            value: 59.0,
            valid: false,
        },
    };
    let (mut r, script, mut time) = responder(source);
    push_reads(&script, [ReadStep::Data(b"POLL\n".to_vec())]);

    r.step(&mut time);
    assert_eq!(replies(&script), b"CPU:61.00|NVME:59.00\n");
}

#[test]
fn failed_reply_is_a_transport_error() {
    let (mut r, script, mut time) = responder(FixedSource::valid(45.0, 41.0));
    script.borrow_mut().fail_writes = true;
    push_reads(&script, [ReadStep::Data(b"POLL\n".to_vec())]);

    r.step(&mut time);
    assert_eq!(r.answered(), 0);
    assert_eq!(r.supervisor().state().consecutive_errors(), 1);
    assert_eq!(r.supervisor().state().successful_exchanges(), 0);
}

#[test]
fn cleared_flag_stops_the_loop_and_closes_the_link() {
    let (mut r, script, mut time) = responder(FixedSource::valid(45.0, 41.0));
    let running = AtomicBool::new(false);
    r.run(&running, &mut time);
    assert_eq!(script.borrow().live_handles, 0);
    assert!(!r.supervisor().is_connected());
}
