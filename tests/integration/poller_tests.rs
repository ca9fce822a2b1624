//! Endpoint poller against a simulated channel bank.

use fanlink::app::events::ControlEvent;
use fanlink::app::ports::{Clock, NoTachometer, Tachometer};
use fanlink::config::{CurveConfig, PollerConfig};
use fanlink::control::ActuatorCurve;
use fanlink::drivers::fan::FanDriver;
use fanlink::poller::bank::LinkBank;
use fanlink::poller::channels::ChannelBank;
use fanlink::poller::endpoints::EndpointStatus;
use fanlink::poller::{EndpointPoller, PollPhase};
use fanlink::protocol::Readings;

use crate::mock_link::{
    MockOpener, RecordingPwm, RecordingSink, ScriptedTach, SimBank, SimTime,
};

const TICK_MS: u64 = 5;

fn poller<B: ChannelBank>(bank: B) -> EndpointPoller<B, RecordingPwm> {
    EndpointPoller::new(
        bank,
        FanDriver::new(RecordingPwm::default()),
        ActuatorCurve::new(CurveConfig::default()),
        PollerConfig::default(),
    )
}

struct Rig<B, T = NoTachometer> {
    poller: EndpointPoller<B, RecordingPwm, T>,
    clock: SimTime,
    delay: SimTime,
    sink: RecordingSink,
}

impl<B: ChannelBank> Rig<B> {
    fn new(bank: B) -> Self {
        Rig::build(poller(bank))
    }
}

impl<B: ChannelBank, T: Tachometer> Rig<B, T> {
    fn build(poller: EndpointPoller<B, RecordingPwm, T>) -> Self {
        let clock = SimTime::new();
        let mut rig = Self {
            poller,
            delay: clock.clone(),
            clock,
            sink: RecordingSink::default(),
        };
        rig.poller.start(&mut rig.sink);
        rig
    }

    fn tick(&mut self) -> PollPhase {
        let phase = self.poller.tick(&self.clock, &mut self.delay, &mut self.sink);
        self.clock.advance_ms(TICK_MS);
        phase
    }

    fn run_cycles(&mut self, n: u64) {
        let target = self.poller.cycles() + n;
        for _ in 0..1_000_000 {
            if self.poller.cycles() >= target {
                return;
            }
            self.tick();
        }
        panic!("poller stalled");
    }

    fn pwm_writes(&self) -> &[u16] {
        &self.poller.fan().pwm().writes
    }

    fn disconnects(&self) -> usize {
        self.sink
            .count(|e| matches!(e, ControlEvent::EndpointDisconnected { .. }))
    }
}

#[test]
fn every_endpoint_is_polled_in_order() {
    let mut rig = Rig::new(SimBank::replying(&[
        Some("CPU:45.00|NVME:41.00\n"),
        Some("CPU:52.00|NVME:38.00\r\n"),
    ]));
    rig.run_cycles(1);

    let bank = rig.poller.bank();
    assert_eq!(bank.listen_calls, vec![0, 1]);
    for ch in &bank.channels {
        assert_eq!(ch.written, b"POLL\r\n");
    }

    let table = rig.poller.table();
    assert_eq!(
        table.get(0).unwrap().readings(),
        Some(Readings { cpu: 45.0, nvme: 41.0 })
    );
    assert_eq!(
        table.get(1).unwrap().readings(),
        Some(Readings { cpu: 52.0, nvme: 38.0 })
    );
    assert!(table.iter().all(|e| e.connected && e.missed == 0));
}

#[test]
fn fan_follows_each_reply_immediately() {
    let mut rig = Rig::new(SimBank::replying(&[
        Some("CPU:45.00|NVME:41.00\n"),
        Some("CPU:52.00|NVME:38.00\n"),
    ]));
    rig.run_cycles(1);

    // floor at start, then one change per reply.
    assert_eq!(rig.pwm_writes(), &[30, 37, 92]);
    let kinds: Vec<&str> = rig
        .sink
        .events
        .iter()
        .map(|e| match e {
            ControlEvent::EndpointUpdated { .. } => "updated",
            ControlEvent::FanChanged(_) => "fan",
            ControlEvent::CycleComplete(_) => "cycle",
            ControlEvent::EndpointDisconnected { .. } => "disconnected",
            ControlEvent::MalformedReply { .. } => "malformed",
        })
        .collect();
    assert_eq!(kinds, ["fan", "updated", "fan", "updated", "fan", "cycle"]);

    match &rig.sink.events[4] {
        ControlEvent::FanChanged(report) => {
            assert_eq!(report.duty, 92);
            assert_eq!(report.percent, 36);
            assert_eq!(report.worst, Some((52.0, 41.0)));
            assert_eq!(
                report.statuses.as_slice(),
                &[EndpointStatus::On, EndpointStatus::On]
            );
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn silent_endpoint_times_out_without_blocking_the_rest() {
    let mut rig = Rig::new(SimBank::replying(&[None, Some("CPU:41.00|NVME:40.00\n")]));
    rig.run_cycles(1);

    let table = rig.poller.table();
    assert_eq!(table.get(0).unwrap().missed, 1);
    assert!(!table.get(0).unwrap().valid);
    assert!(table.get(1).unwrap().connected);
    // A never-connected endpoint cannot disconnect.
    rig.run_cycles(15);
    assert_eq!(rig.disconnects(), 0);
    assert_eq!(rig.poller.table().get(0).unwrap().missed, 16);
}

#[test]
fn disconnect_fires_exactly_once_and_keeps_last_readings() {
    let mut rig = Rig::new(SimBank::replying(&[Some("CPU:57.00|NVME:44.00\n")]));
    rig.run_cycles(1);
    let duty = rig.poller.applied_duty();
    let writes = rig.pwm_writes().len();

    rig.poller.bank_mut().channels[0].reply = None;
    rig.run_cycles(9);
    assert!(rig.poller.table().get(0).unwrap().connected);
    assert_eq!(rig.disconnects(), 0);

    rig.run_cycles(1);
    assert_eq!(rig.disconnects(), 1);
    rig.run_cycles(20);
    assert_eq!(rig.disconnects(), 1);

    let slot = *rig.poller.table().get(0).unwrap();
    assert!(!slot.connected);
    assert_eq!(slot.missed, 30);
    assert_eq!(slot.readings(), Some(Readings { cpu: 57.0, nvme: 44.0 }));
    assert_eq!(slot.status(), EndpointStatus::OffSaved);
    // Worst-of still includes the stale readings: no drop to floor.
    assert_eq!(rig.poller.applied_duty(), duty);
    assert_eq!(rig.pwm_writes().len(), writes);
}

#[test]
fn stale_bytes_are_drained_before_polling() {
    let mut bank = SimBank::replying(&[Some("CPU:45.00|NVME:41.00\n")]);
    bank.channels[0]
        .rx
        .extend(b"CPU:99.00|NVME:99.00\n".iter().copied());
    let mut rig = Rig::new(bank);
    rig.run_cycles(1);

    assert_eq!(
        rig.poller.table().get(0).unwrap().readings(),
        Some(Readings { cpu: 45.0, nvme: 41.0 })
    );
}

#[test]
fn malformed_reply_ends_the_wait_without_counting() {
    let mut rig = Rig::new(SimBank::replying(&[Some("ERR busy\n")]));
    rig.run_cycles(1);

    let slot = rig.poller.table().get(0).unwrap();
    assert!(!slot.valid);
    assert_eq!(slot.missed, 0);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, ControlEvent::MalformedReply { index: 0, .. })),
        1
    );
    // settle + one tick, nowhere near the response timeout.
    assert!(rig.clock.now_ms() < 200);
}

#[test]
fn next_cycle_waits_for_the_poll_interval() {
    let mut rig = Rig::new(SimBank::replying(&[Some("CPU:45.00|NVME:41.00\n")]));
    rig.run_cycles(1);
    let done = rig.clock.now_ms();

    while rig.clock.now_ms() < done + 990 {
        assert_eq!(rig.tick(), PollPhase::Idle);
    }
    assert_eq!(rig.poller.bank().listen_calls.len(), 1);

    let mut started = false;
    for _ in 0..10 {
        if rig.tick() == PollPhase::Awaiting(0) {
            started = true;
            break;
        }
    }
    assert!(started);
    assert_eq!(rig.poller.bank().listen_calls.len(), 2);
}

// ── Link-backed bank ──────────────────────────────────────────

#[test]
fn absent_endpoint_device_does_not_stop_the_others() {
    let (absent, absent_script) = MockOpener::new();
    absent_script.borrow_mut().fail_opens = u32::MAX;
    let (present, present_script) = MockOpener::new();
    present_script.borrow_mut().reply = Some(b"CPU:48.00|NVME:40.00\n".to_vec());

    let bank = LinkBank::new([absent, present]);
    assert_eq!(bank.online(), 1);
    let mut rig = Rig::new(bank);
    rig.run_cycles(1);

    let table = rig.poller.table();
    assert_eq!(table.get(0).unwrap().missed, 1);
    assert!(!table.get(0).unwrap().valid);
    assert_eq!(
        table.get(1).unwrap().readings(),
        Some(Readings { cpu: 48.0, nvme: 40.0 })
    );
    assert!(rig.poller.applied_duty().is_some_and(|d| d > 30));

    // Device plugged in: picked up on the next cycle.
    {
        let mut s = absent_script.borrow_mut();
        s.fail_opens = 0;
        s.reply = Some(b"CPU:55.00|NVME:42.00\n".to_vec());
    }
    rig.run_cycles(1);
    assert!(rig.poller.bank().is_online(0));
    assert_eq!(absent_script.borrow().opens, 1);
    assert_eq!(
        rig.poller.table().get(0).unwrap().readings(),
        Some(Readings { cpu: 55.0, nvme: 42.0 })
    );
}

#[test]
fn failed_endpoint_link_is_reopened_on_its_next_turn() {
    let (opener, script) = MockOpener::new();
    script.borrow_mut().reply = Some(b"CPU:45.00|NVME:41.00\n".to_vec());
    let mut rig = Rig::new(LinkBank::new([opener]));
    rig.run_cycles(1);
    assert_eq!(rig.poller.table().get(0).unwrap().missed, 0);

    script.borrow_mut().fail_writes = true;
    rig.run_cycles(1);
    assert_eq!(rig.poller.table().get(0).unwrap().missed, 1);
    assert!(!rig.poller.bank().is_online(0));
    assert_eq!(script.borrow().live_handles, 0);

    script.borrow_mut().fail_writes = false;
    rig.run_cycles(1);
    let s = script.borrow();
    assert_eq!(s.opens, 2);
    assert_eq!(s.max_live_handles, 1);
    assert_eq!(rig.poller.table().get(0).unwrap().missed, 0);
}

// ── Tachometer ────────────────────────────────────────────────

#[test]
fn fan_speed_is_sampled_on_its_own_interval_and_reported() {
    let tach = ScriptedTach {
        samples: [Some(1200), Some(1500)].into_iter().collect(),
        reads: 0,
    };
    let bank = SimBank::replying(&[Some("CPU:45.00|NVME:41.00\n")]);
    let mut rig = Rig::build(poller(bank).with_tachometer(tach, 1000));
    rig.run_cycles(2);

    assert_eq!(rig.poller.tachometer().reads, 2);
    assert_eq!(rig.poller.rpm(), Some(1500));

    let fan: Vec<Option<u32>> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            ControlEvent::FanChanged(r) => Some(r.rpm),
            _ => None,
        })
        .collect();
    // floor before the first tick, then the first reply.
    assert_eq!(fan, [None, Some(1200)]);

    let cycles: Vec<Option<u32>> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            ControlEvent::CycleComplete(c) => Some(c.rpm),
            _ => None,
        })
        .collect();
    assert_eq!(cycles, [Some(1200), Some(1500)]);
}
