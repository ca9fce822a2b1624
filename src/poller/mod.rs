//! Round-robin endpoint poller (controller side).
//!
//! ```text
//!  Idle ─▶ SelectNext ─▶ ActivateChannel ─▶ SettleDelay ─▶ DrainStale
//!   ▲                                                          │
//!   │                                                          ▼
//!   └── (last endpoint) ◀── Advance ◀── Matched | TimedOut ◀── SendRequest
//!                                            ▲                  │
//!                                            └── AwaitResponse ◀┘
//! ```
//!
//! `SelectNext` through `SendRequest` run back to back inside one
//! [`tick`]; `AwaitResponse` is spread over as many ticks as it takes for
//! a line to arrive or the response timeout to expire. After the last
//! endpoint the poller rests for the poll interval, measured from the end
//! of the cycle.
//!
//! Every decoded reply and every disconnect re-evaluates the fan curve
//! straight away, so actuation lags a temperature change by at most one
//! response latency.
//!
//! An optional [`Tachometer`] is sampled on its own interval, independent
//! of the polling phase; the latest sample rides along in fan reports and
//! cycle summaries.
//!
//! [`tick`]: EndpointPoller::tick

pub mod bank;
pub mod channels;
pub mod endpoints;

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, info, warn};

use crate::app::events::{ControlEvent, CycleSummary, FanReport};
use crate::app::ports::{Clock, EventSink, NoTachometer, Tachometer};
use crate::config::{MAX_ENDPOINTS, PollerConfig};
use crate::control::ActuatorCurve;
use crate::control::curve::duty_percent;
use crate::drivers::fan::FanDriver;
use crate::link::frame::{Frame, FrameReader};
use crate::protocol::codec::RESPONSE_CAPACITY;
use crate::protocol::{POLL_REQUEST, decode_response};

use self::channels::ChannelBank;
use self::endpoints::EndpointTable;

/// Stale bytes discarded per channel switch, at most.
const DRAIN_LIMIT: usize = 1024;

/// Bytes consumed per tick while awaiting a reply, at most.
const RX_BUDGET: usize = 256;

/// Externally visible poller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// Between cycles.
    Idle,
    /// `POLL` sent to this endpoint, waiting for its line.
    Awaiting(usize),
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    /// `None` until the first cycle has run.
    Idle { since_ms: Option<u64> },
    Awaiting { index: usize, sent_ms: u64 },
}

/// Controller-side poller: owns the channel bank, the endpoint table and
/// the fan output.
pub struct EndpointPoller<B, P, T = NoTachometer> {
    bank: B,
    fan: FanDriver<P>,
    tach: T,
    tach_interval_ms: u32,
    tach_sampled_ms: Option<u64>,
    rpm: Option<u32>,
    table: EndpointTable,
    curve: ActuatorCurve,
    config: PollerConfig,
    readers: [FrameReader; MAX_ENDPOINTS],
    phase: Phase,
    cycles: u64,
}

impl<B: ChannelBank, P: SetDutyCycle> EndpointPoller<B, P> {
    pub fn new(bank: B, fan: FanDriver<P>, curve: ActuatorCurve, config: PollerConfig) -> Self {
        let table = EndpointTable::new(bank.len(), config.max_missed_polls);
        Self {
            bank,
            fan,
            tach: NoTachometer,
            tach_interval_ms: u32::MAX,
            tach_sampled_ms: None,
            rpm: None,
            table,
            curve,
            config,
            readers: core::array::from_fn(|_| FrameReader::with_limit(RESPONSE_CAPACITY)),
            phase: Phase::Idle { since_ms: None },
            cycles: 0,
        }
    }
}

impl<B: ChannelBank, P: SetDutyCycle, T: Tachometer> EndpointPoller<B, P, T> {
    /// Sample `tach` every `interval_ms`, starting with the first tick.
    pub fn with_tachometer<U: Tachometer>(
        self,
        tach: U,
        interval_ms: u32,
    ) -> EndpointPoller<B, P, U> {
        EndpointPoller {
            bank: self.bank,
            fan: self.fan,
            tach,
            tach_interval_ms: interval_ms,
            tach_sampled_ms: None,
            rpm: None,
            table: self.table,
            curve: self.curve,
            config: self.config,
            readers: self.readers,
            phase: self.phase,
            cycles: self.cycles,
        }
    }

    /// Drive the fan to the curve floor before the first cycle.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        info!(
            "POLL: {} endpoints, interval {} ms, timeout {} ms",
            self.table.len(),
            self.config.poll_interval_ms,
            self.config.response_timeout_ms
        );
        self.actuate(sink);
    }

    /// Advance the state machine by one step.
    pub fn tick(
        &mut self,
        clock: &impl Clock,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) -> PollPhase {
        let now = clock.now_ms();
        self.sample_tach(now);
        match self.phase {
            Phase::Idle { since_ms } => {
                let due = since_ms.is_none_or(|t| {
                    now.saturating_sub(t) >= u64::from(self.config.poll_interval_ms)
                });
                if due && !self.table.is_empty() {
                    debug!("POLL: starting sequence");
                    self.begin_exchange(0, clock, delay, sink);
                }
            }
            Phase::Awaiting { index, sent_ms } => {
                if let Some(frame) = self.receive(index) {
                    self.handle_reply(index, &frame, now, sink);
                    self.advance(index, clock, delay, sink);
                } else if now.saturating_sub(sent_ms)
                    >= u64::from(self.config.response_timeout_ms)
                {
                    self.handle_miss(index, sink);
                    self.advance(index, clock, delay, sink);
                }
            }
        }
        self.phase()
    }

    pub fn phase(&self) -> PollPhase {
        match self.phase {
            Phase::Idle { .. } => PollPhase::Idle,
            Phase::Awaiting { index, .. } => PollPhase::Awaiting(index),
        }
    }

    pub fn table(&self) -> &EndpointTable {
        &self.table
    }

    /// Duty currently applied to the fan.
    pub fn applied_duty(&self) -> Option<u8> {
        self.fan.applied()
    }

    pub fn fan(&self) -> &FanDriver<P> {
        &self.fan
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    /// Completed polling cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Last tachometer sample.
    pub fn rpm(&self) -> Option<u32> {
        self.rpm
    }

    pub fn tachometer(&self) -> &T {
        &self.tach
    }

    fn sample_tach(&mut self, now: u64) {
        let due = self
            .tach_sampled_ms
            .is_none_or(|t| now.saturating_sub(t) >= u64::from(self.tach_interval_ms));
        if !due {
            return;
        }
        self.tach_sampled_ms = Some(now);
        self.rpm = self.tach.read_rpm();
        if let Some(rpm) = self.rpm {
            debug!("FAN: {} RPM", rpm);
        }
    }

    // ── Exchange steps ────────────────────────────────────────

    /// ActivateChannel → SettleDelay → DrainStale → SendRequest.
    fn begin_exchange(
        &mut self,
        index: usize,
        clock: &impl Clock,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) {
        if let Err(e) = self.bank.listen(index) {
            debug!("POLL[{}]: cannot activate channel: {}", index + 1, e);
            self.handle_miss(index, sink);
            return self.advance(index, clock, delay, sink);
        }
        delay.delay_ms(self.config.settle_delay_ms);

        self.readers[index].reset();
        let mut stale = 0usize;
        while stale < DRAIN_LIMIT {
            match self.bank.read_byte() {
                Ok(Some(_)) => stale += 1,
                Ok(None) | Err(_) => break,
            }
        }
        if stale > 0 {
            debug!("POLL[{}]: drained {} stale bytes", index + 1, stale);
        }

        let sent = self
            .bank
            .write_all(POLL_REQUEST)
            .and_then(|()| self.bank.flush());
        if let Err(e) = sent {
            warn!("POLL[{}]: send failed: {}", index + 1, e);
            self.handle_miss(index, sink);
            return self.advance(index, clock, delay, sink);
        }

        debug!("POLL[{}]: sent POLL", index + 1);
        self.phase = Phase::Awaiting {
            index,
            sent_ms: clock.now_ms(),
        };
    }

    /// Pull what is ready on the active channel; return a completed line.
    fn receive(&mut self, index: usize) -> Option<Frame> {
        for _ in 0..RX_BUDGET {
            match self.bank.read_byte() {
                Ok(Some(byte)) => {
                    if let Some(frame) = self.readers[index].feed(&[byte]) {
                        return Some(frame);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("POLL[{}]: read failed: {}", index + 1, e);
                    break;
                }
            }
        }
        None
    }

    fn handle_reply(&mut self, index: usize, frame: &[u8], now: u64, sink: &mut impl EventSink) {
        let text = String::from_utf8_lossy(frame);
        match decode_response(&text) {
            Ok(readings) => {
                debug!(
                    "POLL[{}]: CPU {:.2} °C, NVME {:.2} °C",
                    index + 1,
                    readings.cpu,
                    readings.nvme
                );
                self.table.record_reading(index, readings, now);
                sink.emit(&ControlEvent::EndpointUpdated { index, readings });
                self.actuate(sink);
            }
            Err(error) => {
                warn!("POLL[{}]: unexpected reply {:?}: {}", index + 1, text, error);
                sink.emit(&ControlEvent::MalformedReply { index, error });
            }
        }
    }

    fn handle_miss(&mut self, index: usize, sink: &mut impl EventSink) {
        let disconnected = self.table.record_miss(index);
        let Some(slot) = self.table.get(index).copied() else {
            return;
        };
        debug!("POLL[{}]: no response (missed {})", index + 1, slot.missed);
        if disconnected {
            warn!(
                "POLL[{}]: disconnected after {} missed polls",
                index + 1,
                slot.missed
            );
            sink.emit(&ControlEvent::EndpointDisconnected {
                index,
                missed: slot.missed,
                last: slot.readings(),
            });
            self.actuate(sink);
        }
    }

    /// Move to the next endpoint, or close the cycle after the last one.
    fn advance(
        &mut self,
        index: usize,
        clock: &impl Clock,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) {
        let next = index + 1;
        if next < self.table.len() {
            return self.begin_exchange(next, clock, delay, sink);
        }
        self.cycles += 1;
        debug!("POLL: completed polling all endpoints");
        sink.emit(&ControlEvent::CycleComplete(CycleSummary {
            endpoints: self.table.snapshot(),
            rpm: self.rpm,
        }));
        self.phase = Phase::Idle {
            since_ms: Some(clock.now_ms()),
        };
    }

    /// Recompute the duty from the worst readings and push it if it changed.
    fn actuate(&mut self, sink: &mut impl EventSink) {
        let worst = self.table.worst();
        let duty = self.curve.duty(worst);
        match self.fan.apply(duty) {
            Ok(true) => sink.emit(&ControlEvent::FanChanged(FanReport {
                duty,
                percent: duty_percent(duty),
                worst,
                statuses: self.table.statuses(),
                rpm: self.rpm,
            })),
            Ok(false) => {}
            Err(e) => warn!("FAN: duty write failed: {:?}", e),
        }
    }
}
