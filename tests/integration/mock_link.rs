//! Mock transports for integration tests.
//!
//! Scripted links and openers for the receiver side, a simulated channel
//! bank for the poller, a shared simulated clock, and recording PWM /
//! event sinks. Nothing here touches a real device or sleeps.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use fanlink::app::events::ControlEvent;
use fanlink::app::ports::{Clock, EventSink, Metric, Reading, ReadingSource, Tachometer};
use fanlink::link::{Link, LinkOpener};
use fanlink::poller::channels::ChannelBank;

// ── Simulated time ────────────────────────────────────────────

/// Shared simulated time. Clone one handle for the clock and one for the
/// delay; delays advance the clock.
#[derive(Clone, Default)]
pub struct SimTime {
    nanos: Rc<Cell<u64>>,
}

#[allow(dead_code)]
impl SimTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_ms(&self, ms: u64) {
        self.nanos.set(self.nanos.get() + ms * 1_000_000);
    }
}

impl Clock for SimTime {
    fn now_ms(&self) -> u64 {
        self.nanos.get() / 1_000_000
    }
}

impl DelayNs for SimTime {
    fn delay_ns(&mut self, ns: u32) {
        self.nanos.set(self.nanos.get() + u64::from(ns));
    }
}

// ── Scripted point-to-point link ──────────────────────────────

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum ReadStep {
    Data(Vec<u8>),
    Timeout,
    Fail,
}

/// State shared between a [`MockOpener`] and every link it hands out.
#[derive(Default)]
pub struct LinkScript {
    pub reads: VecDeque<ReadStep>,
    pub written: Vec<u8>,
    pub discards: u32,
    pub dead: bool,
    pub fail_writes: bool,
    pub fail_opens: u32,
    pub opens: u32,
    pub live_handles: u32,
    pub max_live_handles: u32,
    /// Queued for reading whenever a full `POLL\r\n` is written.
    pub reply: Option<Vec<u8>>,
}

pub type SharedScript = Rc<RefCell<LinkScript>>;

#[allow(dead_code)]
pub fn push_reads(script: &SharedScript, steps: impl IntoIterator<Item = ReadStep>) {
    script.borrow_mut().reads.extend(steps);
}

pub struct MockLink {
    script: SharedScript,
}

impl Drop for MockLink {
    fn drop(&mut self) {
        self.script.borrow_mut().live_handles -= 1;
    }
}

impl Link for MockLink {
    type Error = &'static str;

    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, &'static str> {
        let mut s = self.script.borrow_mut();
        match s.reads.pop_front() {
            Some(ReadStep::Data(mut data)) => {
                if data.len() > buf.len() {
                    let rest = data.split_off(buf.len());
                    s.reads.push_front(ReadStep::Data(rest));
                }
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            Some(ReadStep::Fail) => Err("read failed"),
            Some(ReadStep::Timeout) | None => Ok(0),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), &'static str> {
        let mut s = self.script.borrow_mut();
        if s.fail_writes {
            return Err("write failed");
        }
        s.written.extend_from_slice(data);
        if data == b"POLL\r\n" {
            if let Some(reply) = s.reply.clone() {
                s.reads.push_back(ReadStep::Data(reply));
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), &'static str> {
        Ok(())
    }

    fn discard_buffers(&mut self) -> Result<(), &'static str> {
        self.script.borrow_mut().discards += 1;
        Ok(())
    }

    fn is_alive(&mut self) -> bool {
        !self.script.borrow().dead
    }
}

pub struct MockOpener {
    pub script: SharedScript,
}

#[allow(dead_code)]
impl MockOpener {
    pub fn new() -> (Self, SharedScript) {
        let script = SharedScript::default();
        (
            Self {
                script: Rc::clone(&script),
            },
            script,
        )
    }
}

impl LinkOpener for MockOpener {
    type Link = MockLink;
    type Error = &'static str;

    fn open(&mut self) -> Result<MockLink, &'static str> {
        let mut s = self.script.borrow_mut();
        if s.fail_opens > 0 {
            s.fail_opens -= 1;
            return Err("no such device");
        }
        s.opens += 1;
        s.live_handles += 1;
        s.max_live_handles = s.max_live_handles.max(s.live_handles);
        Ok(MockLink {
            script: Rc::clone(&self.script),
        })
    }

    fn describe(&self) -> &str {
        "mock0"
    }
}

// ── Reading source ────────────────────────────────────────────

pub struct FixedSource {
    pub cpu: Reading,
    pub nvme: Reading,
}

#[allow(dead_code)]
impl FixedSource {
    pub fn valid(cpu: f32, nvme: f32) -> Self {
        Self {
            cpu: Reading {
                value: cpu,
                valid: true,
            },
            nvme: Reading {
                value: nvme,
                valid: true,
            },
        }
    }
}

impl ReadingSource for FixedSource {
    fn read(&mut self, metric: Metric) -> Reading {
        match metric {
            Metric::Cpu => self.cpu,
            Metric::Nvme => self.nvme,
        }
    }
}

// ── Simulated channel bank ────────────────────────────────────

/// One simulated endpoint behind a channel.
#[derive(Default)]
pub struct SimChannel {
    /// Line sent back whenever a full `POLL\r\n` arrives; `None` = silent.
    pub reply: Option<Vec<u8>>,
    /// Bytes waiting to be read by the controller.
    pub rx: VecDeque<u8>,
    /// Everything the controller wrote to this channel.
    pub written: Vec<u8>,
}

pub struct SimBank {
    pub channels: Vec<SimChannel>,
    pub active: Option<usize>,
    pub listen_calls: Vec<usize>,
}

#[allow(dead_code)]
impl SimBank {
    pub fn new(count: usize) -> Self {
        Self {
            channels: (0..count).map(|_| SimChannel::default()).collect(),
            active: None,
            listen_calls: Vec::new(),
        }
    }

    pub fn replying(replies: &[Option<&str>]) -> Self {
        let mut bank = Self::new(replies.len());
        for (ch, reply) in bank.channels.iter_mut().zip(replies) {
            ch.reply = reply.map(|r| r.as_bytes().to_vec());
        }
        bank
    }
}

impl ChannelBank for SimBank {
    type Error = &'static str;

    fn len(&self) -> usize {
        self.channels.len()
    }

    fn listen(&mut self, index: usize) -> Result<(), &'static str> {
        if index >= self.channels.len() {
            return Err("no such channel");
        }
        self.listen_calls.push(index);
        self.active = Some(index);
        Ok(())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, &'static str> {
        let i = self.active.ok_or("no active channel")?;
        Ok(self.channels[i].rx.pop_front())
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), &'static str> {
        let i = self.active.ok_or("no active channel")?;
        let ch = &mut self.channels[i];
        ch.written.extend_from_slice(data);
        if data == b"POLL\r\n" {
            if let Some(reply) = &ch.reply {
                ch.rx.extend(reply.iter().copied());
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), &'static str> {
        Ok(())
    }
}

// ── Tachometer ────────────────────────────────────────────────

/// Hands out queued samples, then `None`.
#[derive(Default)]
pub struct ScriptedTach {
    pub samples: VecDeque<Option<u32>>,
    pub reads: u32,
}

impl Tachometer for ScriptedTach {
    fn read_rpm(&mut self) -> Option<u32> {
        self.reads += 1;
        self.samples.pop_front().flatten()
    }
}

// ── PWM + events ──────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingPwm {
    pub writes: Vec<u16>,
}

impl ErrorType for RecordingPwm {
    type Error = core::convert::Infallible;
}

impl SetDutyCycle for RecordingPwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.writes.push(duty);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<ControlEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&ControlEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &ControlEvent) {
        self.events.push(event.clone());
    }
}
