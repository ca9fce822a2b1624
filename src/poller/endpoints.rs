//! Per-endpoint reading records.
//!
//! One slot per configured endpoint, created up front and never removed.
//! A slot remembers its last readings even after it is marked
//! disconnected; the worst-of computation keeps using them.

use crate::config::MAX_ENDPOINTS;
use crate::protocol::Readings;

/// How an endpoint shows up in fan reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointStatus {
    /// Answering polls.
    On,
    /// Not answering, last readings still in use.
    OffSaved,
    /// Never reported anything usable.
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoint {
    pub cpu: f32,
    pub nvme: f32,
    /// Set once the first reply was decoded; never cleared.
    pub valid: bool,
    /// Clock time of the last decoded reply.
    pub updated_ms: u64,
    /// Consecutive polls without an answer.
    pub missed: u32,
    pub connected: bool,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            cpu: 0.0,
            nvme: 0.0,
            valid: false,
            updated_ms: 0,
            missed: 0,
            connected: false,
        }
    }
}

impl Endpoint {
    pub fn readings(&self) -> Option<Readings> {
        self.valid.then_some(Readings {
            cpu: self.cpu,
            nvme: self.nvme,
        })
    }

    pub fn status(&self) -> EndpointStatus {
        if self.connected {
            EndpointStatus::On
        } else if self.valid && (self.cpu > 0.0 || self.nvme > 0.0) {
            EndpointStatus::OffSaved
        } else {
            EndpointStatus::Off
        }
    }
}

pub type StatusList = heapless::Vec<EndpointStatus, MAX_ENDPOINTS>;

/// Fixed table of endpoint slots.
#[derive(Debug, Clone)]
pub struct EndpointTable {
    slots: heapless::Vec<Endpoint, MAX_ENDPOINTS>,
    max_missed: u32,
}

impl EndpointTable {
    /// `count` is capped at [`MAX_ENDPOINTS`].
    pub fn new(count: usize, max_missed: u32) -> Self {
        let mut slots = heapless::Vec::new();
        for _ in 0..count.min(MAX_ENDPOINTS) {
            // Cannot fail: bounded by the loop above.
            let _ = slots.push(Endpoint::default());
        }
        Self { slots, max_missed }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Endpoint> {
        self.slots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.slots.iter()
    }

    pub fn snapshot(&self) -> heapless::Vec<Endpoint, MAX_ENDPOINTS> {
        self.slots.clone()
    }

    /// A decoded reply: store it, mark connected, clear the miss streak.
    pub fn record_reading(&mut self, index: usize, readings: Readings, now_ms: u64) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.cpu = readings.cpu;
            slot.nvme = readings.nvme;
            slot.valid = true;
            slot.updated_ms = now_ms;
            slot.missed = 0;
            slot.connected = true;
        }
    }

    /// A poll went unanswered. Returns `true` only on the transition from
    /// connected to disconnected; readings are left as they were.
    pub fn record_miss(&mut self, index: usize) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        slot.missed = slot.missed.saturating_add(1);
        if slot.connected && slot.missed >= self.max_missed {
            slot.connected = false;
            return true;
        }
        false
    }

    /// Highest CPU and highest NVMe reading over every valid slot,
    /// connected or not. `None` if no slot has ever reported.
    pub fn worst(&self) -> Option<(f32, f32)> {
        self.slots
            .iter()
            .filter(|s| s.valid)
            .fold(None, |acc, s| match acc {
                None => Some((s.cpu, s.nvme)),
                Some((cpu, nvme)) => Some((f32::max(cpu, s.cpu), f32::max(nvme, s.nvme))),
            })
    }

    pub fn statuses(&self) -> StatusList {
        self.slots.iter().map(Endpoint::status).collect()
    }
}
