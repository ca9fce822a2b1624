//! Port traits — the boundary between protocol logic and the host.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Responder / EndpointPoller
//! ```
//!
//! Adapters (shell commands, clocks, hwmon, log output, config files) implement
//! these traits. The loops consume them via generics, so nothing in the
//! core touches the OS directly. Link-level ports live next to the code
//! that uses them: [`crate::link::Link`] and
//! [`crate::poller::channels::ChannelBank`].

use crate::config::ControllerConfig;
use crate::error::ConfigError;

use super::events::ControlEvent;

// ───────────────────────────────────────────────────────────────
// Reading source (receiver side)
// ───────────────────────────────────────────────────────────────

/// The two metrics carried in every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cpu,
    Nvme,
}

/// One sampled value. An invalid reading still carries a value (a
/// conservative fallback) so the peer always receives a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub value: f32,
    pub valid: bool,
}

pub trait ReadingSource {
    fn read(&mut self, metric: Metric) -> Reading;
}

// ───────────────────────────────────────────────────────────────
// Time
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since an arbitrary origin.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Fan speed readback (controller side)
// ───────────────────────────────────────────────────────────────

/// Measured fan speed. `None` when no measurement is available.
pub trait Tachometer {
    fn read_rpm(&mut self) -> Option<u32>;
}

/// For fans without a tach line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTachometer;

impl Tachometer for NoTachometer {
    fn read_rpm(&mut self) -> Option<u32> {
        None
    }
}

impl<T: Tachometer> Tachometer for Option<T> {
    fn read_rpm(&mut self) -> Option<u32> {
        self.as_mut().and_then(|t| t.read_rpm())
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink (controller side)
// ───────────────────────────────────────────────────────────────

/// The poller emits structured [`ControlEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &ControlEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration
// ───────────────────────────────────────────────────────────────

/// Loads controller configuration.
///
/// Implementations validate before returning; an invalid file is an
/// error, never silently clamped.
pub trait ConfigPort {
    fn load(&self) -> Result<ControllerConfig, ConfigError>;
}
