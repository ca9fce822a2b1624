//! Power-curve mapping from temperature to fan duty.
//!
//! ```text
//!  ceiling ┤                 ╭──────
//!          │                ╱
//!          │              ╱
//!          │          ╱‾‾
//!    floor ┼───────╯
//!          └───────┬────────┬────── reading
//!                 low      high
//! ```
//!
//! Between `low` and `high` the normalized ratio is raised to `exponent`
//! before scaling, so exponents above 1 keep the fan quiet through
//! moderate readings and ramp hard close to `high`.

use crate::config::{CurveConfig, MetricCurve};

impl MetricCurve {
    /// Output for one metric, always within `[floor, ceiling]`.
    ///
    /// A NaN reading maps to `floor`.
    pub fn evaluate(&self, value: f32) -> f32 {
        if value.is_nan() || value <= self.low {
            return self.floor;
        }
        if value >= self.high {
            return self.ceiling;
        }
        let ratio = (value - self.low) / (self.high - self.low);
        let out = self.floor + ratio.powf(self.exponent) * (self.ceiling - self.floor);
        out.clamp(self.floor, self.ceiling)
    }
}

/// Two-metric actuator curve: the hotter of the two wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorCurve {
    config: CurveConfig,
}

impl ActuatorCurve {
    pub fn new(config: CurveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CurveConfig {
        &self.config
    }

    /// `max(cpu curve(primary), nvme curve(secondary))`.
    pub fn compute(&self, primary_worst: f32, secondary_worst: f32) -> f32 {
        let cpu = self.config.cpu.evaluate(primary_worst);
        let nvme = self.config.nvme.evaluate(secondary_worst);
        cpu.max(nvme)
    }

    /// Output with no reading ever received.
    pub fn floor(&self) -> f32 {
        self.config.cpu.floor.max(self.config.nvme.floor)
    }

    /// Duty (0-255) for the worst readings, or the floor if there are none.
    /// Fractions are truncated.
    pub fn duty(&self, worst: Option<(f32, f32)>) -> u8 {
        let out = match worst {
            Some((cpu, nvme)) => self.compute(cpu, nvme),
            None => self.floor(),
        };
        out.clamp(0.0, 255.0) as u8
    }
}

/// Duty as a whole percentage of full scale.
pub fn duty_percent(duty: u8) -> u8 {
    (u16::from(duty) * 100 / 255) as u8
}
