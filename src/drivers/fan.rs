//! 4-pin PWM fan driver.
//!
//! Thin change-detecting wrapper over any
//! [`SetDutyCycle`](embedded_hal::pwm::SetDutyCycle) channel. Duty is
//! expressed on the 0-255 scale used by the control curve and mapped onto
//! the channel's own resolution by `set_duty_cycle_fraction`.
//!
//! Only actual changes reach the hardware; re-applying the current duty
//! is a no-op.

use embedded_hal::pwm::SetDutyCycle;
use log::debug;

/// Full-scale duty.
pub const DUTY_MAX: u8 = 255;

pub struct FanDriver<P> {
    pwm: P,
    applied: Option<u8>,
}

impl<P: SetDutyCycle> FanDriver<P> {
    pub fn new(pwm: P) -> Self {
        Self { pwm, applied: None }
    }

    /// Write `duty` if it differs from the last applied value.
    ///
    /// Returns `Ok(true)` if the hardware was written. A failed write
    /// leaves the previous value recorded so the next call retries.
    pub fn apply(&mut self, duty: u8) -> Result<bool, P::Error> {
        if self.applied == Some(duty) {
            return Ok(false);
        }
        self.pwm
            .set_duty_cycle_fraction(u16::from(duty), u16::from(DUTY_MAX))?;
        debug!("FAN: duty {:?} -> {}", self.applied, duty);
        self.applied = Some(duty);
        Ok(true)
    }

    /// Last successfully written duty.
    pub fn applied(&self) -> Option<u8> {
        self.applied
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }
}
