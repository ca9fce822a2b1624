//! Linux sysfs PWM adapter.
//!
//! Drives `/sys/class/pwm/pwmchipN/pwmM` through the
//! [`SetDutyCycle`] trait. The duty cycle is written in nanoseconds of
//! the configured period.

use std::fs;
use std::path::{Path, PathBuf};

use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use log::info;

use crate::config::PwmConfig;
use crate::error::PwmError;

pub const SYSFS_PWM_ROOT: &str = "/sys/class/pwm";

pub struct SysfsPwm {
    dir: PathBuf,
    period_ns: u32,
}

impl SysfsPwm {
    pub fn open(config: &PwmConfig) -> Result<Self, PwmError> {
        Self::open_at(Path::new(SYSFS_PWM_ROOT), config)
    }

    /// Export (if needed), set the period, start at 0 % and enable.
    pub fn open_at(root: &Path, config: &PwmConfig) -> Result<Self, PwmError> {
        let chip = root.join(format!("pwmchip{}", config.chip));
        let dir = chip.join(format!("pwm{}", config.channel));
        if !dir.exists() {
            fs::write(chip.join("export"), config.channel.to_string())
                .map_err(|e| PwmError::Setup(e.kind()))?;
        }

        let pwm = Self {
            dir,
            period_ns: config.period_ns,
        };
        pwm.write_attr("period", config.period_ns)
            .map_err(|e| PwmError::Setup(e.kind()))?;
        pwm.write_attr("duty_cycle", 0)
            .map_err(|e| PwmError::Setup(e.kind()))?;
        pwm.write_attr("enable", 1)
            .map_err(|e| PwmError::Setup(e.kind()))?;
        info!(
            "FAN: {} enabled, period {} ns",
            pwm.dir.display(),
            config.period_ns
        );
        Ok(pwm)
    }

    fn write_attr(&self, name: &str, value: u32) -> std::io::Result<()> {
        fs::write(self.dir.join(name), value.to_string())
    }
}

impl ErrorType for SysfsPwm {
    type Error = PwmError;
}

impl SetDutyCycle for SysfsPwm {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), PwmError> {
        let ns = u64::from(self.period_ns) * u64::from(duty) / u64::from(u16::MAX);
        self.write_attr("duty_cycle", ns as u32)
            .map_err(|e| PwmError::WriteFailed(e.kind()))
    }
}
