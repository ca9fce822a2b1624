//! Linux hwmon tachometer adapter.
//!
//! Reads `/sys/class/hwmon/hwmonN/fanM_input`, which the kernel keeps at
//! the current fan speed in RPM.

use std::fs;
use std::path::PathBuf;

use log::debug;

use crate::app::ports::Tachometer;

pub struct HwmonTach {
    input: PathBuf,
}

impl HwmonTach {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

impl Tachometer for HwmonTach {
    fn read_rpm(&mut self) -> Option<u32> {
        match fs::read_to_string(&self.input) {
            Ok(text) => {
                let rpm = text.trim().parse().ok();
                if rpm.is_none() {
                    debug!("FAN: unexpected tach value {:?}", text.trim());
                }
                rpm
            }
            Err(e) => {
                debug!("FAN: cannot read {}: {}", self.input.display(), e);
                None
            }
        }
    }
}
