//! Shell-command reading source.
//!
//! Runs the configured commands through `sh -c` on every request.
//!
//! - CPU: first line of output, `temp=XX.X'C` (vcgencmd style).
//! - NVMe: first line starting with `Temperature:` (smartctl style).
//!
//! A failed command, an unparsable line or an out-of-range value yields
//! an invalid reading carrying the fallback value for that metric.

use std::process::Command;

use log::{debug, warn};

use crate::app::ports::{Metric, Reading, ReadingSource};

pub const CPU_FALLBACK: f32 = 61.0;
pub const NVME_FALLBACK: f32 = 59.0;

const CPU_RANGE: (f32, f32) = (0.0, 120.0);
const NVME_RANGE: (f32, f32) = (0.0, 150.0);

pub struct CommandSource {
    cpu_command: String,
    nvme_command: String,
}

impl CommandSource {
    pub fn new(cpu_command: impl Into<String>, nvme_command: impl Into<String>) -> Self {
        Self {
            cpu_command: cpu_command.into(),
            nvme_command: nvme_command.into(),
        }
    }
}

impl ReadingSource for CommandSource {
    fn read(&mut self, metric: Metric) -> Reading {
        let (command, parse, fallback): (&str, fn(&str) -> Option<f32>, f32) = match metric {
            Metric::Cpu => (self.cpu_command.as_str(), parse_cpu_output, CPU_FALLBACK),
            Metric::Nvme => (self.nvme_command.as_str(), parse_nvme_output, NVME_FALLBACK),
        };

        match run(command).as_deref().and_then(parse) {
            Some(value) => Reading { value, valid: true },
            None => {
                debug!("{:?} reading unavailable, using {:.1}", metric, fallback);
                Reading {
                    value: fallback,
                    valid: false,
                }
            }
        }
    }
}

fn run(command: &str) -> Option<String> {
    match Command::new("sh").arg("-c").arg(command).output() {
        Ok(out) => Some(String::from_utf8_lossy(&out.stdout).into_owned()),
        Err(e) => {
            warn!("failed to run {:?}: {}", command, e);
            None
        }
    }
}

/// `temp=48.3'C` on the first line.
pub fn parse_cpu_output(output: &str) -> Option<f32> {
    let line = output.lines().next()?;
    let (_, rest) = line.split_once("temp=")?;
    leading_number(rest).filter(|&t| in_range(t, CPU_RANGE))
}

/// First `Temperature:` line whose value is in range.
pub fn parse_nvme_output(output: &str) -> Option<f32> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix("Temperature:"))
        .filter_map(|rest| leading_number(rest.trim_start()))
        .find(|&t| in_range(t, NVME_RANGE))
}

fn in_range(value: f32, (low, high): (f32, f32)) -> bool {
    value > low && value < high
}

/// Longest numeric prefix of `s`, e.g. `"41 Celsius"` -> 41.0.
fn leading_number(s: &str) -> Option<f32> {
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse().ok()
}
