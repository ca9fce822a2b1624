//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by rendering every [`ControlEvent`] as one or
//! more single-line log records.

use core::fmt::Write;

use log::{info, warn};

use crate::app::events::ControlEvent;
use crate::app::ports::EventSink;
use crate::poller::endpoints::EndpointStatus;

#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ControlEvent) {
        match event {
            ControlEvent::EndpointUpdated { index, readings } => {
                info!(
                    "POLL[{}]: CPU={:.2}\u{00b0}C NVME={:.2}\u{00b0}C",
                    index + 1,
                    readings.cpu,
                    readings.nvme
                );
            }
            ControlEvent::EndpointDisconnected {
                index,
                missed,
                last,
            } => match last {
                Some(r) => warn!(
                    "POLL[{}]: disconnected (missed={}), keeping CPU={:.2}\u{00b0}C NVME={:.2}\u{00b0}C",
                    index + 1,
                    missed,
                    r.cpu,
                    r.nvme
                ),
                None => warn!("POLL[{}]: disconnected (missed={})", index + 1, missed),
            },
            ControlEvent::MalformedReply { index, error } => {
                warn!("POLL[{}]: bad reply: {}", index + 1, error);
            }
            ControlEvent::FanChanged(report) => {
                let mut devices = String::new();
                for (i, status) in report.statuses.iter().enumerate() {
                    let tag = match status {
                        EndpointStatus::On => "ON",
                        EndpointStatus::OffSaved => "OFF(saved)",
                        EndpointStatus::Off => "OFF",
                    };
                    let sep = if i > 0 { "," } else { "" };
                    let _ = write!(devices, "{sep}{}:{tag}", i + 1);
                }
                if let Some(rpm) = report.rpm {
                    let _ = write!(devices, " | {rpm} RPM");
                }
                match report.worst {
                    Some((cpu, nvme)) => info!(
                        "FAN: PWM {} ({}%) | CPU {:.2}\u{00b0}C NVME {:.2}\u{00b0}C | devices {}",
                        report.duty, report.percent, cpu, nvme, devices
                    ),
                    None => info!(
                        "FAN: PWM {} ({}%) | no readings, floor | devices {}",
                        report.duty, report.percent, devices
                    ),
                }
            }
            ControlEvent::CycleComplete(summary) => {
                info!("=== Temperature summary ===");
                for (i, ep) in summary.endpoints.iter().enumerate() {
                    if ep.connected {
                        info!(
                            "  {}: CPU={:.2}\u{00b0}C NVME={:.2}\u{00b0}C missed={}",
                            i + 1,
                            ep.cpu,
                            ep.nvme,
                            ep.missed
                        );
                    } else {
                        info!(
                            "  {}: not connected (missed={}, last CPU={:.2}\u{00b0}C NVME={:.2}\u{00b0}C)",
                            i + 1,
                            ep.missed,
                            ep.cpu,
                            ep.nvme
                        );
                    }
                }
                if let Some(rpm) = summary.rpm {
                    info!("  fan: {} RPM", rpm);
                }
            }
        }
    }
}
