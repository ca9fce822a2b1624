//! Receiver loop (endpoint side).
//!
//! Runs one [`ConnectionSupervisor`] against the link to the controller
//! and answers every `POLL` with the current local readings. Anything
//! else on the line is noise to be logged and ignored.

use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::link::LinkOpener;
use crate::link::supervisor::{ConnectionSupervisor, LinkEvent, LinkMode};
use crate::protocol::{Readings, Request, encode_response};

use super::ports::{Metric, ReadingSource};

pub struct Responder<O: LinkOpener, S> {
    supervisor: ConnectionSupervisor<O>,
    source: S,
    answered: u64,
}

impl<O: LinkOpener, S: ReadingSource> Responder<O, S> {
    pub fn new(supervisor: ConnectionSupervisor<O>, source: S) -> Self {
        Self {
            supervisor,
            source,
            answered: 0,
        }
    }

    /// One supervisor cycle plus dispatch of whatever frame it produced.
    pub fn step(&mut self, delay: &mut impl DelayNs) -> LinkEvent {
        let event = self.supervisor.poll(delay);
        if let LinkEvent::Frame(frame) = &event {
            self.dispatch(frame, delay);
        }
        event
    }

    /// Loop until `running` is cleared. The flag is checked once per
    /// cycle, so shutdown waits for the current read to finish.
    pub fn run(&mut self, running: &AtomicBool, delay: &mut impl DelayNs) {
        while running.load(Ordering::Relaxed) {
            self.step(delay);
        }
        info!("LINK: shutting down after {} replies", self.answered);
        self.supervisor.shutdown();
    }

    pub fn supervisor(&self) -> &ConnectionSupervisor<O> {
        &self.supervisor
    }

    /// Replies sent since construction.
    pub fn answered(&self) -> u64 {
        self.answered
    }

    fn dispatch(&mut self, frame: &[u8], delay: &mut impl DelayNs) {
        match Request::parse(frame) {
            Request::Poll => {
                self.supervisor.record_exchange();
                self.reply(delay);
            }
            Request::Empty => {}
            Request::Unknown => {
                let text = String::from_utf8_lossy(frame);
                if self.supervisor.mode() == LinkMode::StartupResync {
                    debug!("LINK: ignoring {:?} during resync", text.trim());
                } else {
                    debug!("LINK: unknown command {:?}", text.trim());
                }
            }
        }
    }

    fn reply(&mut self, delay: &mut impl DelayNs) {
        let cpu = self.source.read(Metric::Cpu);
        let nvme = self.source.read(Metric::Nvme);
        if !(cpu.valid && nvme.valid) {
            debug!(
                "LINK: sending fallback readings (cpu valid={}, nvme valid={})",
                cpu.valid, nvme.valid
            );
        }

        let line = match encode_response(&Readings {
            cpu: cpu.value,
            nvme: nvme.value,
        }) {
            Ok(line) => line,
            Err(e) => {
                warn!("LINK: cannot encode reply: {}", e);
                return;
            }
        };

        if self.supervisor.send(line.as_bytes(), delay) {
            self.answered += 1;
            debug!("LINK: sent {:?}", line.trim_end());
        }
    }
}
