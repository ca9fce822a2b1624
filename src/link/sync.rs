//! Byte-alignment recovery for a freshly opened or suspect link.
//!
//! A link without framing cannot tell a half-received line from a whole
//! one by looking at it. Instead we force both ends to empty their
//! queues: flush locally, nudge the peer with bare terminators so any
//! partial line it was sending gets closed off, then drain and discard
//! whatever comes back. Every wait is bounded, so the whole procedure
//! finishes in a few seconds at worst.

use embedded_hal::delay::DelayNs;
use log::{debug, trace};

use super::Link;
use super::frame::FrameReader;

/// Timing and repetition knobs for [`LinkSync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Initial flush repetitions (UART FIFOs may need several).
    pub flush_rounds: u32,
    pub flush_gap_ms: u32,
    /// Bytes written to close off a partial line on the peer.
    pub nudge: &'static [u8],
    /// Time given to the peer to react to the nudge.
    pub nudge_wait_ms: u32,
    pub settle_ms: u32,
    /// Upper bound on drain iterations.
    pub drain_attempts: u32,
    /// Readiness wait per drain iteration.
    pub drain_wait_ms: u32,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            flush_rounds: 5,
            flush_gap_ms: 200,
            nudge: b"\n\n\n",
            nudge_wait_ms: 300,
            settle_ms: 100,
            drain_attempts: 20,
            drain_wait_ms: 100,
        }
    }
}

/// What a resync threw away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub drained_bytes: usize,
    pub drain_rounds: u32,
}

/// Flush / nudge / drain procedure.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkSync {
    policy: SyncPolicy,
}

impl LinkSync {
    pub fn new(policy: SyncPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    /// Resynchronize `link` and clear `reader`.
    ///
    /// Blocks for a bounded time. Any transport error aborts the
    /// procedure; the caller treats that like any other link failure.
    pub fn resynchronize<L: Link>(
        &self,
        link: &mut L,
        reader: &mut FrameReader,
        delay: &mut impl DelayNs,
    ) -> Result<SyncReport, L::Error> {
        let p = &self.policy;
        debug!("SYNC: starting recovery");

        for _ in 0..p.flush_rounds {
            link.discard_buffers()?;
            delay.delay_ms(p.flush_gap_ms);
        }

        link.write_all(p.nudge)?;
        link.flush()?;
        delay.delay_ms(p.nudge_wait_ms);

        link.discard_buffers()?;
        delay.delay_ms(p.settle_ms);

        let mut report = SyncReport::default();
        let mut scratch = [0u8; 256];
        while report.drain_rounds < p.drain_attempts {
            let n = link.read(
                &mut scratch,
                core::time::Duration::from_millis(u64::from(p.drain_wait_ms)),
            )?;
            if n == 0 {
                break;
            }
            trace!("SYNC: discarded {:?}", String::from_utf8_lossy(&scratch[..n]));
            report.drained_bytes += n;
            report.drain_rounds += 1;
        }

        link.discard_buffers()?;
        delay.delay_ms(p.settle_ms);
        link.discard_buffers()?;
        delay.delay_ms(p.settle_ms / 2);

        reader.reset();
        debug!(
            "SYNC: recovery complete ({} bytes in {} rounds)",
            report.drained_bytes, report.drain_rounds
        );
        Ok(report)
    }
}
