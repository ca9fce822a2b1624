//! Connection supervisor.
//!
//! Owns the link handle, runs one read cycle per [`poll`] call, and
//! decides when the link is dead enough to be torn down and reopened.
//!
//! ## Health policy
//!
//! | Observation          | Effect                                              |
//! |----------------------|-----------------------------------------------------|
//! | frame extracted      | errors = 0, timeouts = 0                            |
//! | request answered     | exchanges += 1 (wraps to 1 past 10), leave resync   |
//! | read/write failure   | errors += 1, exchanges = 0; at 5 → reopen + resync  |
//! | read timeout         | timeouts += 1 (normal on a quiet link)              |
//! | timeouts > 30 and no exchange since reset | check liveness; dead → reopen |
//!
//! Silence alone never triggers a reconnect: the peer may simply have
//! nothing to say. Only silence combined with a total absence of
//! successful exchanges gets a liveness check.
//!
//! [`poll`]: ConnectionSupervisor::poll

use core::fmt;
use core::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use super::frame::{Frame, FrameReader, Received};
use super::sync::LinkSync;
use super::{Link, LinkOpener};

/// Consecutive transport failures that force a reopen.
pub const ERROR_THRESHOLD: u32 = 5;

/// Consecutive timeouts after which a link with no exchanges gets a liveness check.
pub const PROBE_AFTER_TIMEOUTS: u32 = 30;

/// The exchange counter wraps back to 1 once it passes this value.
pub const EXCHANGE_WRAP: u32 = 10;

// ───────────────────────────────────────────────────────────────
// Counters
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Entered after every (re)open; unknown traffic is expected noise.
    StartupResync,
    Normal,
}

/// What the caller should do after recording an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    /// Check `Link::is_alive` and reopen if it fails.
    CheckAlive,
    Reconnect,
}

/// Pure health bookkeeping, no I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorState {
    consecutive_errors: u32,
    consecutive_timeouts: u32,
    successful_exchanges: u32,
    mode: LinkMode,
}

impl Default for SupervisorState {
    fn default() -> Self {
        Self::new()
    }
}

impl SupervisorState {
    pub fn new() -> Self {
        Self {
            consecutive_errors: 0,
            consecutive_timeouts: 0,
            successful_exchanges: 0,
            mode: LinkMode::StartupResync,
        }
    }

    /// Any complete frame proves the link carries data.
    pub fn record_frame(&mut self) {
        self.consecutive_errors = 0;
        self.consecutive_timeouts = 0;
    }

    /// A recognized request was answered. Returns `true` if this ended
    /// the startup resync phase.
    pub fn record_exchange(&mut self) -> bool {
        self.successful_exchanges += 1;
        if self.successful_exchanges > EXCHANGE_WRAP {
            self.successful_exchanges = 1;
        }
        let was_syncing = self.mode == LinkMode::StartupResync;
        self.mode = LinkMode::Normal;
        was_syncing
    }

    pub fn record_error(&mut self) -> Verdict {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.successful_exchanges = 0;
        if self.consecutive_errors >= ERROR_THRESHOLD {
            Verdict::Reconnect
        } else {
            Verdict::Continue
        }
    }

    pub fn record_timeout(&mut self) -> Verdict {
        self.consecutive_timeouts = self.consecutive_timeouts.saturating_add(1);
        if self.consecutive_timeouts > PROBE_AFTER_TIMEOUTS && self.successful_exchanges == 0 {
            Verdict::CheckAlive
        } else {
            Verdict::Continue
        }
    }

    /// Fresh handle: counters back to zero, back into resync.
    pub fn reset_after_reconnect(&mut self) {
        self.consecutive_errors = 0;
        self.consecutive_timeouts = 0;
        self.mode = LinkMode::StartupResync;
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn consecutive_timeouts(&self) -> u32 {
        self.consecutive_timeouts
    }

    pub fn successful_exchanges(&self) -> u32 {
        self.successful_exchanges
    }

    pub fn mode(&self) -> LinkMode {
        self.mode
    }
}

// ───────────────────────────────────────────────────────────────
// Supervisor
// ───────────────────────────────────────────────────────────────

/// Result of one [`ConnectionSupervisor::poll`] cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A complete frame arrived.
    Frame(Frame),
    /// Partial data arrived; nothing to dispatch yet.
    Pending,
    /// The read timed out.
    Idle,
    /// A transport failure was counted.
    Fault,
    /// The link was closed, reopened and resynchronized.
    Reconnected,
    /// There is no usable link; a reopen will be retried.
    Offline,
}

/// Waits used around reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorTiming {
    /// Pause before retrying after a failed reopen.
    pub reopen_backoff_ms: u32,
    /// Pause after a successful reopen before the first read.
    pub stabilize_ms: u32,
    /// Pause after a counted transport failure.
    pub error_pause_ms: u32,
}

impl Default for SupervisorTiming {
    fn default() -> Self {
        Self {
            reopen_backoff_ms: 5000,
            stabilize_ms: 500,
            error_pause_ms: 100,
        }
    }
}

/// Why the initial [`ConnectionSupervisor::connect`] failed.
#[derive(Debug)]
pub enum ConnectError<O, L> {
    Open(O),
    Sync(L),
}

impl<O: fmt::Display, L: fmt::Display> fmt::Display for ConnectError<O, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(e) => write!(f, "open failed: {e}"),
            Self::Sync(e) => write!(f, "resync failed: {e}"),
        }
    }
}

impl<O: fmt::Debug + fmt::Display, L: fmt::Debug + fmt::Display> std::error::Error
    for ConnectError<O, L>
{
}

/// Owns one physical link and keeps it healthy.
pub struct ConnectionSupervisor<O: LinkOpener> {
    opener: O,
    link: Option<O::Link>,
    reader: FrameReader,
    sync: LinkSync,
    state: SupervisorState,
    timing: SupervisorTiming,
    read_timeout: Duration,
    reconnects: u32,
}

impl<O: LinkOpener> ConnectionSupervisor<O> {
    pub fn new(opener: O, read_timeout: Duration) -> Self {
        Self {
            opener,
            link: None,
            reader: FrameReader::new(),
            sync: LinkSync::default(),
            state: SupervisorState::new(),
            timing: SupervisorTiming::default(),
            read_timeout,
            reconnects: 0,
        }
    }

    pub fn with_sync(mut self, sync: LinkSync) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_timing(mut self, timing: SupervisorTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Open and resynchronize the link for the first time.
    pub fn connect(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> Result<(), ConnectError<O::Error, <O::Link as Link>::Error>> {
        self.close();
        let mut link = self.opener.open().map_err(ConnectError::Open)?;
        self.sync
            .resynchronize(&mut link, &mut self.reader, delay)
            .map_err(ConnectError::Sync)?;
        self.link = Some(link);
        self.state.reset_after_reconnect();
        info!("LINK: {} open", self.opener.describe());
        Ok(())
    }

    /// Run one read cycle and apply the health policy.
    pub fn poll(&mut self, delay: &mut impl DelayNs) -> LinkEvent {
        let Some(link) = self.link.as_mut() else {
            return self.recover(delay);
        };

        match self.reader.read_frame(link, self.read_timeout) {
            Ok(Received::Frame(frame)) => {
                self.state.record_frame();
                LinkEvent::Frame(frame)
            }
            Ok(Received::Pending) => LinkEvent::Pending,
            Ok(Received::Idle) => {
                let verdict = self.state.record_timeout();
                let timeouts = self.state.consecutive_timeouts();
                if timeouts % 10 == 1 {
                    debug!("LINK: no data (timeout #{})", timeouts);
                }
                if verdict == Verdict::CheckAlive && !link.is_alive() {
                    warn!(
                        "LINK: health check failed after {} timeouts, reconnecting",
                        timeouts
                    );
                    return self.recover(delay);
                }
                LinkEvent::Idle
            }
            Err(e) => {
                warn!(
                    "LINK: read failed: {} (error #{})",
                    e,
                    self.state.consecutive_errors() + 1
                );
                self.transport_failed(delay)
            }
        }
    }

    /// Write a complete reply. A failure counts toward the reconnect
    /// threshold exactly like a read failure.
    pub fn send(&mut self, data: &[u8], delay: &mut impl DelayNs) -> bool {
        let Some(link) = self.link.as_mut() else {
            return false;
        };
        match link.write_all(data).and_then(|()| link.flush()) {
            Ok(()) => true,
            Err(e) => {
                warn!("LINK: write failed: {}", e);
                self.transport_failed(delay);
                false
            }
        }
    }

    /// Record an answered request. Returns `true` if the link just left
    /// startup resync.
    pub fn record_exchange(&mut self) -> bool {
        let synced = self.state.record_exchange();
        if synced {
            info!("LINK: synchronization established, normal operation");
        }
        synced
    }

    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    pub fn mode(&self) -> LinkMode {
        self.state.mode()
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Number of successful reopens since construction.
    pub fn reconnects(&self) -> u32 {
        self.reconnects
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Close the link for good (shutdown path).
    pub fn shutdown(&mut self) {
        self.close();
    }

    // ── Internal ──────────────────────────────────────────────

    fn transport_failed(&mut self, delay: &mut impl DelayNs) -> LinkEvent {
        if self.state.record_error() == Verdict::Reconnect {
            warn!(
                "LINK: {} consecutive errors, reconnecting",
                self.state.consecutive_errors()
            );
            return self.recover(delay);
        }
        delay.delay_ms(self.timing.error_pause_ms);
        LinkEvent::Fault
    }

    fn recover(&mut self, delay: &mut impl DelayNs) -> LinkEvent {
        if self.reopen(delay) {
            LinkEvent::Reconnected
        } else {
            delay.delay_ms(self.timing.reopen_backoff_ms);
            LinkEvent::Offline
        }
    }

    /// Old handle fully closed before the new one is created.
    fn reopen(&mut self, delay: &mut impl DelayNs) -> bool {
        self.close();

        let mut link = match self.opener.open() {
            Ok(link) => link,
            Err(e) => {
                warn!("LINK: reopen of {} failed: {}", self.opener.describe(), e);
                return false;
            }
        };
        if let Err(e) = self.sync.resynchronize(&mut link, &mut self.reader, delay) {
            warn!("LINK: resync after reopen failed: {}", e);
            return false;
        }

        self.link = Some(link);
        self.state.reset_after_reconnect();
        self.reconnects += 1;
        delay.delay_ms(self.timing.stabilize_ms);
        info!("LINK: {} reopened (reconnect #{})", self.opener.describe(), self.reconnects);
        true
    }

    fn close(&mut self) {
        if let Some(mut old) = self.link.take() {
            // Best effort; the handle is dropped either way.
            let _ = old.discard_buffers();
        }
        self.reader.reset();
    }
}
