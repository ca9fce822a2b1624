//! Framing-less serial link and everything needed to keep it usable.
//!
//! ```text
//!  ┌───────────┐  bytes  ┌─────────────┐  frames  ┌──────────────────┐
//!  │ Link      │────────▶│ FrameReader │─────────▶│ caller (respond) │
//!  │ (trait)   │         └─────────────┘          └──────────────────┘
//!  └───────────┘                ▲
//!        ▲                      │ reset
//!        │ reopen         ┌─────┴─────┐
//!  ┌─────┴────────────────┤ LinkSync  │
//!  │ ConnectionSupervisor └───────────┘
//!  └──────────────────────────────────
//! ```
//!
//! The supervisor owns the link handle and is the only thing that opens,
//! closes and resynchronizes it.

pub mod frame;
pub mod supervisor;
pub mod sync;

use core::time::Duration;

/// Byte-oriented, half-duplex channel with no framing of its own.
pub trait Link {
    /// Error type for this transport.
    type Error: core::fmt::Display;

    /// Wait up to `timeout` for data, then read what is available into
    /// `buf`. Returns `Ok(0)` if nothing arrived in time (not an error).
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, Self::Error>;

    /// Write all of `data`.
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Block until queued output has been transmitted.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Discard everything queued in both directions.
    fn discard_buffers(&mut self) -> Result<(), Self::Error>;

    /// Cheap liveness check (line status query or equivalent).
    fn is_alive(&mut self) -> bool;
}

/// Creates fresh [`Link`] handles for one physical device.
///
/// The supervisor drops the previous handle before calling `open` again,
/// so at most one handle per device is ever live.
pub trait LinkOpener {
    type Link: Link;
    type Error: core::fmt::Display;

    fn open(&mut self) -> Result<Self::Link, Self::Error>;

    /// Human-readable device name for logs.
    fn describe(&self) -> &str;
}
