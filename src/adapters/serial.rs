//! Serial port adapters.
//!
//! | Type                | Implements    | Used by              |
//! |---------------------|---------------|----------------------|
//! | `SerialLink`        | `Link`        | receiver supervisor  |
//! | `SerialOpener`      | `LinkOpener`  | receiver supervisor  |
//! | `SerialChannelBank` | `ChannelBank` | controller poller    |
//!
//! `SerialChannelBank` is a [`LinkBank`] of [`SerialOpener`]s, so a
//! missing or unplugged device is reopened when its slot comes up.
//!
//! Every port is opened 8N1 without flow control.

use std::io::{Read, Write};
use std::time::Duration;

use log::{debug, warn};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::config::BaudRate;
use crate::error::LinkError;
use crate::link::{Link, LinkOpener};
use crate::poller::bank::LinkBank;

/// Default blocking timeout for writes and flushes.
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

fn open_port(path: &str, baud: BaudRate) -> Result<Box<dyn SerialPort>, LinkError> {
    debug!("LINK: opening {} at {} baud", path, baud);
    serialport::new(path, baud.bits_per_second())
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(WRITE_TIMEOUT)
        .open()
        .map_err(|e| LinkError::Open(e.kind()))
}

/// Bytes already read win over a failed timeout restore; the next
/// write then runs with the read timeout.
fn settle_read(
    result: std::io::Result<usize>,
    restored: serialport::Result<()>,
) -> Result<usize, LinkError> {
    if let Err(e) = restored {
        warn!("LINK: restoring write timeout failed: {}", e);
    }
    match result {
        Ok(n) => Ok(n),
        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(0),
        Err(e) => Err(e.into()),
    }
}

// ───────────────────────────────────────────────────────────────
// Point-to-point link
// ───────────────────────────────────────────────────────────────

pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Link for SerialLink {
    type Error = LinkError;

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, LinkError> {
        self.port.set_timeout(timeout)?;
        let result = self.port.read(buf);
        let restored = self.port.set_timeout(WRITE_TIMEOUT);
        settle_read(result, restored)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), LinkError> {
        Write::write_all(&mut self.port, data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LinkError> {
        Write::flush(&mut self.port)?;
        Ok(())
    }

    fn discard_buffers(&mut self) -> Result<(), LinkError> {
        self.port.clear(ClearBuffer::All)?;
        Ok(())
    }

    /// Modem-line query; fails once the device is gone.
    fn is_alive(&mut self) -> bool {
        self.port.read_clear_to_send().is_ok()
    }
}

/// Opens fresh [`SerialLink`]s for one device path.
pub struct SerialOpener {
    path: String,
    baud: BaudRate,
}

impl SerialOpener {
    pub fn new(path: impl Into<String>, baud: BaudRate) -> Self {
        Self {
            path: path.into(),
            baud,
        }
    }
}

impl LinkOpener for SerialOpener {
    type Link = SerialLink;
    type Error = LinkError;

    fn open(&mut self) -> Result<SerialLink, LinkError> {
        open_port(&self.path, self.baud).map(SerialLink::new)
    }

    fn describe(&self) -> &str {
        &self.path
    }
}

// ───────────────────────────────────────────────────────────────
// Channel bank
// ───────────────────────────────────────────────────────────────

/// One serial port per endpoint; only the selected one is listened to.
///
/// Selecting a channel discards pending input on every open port, so
/// bytes that arrived while a channel was not selected are never seen.
pub type SerialChannelBank = LinkBank<SerialOpener>;

/// Build the controller's bank. Devices that are absent now are retried
/// each time their slot comes up.
pub fn open_channel_bank(paths: &[String], baud: BaudRate) -> SerialChannelBank {
    LinkBank::new(paths.iter().map(|p| SerialOpener::new(p.as_str(), baud)))
}
