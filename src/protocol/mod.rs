//! Wire protocol spoken over every link.
//!
//! ```text
//! controller ── "POLL\r\n" ──────────────────────▶ endpoint
//! controller ◀── "CPU:42.50|NVME:39.10\n" ──────── endpoint
//! ```
//!
//! Plain ASCII, one request or response per line, no checksum. Framing
//! itself lives in [`crate::link::frame`]; this module only deals with
//! the content of an already-extracted line.

pub mod codec;

pub use codec::{POLL_REQUEST, ResponseLine, decode_response, encode_response};

/// A request line as seen by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Poll,
    /// Only whitespace between terminators.
    Empty,
    /// Well-formed line that is not a known command.
    Unknown,
}

impl Request {
    /// Classify an extracted frame. Surrounding whitespace is ignored.
    pub fn parse(frame: &[u8]) -> Self {
        let Ok(text) = core::str::from_utf8(frame) else {
            return Self::Unknown;
        };
        match text.trim() {
            "" => Self::Empty,
            "POLL" => Self::Poll,
            _ => Self::Unknown,
        }
    }
}

/// One pair of readings as carried by a response line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readings {
    /// Primary metric (CPU temperature, °C).
    pub cpu: f32,
    /// Secondary metric (NVMe temperature, °C).
    pub nvme: f32,
}
