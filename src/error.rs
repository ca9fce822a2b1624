//! Unified error types for FanLink.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! top-level loops' error handling uniform. All variants are `Copy` so
//! they can be passed through the supervisor counters and the event sink
//! without allocation.
//!
//! Timeouts are deliberately absent: "no data yet" is a normal outcome
//! (`Ok(0)` / `Ok(None)`), never an error.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The serial transport failed.
    Link(LinkError),
    /// A response payload could not be decoded.
    Codec(CodecError),
    /// Configuration is missing or invalid (fatal at startup only).
    Config(ConfigError),
    /// The fan output could not be written.
    Pwm(PwmError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Codec(e) => write!(f, "codec: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Pwm(e) => write!(f, "pwm: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The device could not be opened or configured.
    Open(serialport::ErrorKind),
    /// A read, write or flush failed.
    Io(std::io::ErrorKind),
    /// The handle was already closed.
    Closed,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(kind) => write!(f, "open failed ({kind:?})"),
            Self::Io(kind) => write!(f, "I/O error ({kind})"),
            Self::Closed => write!(f, "link closed"),
        }
    }
}

impl std::error::Error for LinkError {}

impl From<std::io::Error> for LinkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.kind())
    }
}

impl From<serialport::Error> for LinkError {
    fn from(e: serialport::Error) -> Self {
        match e.kind() {
            serialport::ErrorKind::Io(kind) => Self::Io(kind),
            other => Self::Open(other),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// A required `KEY:` field is absent.
    MissingField(&'static str),
    /// A field value is not a finite number.
    BadNumber(&'static str),
    /// The payload is not a `KEY:value|KEY:value` list.
    Malformed,
    /// The encoded line does not fit the output buffer.
    TooLong,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(key) => write!(f, "missing field {key}"),
            Self::BadNumber(key) => write!(f, "field {key} is not a number"),
            Self::Malformed => write!(f, "malformed payload"),
            Self::TooLong => write!(f, "encoded line too long"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A required parameter was not supplied.
    MissingValue(&'static str),
    /// The baud rate is not one of the supported speeds.
    InvalidBaud(u32),
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// The config file could not be read.
    Unreadable,
    /// The config file is not valid JSON for the expected shape.
    Corrupted,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingValue(name) => write!(f, "{name} is not set"),
            Self::InvalidBaud(baud) => write!(f, "unsupported baud rate {baud}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Unreadable => write!(f, "config file unreadable"),
            Self::Corrupted => write!(f, "config file corrupted"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// PWM errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmError {
    /// The PWM channel could not be exported or enabled.
    Setup(std::io::ErrorKind),
    /// Writing the duty cycle failed.
    WriteFailed(std::io::ErrorKind),
}

impl fmt::Display for PwmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(kind) => write!(f, "PWM setup failed ({kind})"),
            Self::WriteFailed(kind) => write!(f, "PWM duty write failed ({kind})"),
        }
    }
}

impl std::error::Error for PwmError {}

impl embedded_hal::pwm::Error for PwmError {
    fn kind(&self) -> embedded_hal::pwm::ErrorKind {
        embedded_hal::pwm::ErrorKind::Other
    }
}

impl From<PwmError> for Error {
    fn from(e: PwmError) -> Self {
        Self::Pwm(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
