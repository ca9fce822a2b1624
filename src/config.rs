//! System configuration parameters
//!
//! All tunable parameters for both ends of the link. Defaults reproduce
//! the values the controller and agents ship with; every struct has a
//! `validate` that is run once at startup. A failure there is fatal,
//! nothing in here is re-checked during steady-state operation.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Number of endpoint slots on the controller.
pub const MAX_ENDPOINTS: usize = 4;

// --- Link speed ---

/// Supported link speeds. Always 8 data bits, no parity, 1 stop bit, no
/// flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl BaudRate {
    pub const fn bits_per_second(self) -> u32 {
        match self {
            Self::B9600 => 9600,
            Self::B19200 => 19_200,
            Self::B38400 => 38_400,
            Self::B57600 => 57_600,
            Self::B115200 => 115_200,
        }
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = ConfigError;

    fn try_from(bps: u32) -> Result<Self, ConfigError> {
        match bps {
            9600 => Ok(Self::B9600),
            19_200 => Ok(Self::B19200),
            38_400 => Ok(Self::B38400),
            57_600 => Ok(Self::B57600),
            115_200 => Ok(Self::B115200),
            other => Err(ConfigError::InvalidBaud(other)),
        }
    }
}

impl From<BaudRate> for u32 {
    fn from(baud: BaudRate) -> Self {
        baud.bits_per_second()
    }
}

impl core::fmt::Display for BaudRate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.bits_per_second())
    }
}

// --- Receiver side ---

/// One physical serial link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Device path, e.g. `/dev/serial0`.
    pub port: String,
    pub baud: BaudRate,
    /// Bounded wait for readability on each read cycle (seconds).
    pub read_timeout_secs: u32,
}

impl LinkConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.read_timeout_secs))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::MissingValue("serial port"));
        }
        if self.read_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed("read timeout must be > 0"));
        }
        Ok(())
    }
}

/// Configuration of the receiver daemon (`fanlinkd`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub link: LinkConfig,
    /// Shell command printing the CPU temperature (`temp=XX.X'C`).
    pub cpu_command: String,
    /// Shell command printing the NVMe temperature (`Temperature: XX`).
    pub nvme_command: String,
    pub verbose: bool,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.link.validate()?;
        if self.cpu_command.trim().is_empty() {
            return Err(ConfigError::MissingValue("CPU temperature command"));
        }
        if self.nvme_command.trim().is_empty() {
            return Err(ConfigError::MissingValue("NVME temperature command"));
        }
        Ok(())
    }
}

// --- Controller side ---

/// Response curve for one metric. Immutable after load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricCurve {
    /// At or below this reading the output sits at `floor`.
    pub low: f32,
    /// At or above this reading the output sits at `ceiling`.
    pub high: f32,
    /// 1.0 = linear; > 1.0 stays low through moderate readings and ramps
    /// sharply near `high`.
    pub exponent: f32,
    pub floor: f32,
    pub ceiling: f32,
}

impl MetricCurve {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.low.is_finite() && self.high.is_finite()) || self.low >= self.high {
            return Err(ConfigError::ValidationFailed("curve low must be below high"));
        }
        if !(self.exponent.is_finite() && self.exponent > 0.0) {
            return Err(ConfigError::ValidationFailed("curve exponent must be > 0"));
        }
        if !(0.0..=255.0).contains(&self.floor)
            || !(0.0..=255.0).contains(&self.ceiling)
            || self.floor > self.ceiling
        {
            return Err(ConfigError::ValidationFailed(
                "curve output must satisfy 0 <= floor <= ceiling <= 255",
            ));
        }
        Ok(())
    }
}

/// Per-metric curves: primary = CPU, secondary = NVMe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveConfig {
    pub cpu: MetricCurve,
    pub nvme: MetricCurve,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            cpu: MetricCurve {
                low: 40.0,
                high: 60.0,
                exponent: 2.5,
                floor: 30.0,
                ceiling: 255.0,
            },
            nvme: MetricCurve {
                low: 40.0,
                high: 65.0,
                exponent: 2.5,
                floor: 30.0,
                ceiling: 255.0,
            },
        }
    }
}

/// Round-robin timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Wait between the end of one cycle and the start of the next.
    pub poll_interval_ms: u32,
    /// How long to wait for a reply after sending `POLL`.
    pub response_timeout_ms: u32,
    /// Settle time after switching the active listener.
    pub settle_delay_ms: u32,
    /// Consecutive misses before a connected endpoint is marked disconnected.
    pub max_missed_polls: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,  // 1 Hz
            response_timeout_ms: 200,
            settle_delay_ms: 50,
            max_missed_polls: 10,
        }
    }
}

impl PollerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.response_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("response timeout must be > 0"));
        }
        if self.response_timeout_ms >= self.poll_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "response timeout must be shorter than the poll interval",
            ));
        }
        if self.max_missed_polls == 0 {
            return Err(ConfigError::ValidationFailed("max missed polls must be > 0"));
        }
        Ok(())
    }
}

/// Linux sysfs PWM channel driving the fan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PwmConfig {
    pub chip: u32,
    pub channel: u32,
    /// PWM period in nanoseconds (40_000 = 25 kHz, the 4-pin fan standard).
    pub period_ns: u32,
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            chip: 0,
            channel: 0,
            period_ns: 40_000,
        }
    }
}

/// Fan speed readback through Linux hwmon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TachConfig {
    /// `fanN_input` attribute, e.g. `/sys/class/hwmon/hwmon2/fan1_input`.
    /// `None` disables readback.
    pub input: Option<String>,
    pub interval_ms: u32,
}

impl Default for TachConfig {
    fn default() -> Self {
        Self {
            input: None,
            interval_ms: 1000,
        }
    }
}

impl TachConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.as_ref().is_some_and(|p| p.trim().is_empty()) {
            return Err(ConfigError::ValidationFailed("tachometer input must not be empty"));
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("tachometer interval must be > 0"));
        }
        Ok(())
    }
}

/// Configuration of the poller/controller (`fanlink`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// One serial device per endpoint slot, in polling order.
    pub endpoints: Vec<String>,
    pub baud: BaudRate,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub curve: CurveConfig,
    #[serde(default)]
    pub pwm: PwmConfig,
    #[serde(default)]
    pub tach: TachConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "/dev/ttyUSB0".into(),
                "/dev/ttyUSB1".into(),
                "/dev/ttyUSB2".into(),
                "/dev/ttyUSB3".into(),
            ],
            baud: BaudRate::B38400,
            poller: PollerConfig::default(),
            curve: CurveConfig::default(),
            pwm: PwmConfig::default(),
            tach: TachConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::MissingValue("endpoints"));
        }
        if self.endpoints.len() > MAX_ENDPOINTS {
            return Err(ConfigError::ValidationFailed("at most 4 endpoints are supported"));
        }
        if self.endpoints.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::ValidationFailed("endpoint path must not be empty"));
        }
        if self.pwm.period_ns == 0 {
            return Err(ConfigError::ValidationFailed("PWM period must be > 0"));
        }
        self.poller.validate()?;
        self.tach.validate()?;
        self.curve.cpu.validate()?;
        self.curve.nvme.validate()
    }
}
