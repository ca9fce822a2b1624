//! FanLink controller — entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                     │
//! │                                                            │
//! │  SerialChannelBank   SysfsPwm      LogEventSink            │
//! │  (ChannelBank)       (SetDutyCycle)(EventSink)             │
//! │  MonotonicClock      StdDelay      JsonConfigStore         │
//! │  (Clock)             (DelayNs)     (ConfigPort)            │
//! │  HwmonTach                                                 │
//! │  (Tachometer)                                              │
//! │                                                            │
//! │  ──────────────── Port Trait Boundary ───────────────      │
//! │                                                            │
//! │  ┌──────────────────────────────────────────────────┐      │
//! │  │  EndpointPoller (round robin)                    │      │
//! │  │  EndpointTable · ActuatorCurve · FanDriver       │      │
//! │  └──────────────────────────────────────────────────┘      │
//! └────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use embedded_hal::delay::DelayNs;
use log::{LevelFilter, info};

use fanlink::adapters::config_store::JsonConfigStore;
use fanlink::adapters::hwmon::HwmonTach;
use fanlink::adapters::log_sink::LogEventSink;
use fanlink::adapters::serial::{SerialChannelBank, open_channel_bank};
use fanlink::adapters::sysfs_pwm::SysfsPwm;
use fanlink::adapters::time::{MonotonicClock, StdDelay};
use fanlink::config::ControllerConfig;
use fanlink::control::ActuatorCurve;
use fanlink::drivers::fan::FanDriver;
use fanlink::poller::EndpointPoller;

/// Pause between poller ticks while awaiting replies or idling.
const TICK_MS: u32 = 5;

/// Multi-host fan controller
///
/// Polls every configured endpoint for CPU/NVMe temperatures and drives
/// a PWM fan from the worst readings.
#[derive(Parser, Debug)]
#[command(name = "fanlink", version, long_about = None)]
struct Args {
    /// JSON configuration file (defaults are used if it does not exist)
    #[arg(long, short, default_value = "/etc/fanlink/controller.json")]
    config: PathBuf,

    /// Serial device of one endpoint; repeat to replace the configured list
    #[arg(long = "endpoint", value_name = "PATH")]
    endpoints: Vec<String>,

    /// Debug logging (RUST_LOG still overrides)
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let store = JsonConfigStore::new(&args.config);
    let mut config = store
        .load_or_default()
        .with_context(|| format!("loading {}", args.config.display()))?;
    if !args.endpoints.is_empty() {
        config.endpoints = args.endpoints;
        config.validate().context("invalid --endpoint list")?;
    }

    let (bank, pwm) = open_hardware(&config).context("hardware setup failed")?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::Relaxed))
        .context("installing signal handler")?;

    let tach = config.tach.input.clone().map(HwmonTach::new);
    let mut poller = EndpointPoller::new(
        bank,
        FanDriver::new(pwm),
        ActuatorCurve::new(config.curve),
        config.poller,
    )
    .with_tachometer(tach, config.tach.interval_ms);
    let clock = MonotonicClock::new();
    let mut delay = StdDelay;
    let mut sink = LogEventSink::new();

    poller.start(&mut sink);
    while running.load(Ordering::Relaxed) {
        poller.tick(&clock, &mut delay, &mut sink);
        delay.delay_ms(TICK_MS);
    }

    info!("fanlink: stopped after {} cycles", poller.cycles());
    Ok(())
}

/// Absent endpoint devices are not an error; only the fan output is.
fn open_hardware(config: &ControllerConfig) -> fanlink::Result<(SerialChannelBank, SysfsPwm)> {
    let bank = open_channel_bank(&config.endpoints, config.baud);
    info!(
        "fanlink: {} of {} endpoints present at {} baud",
        bank.online(),
        config.endpoints.len(),
        config.baud
    );
    let pwm = SysfsPwm::open(&config.pwm)?;
    Ok((bank, pwm))
}

fn init_logging(verbose: bool) {
    env_logger::Builder::new()
        .filter_level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .format_timestamp_millis()
        .init();
}
