//! FanLink receiver daemon.
//!
//! Holds the serial link to the controller open, resynchronizes it after
//! every (re)open and answers each `POLL` with the local CPU and NVMe
//! temperatures. Runs in the foreground; service managers handle the rest.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use clap::builder::FalseyValueParser;
use log::{LevelFilter, info};

use fanlink::adapters::command_source::CommandSource;
use fanlink::adapters::serial::SerialOpener;
use fanlink::adapters::time::StdDelay;
use fanlink::app::responder::Responder;
use fanlink::config::{AgentConfig, BaudRate, LinkConfig};
use fanlink::link::supervisor::ConnectionSupervisor;

/// Temperature agent answering fan-controller polls
///
/// Every option can also be supplied through its environment variable.
#[derive(Parser, Debug)]
#[command(name = "fanlinkd", version, long_about = None)]
struct Args {
    /// Serial device connected to the controller
    #[arg(long, env = "FAN_TEMP_SERIAL_PORT")]
    port: String,

    /// Link speed: 9600, 19200, 38400, 57600 or 115200
    #[arg(long, env = "FAN_TEMP_BAUD_RATE", value_parser = parse_baud)]
    baud: BaudRate,

    /// Read timeout in seconds
    #[arg(long, env = "FAN_TEMP_READ_TIMEOUT")]
    read_timeout: u32,

    /// Command printing the CPU temperature (`temp=XX.X'C`)
    #[arg(long, env = "FAN_TEMP_CPU_CMD")]
    cpu_cmd: String,

    /// Command printing the NVMe temperature (`Temperature: XX`)
    #[arg(long, env = "FAN_TEMP_NVME_CMD")]
    nvme_cmd: String,

    /// Debug logging (RUST_LOG still overrides)
    #[arg(long, short, env = "FAN_TEMP_VERBOSE", value_parser = FalseyValueParser::new())]
    verbose: bool,
}

impl From<Args> for AgentConfig {
    fn from(args: Args) -> Self {
        Self {
            link: LinkConfig {
                port: args.port,
                baud: args.baud,
                read_timeout_secs: args.read_timeout,
            },
            cpu_command: args.cpu_cmd,
            nvme_command: args.nvme_cmd,
            verbose: args.verbose,
        }
    }
}

fn parse_baud(s: &str) -> Result<BaudRate, String> {
    let bps: u32 = s.trim().parse().map_err(|_| format!("not a number: {s}"))?;
    BaudRate::try_from(bps).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let config = AgentConfig::from(Args::parse());
    init_logging(config.verbose);
    config.validate().context("invalid configuration")?;

    let mut delay = StdDelay;
    let opener = SerialOpener::new(config.link.port.clone(), config.link.baud);
    let mut supervisor = ConnectionSupervisor::new(opener, config.link.read_timeout());
    supervisor
        .connect(&mut delay)
        .with_context(|| format!("cannot open {}", config.link.port))?;
    info!(
        "fanlinkd: monitoring on {} (baud {}, timeout {}s)",
        config.link.port, config.link.baud, config.link.read_timeout_secs
    );

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::Relaxed))
        .context("installing signal handler")?;

    let source = CommandSource::new(config.cpu_command, config.nvme_command);
    let mut responder = Responder::new(supervisor, source);
    responder.run(&running, &mut delay);
    Ok(())
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
