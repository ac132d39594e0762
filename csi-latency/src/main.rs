//! csi-latency - ESP32 CSI serial latency probe
//!
//! Opens the USB-serial port of an ESP32 running CSI firmware, waits for its
//! header line, then measures host-arrival minus device timestamp for every
//! `CSI_DATA` record until the stream ends or Ctrl-C is pressed.
//!
//! # Usage
//!
//! ```bash
//! # Auto-detect the adapter, defaults for everything else
//! csi-latency
//!
//! # Explicit port and baud rate, no CSV files
//! csi-latency --port /dev/ttyUSB0 --baud 115200 --no-record
//!
//! # With a config file
//! csi-latency --config csi-latency.toml
//! ```
//!
//! # Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Stream ended normally |
//! | 1 | Startup failure or transport fault |
//! | 10 | Header missing `esp_epoch_us` |
//! | 11 | No recognized header in time |
//! | 127 | Stopped by user |

use clap::Parser;
use csi_latency::AppConfig;
use csi_latency::core::TerminationReason;
use csi_latency::error::Result;
use csi_latency::pipeline::Session;
use csi_latency::preflight::verify_clock;
use csi_latency::report::{ConsoleReporter, CsvRecorder, MultiSink};
use csi_latency::signal::setup_ctrl_c_handler;
use csi_latency::transport::{SerialLineSource, describe_ports, find_port};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "csi-latency.toml";

/// Measure one-way latency of an ESP32 CSI serial stream
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port (auto-detected when omitted)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Directory for CSV recordings
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Disable CSV recording
    #[arg(long)]
    no_record: bool,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            AppConfig::from_file(DEFAULT_CONFIG_FILE)?
        }
        None => AppConfig::default(),
    };

    // Command line overrides
    if let Some(port) = &args.port {
        config.serial.port = Some(port.clone());
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(dir) = &args.output {
        config.recording.directory = dir.clone();
    }
    if args.no_record {
        config.recording.enabled = false;
    }
    config.validate()?;
    Ok(config)
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args);

    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let code = match config.and_then(|config| run(&args, &config)) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            1
        }
    };
    std::process::exit(code);
}

fn run(args: &Args, config: &AppConfig) -> Result<i32> {
    if args.list_ports {
        for port in describe_ports()? {
            println!("{}", port);
        }
        return Ok(0);
    }

    log::info!("csi-latency v{} starting...", env!("CARGO_PKG_VERSION"));

    verify_clock(config.preflight.require_ntp_sync)?;

    let port = match &config.serial.port {
        Some(port) => port.clone(),
        None => find_port()?,
    };
    let baud_rate = config.serial.baud_rate;

    let running = setup_ctrl_c_handler()?;

    let mut source = match SerialLineSource::open(
        &port,
        baud_rate,
        config.serial.read_timeout(),
        running,
    ) {
        Ok(source) => source,
        Err(e) if e.is_permission_denied() => {
            log::error!("Permission denied - check user permissions for {}", port);
            return Ok(TerminationReason::PermissionDenied.exit_code());
        }
        Err(e) => return Err(e),
    };

    let mut sinks = MultiSink::new().with(Box::new(ConsoleReporter::new()));
    if config.recording.enabled {
        match CsvRecorder::create(&config.recording.directory, baud_rate) {
            Ok(recorder) => sinks.push(Box::new(recorder)),
            Err(e) => log::error!("Failed to open CSV files, recording disabled: {}", e),
        }
    }

    let mut session = Session::new(
        config.session_config(),
        config.signature_registry()?,
        Box::new(sinks),
    );
    log::info!("Press Ctrl-C to stop");

    let outcome = session.run(&mut source);

    log::info!(
        "Stopped ({}), exit code {}",
        outcome.reason,
        outcome.exit_code()
    );
    Ok(outcome.exit_code())
}
