//! csi-latency - one-way latency measurement for ESP32 CSI serial streams
//!
//! The device prints a header naming its columns, then one `CSI_DATA` line per
//! captured frame carrying its own epoch timestamp (`esp_epoch_us`). The host
//! stamps each line on arrival; the difference is the naive one-way latency
//! (no clock-offset correction).
//!
//! ## Layout
//!
//! - [`core`]: Line/record types and the [`LineSource`](core::LineSource) and
//!   [`ReportSink`](core::ReportSink) traits
//! - [`pipeline`]: Schema detection, record parsing, statistics, session state machine
//! - [`transport`]: Serial and scripted line sources, port discovery
//! - [`report`]: Log, CSV and in-memory sinks

pub mod clock;
pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod preflight;
pub mod report;
pub mod signal;
pub mod transport;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
pub use pipeline::{Session, SessionConfig, SessionOutcome, StatsSnapshot};
