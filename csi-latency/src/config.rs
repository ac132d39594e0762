//! Configuration for csi-latency
//!
//! Loads configuration from a TOML file. Every section is optional; missing
//! values fall back to the defaults below.

use crate::error::{Error, Result};
use crate::pipeline::record::DEFAULT_TIMESTAMP_FLOOR_US;
use crate::pipeline::schema::{FirmwareSignature, SignatureRegistry};
use crate::pipeline::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub session: SessionSettings,
    /// Extra header signatures on top of the built-in ones
    pub firmware: Vec<FirmwareSignature>,
    pub recording: RecordingConfig,
    pub preflight: PreflightConfig,
    pub logging: LoggingConfig,
}

/// Serial port settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path; discovered automatically when absent
    pub port: Option<String>,
    pub baud_rate: u32,
    /// Time without a complete line before an empty poll is reported
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 921_600,
            read_timeout_ms: 10_000,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Measurement session settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Lines tolerated before a recognized header must have arrived
    pub header_timeout_lines: u64,
    /// Read timeouts tolerated before a recognized header must have arrived
    pub header_timeout_polls: u64,
    /// Progress report interval in samples (0 disables)
    pub report_every: usize,
    /// Device timestamps below this floor are rejected (µs)
    pub timestamp_floor_us: i64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            header_timeout_lines: 500,
            header_timeout_polls: 6,
            report_every: 500,
            timestamp_floor_us: DEFAULT_TIMESTAMP_FLOOR_US,
        }
    }
}

/// CSV recording settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub enabled: bool,
    pub directory: PathBuf,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("data_logs"),
        }
    }
}

/// Host checks before opening the port
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PreflightConfig {
    /// Abort when the host clock is not NTP-synchronized (warn otherwise)
    pub require_ntp_sync: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use csi_latency::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("csi-latency.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the session cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.serial.baud_rate == 0 {
            return Err(Error::InvalidConfig("serial.baud_rate must be > 0".to_string()));
        }
        if self.serial.read_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "serial.read_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            header_timeout_lines: self.session.header_timeout_lines,
            header_timeout_polls: self.session.header_timeout_polls,
            report_every: self.session.report_every,
            timestamp_floor_us: self.session.timestamp_floor_us,
        }
    }

    /// Built-in signatures plus the `[[firmware]]` entries
    pub fn signature_registry(&self) -> Result<SignatureRegistry> {
        let mut registry = SignatureRegistry::with_defaults();
        for signature in &self.firmware {
            registry.register(signature.clone())?;
        }
        Ok(registry)
    }
}
