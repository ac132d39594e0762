//! Error types for csi-latency

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Session-independent error types (startup, I/O, configuration, recording)
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// CSV recording error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// No USB serial adapter found during discovery
    #[error("USB serial port not found")]
    PortNotFound,

    /// Host clock is not NTP-synchronized and the config requires it
    #[error("System clock is not NTP-synchronized")]
    ClockNotSynchronized,

    /// Invalid configuration value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Header inspection failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Header declares fields but not the device timestamp
    #[error("Header missing required field {0}")]
    MissingRequiredField(&'static str),
}

/// Per-line data record failures; all of them are recoverable skips
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Line has fewer tokens than the timestamp column index requires
    #[error("field {field} missing at index {index} ({found} tokens)")]
    FieldMissing {
        field: &'static str,
        index: usize,
        found: usize,
    },

    /// Timestamp token is not a base-10 integer
    #[error("timestamp {0:?} is not an integer")]
    NotAnInteger(String),

    /// Timestamp parsed but sits below the sanity floor
    #[error("suspicious timestamp {value} (floor {floor})")]
    SuspiciousTimestamp { value: i64, floor: i64 },

    /// CSV tokenizer rejected the line
    #[error("malformed line: {0}")]
    Malformed(String),
}

impl Error {
    /// True when the underlying cause is an OS permission failure
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Error::Serial(e) => matches!(
                e.kind(),
                serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied)
            ),
            Error::Io(e) => e.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_detection() {
        let serial = Error::Serial(serialport::Error::new(
            serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied),
            "Permission denied",
        ));
        assert!(serial.is_permission_denied());

        let io = Error::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(io.is_permission_denied());

        let missing = Error::Serial(serialport::Error::new(
            serialport::ErrorKind::NoDevice,
            "No such device",
        ));
        assert!(!missing.is_permission_denied());
        assert!(!Error::PortNotFound.is_permission_denied());
    }

    #[test]
    fn test_parse_error_messages() {
        let err = ParseError::SuspiciousTimestamp {
            value: 12,
            floor: 1_000_000_000,
        };
        assert_eq!(err.to_string(), "suspicious timestamp 12 (floor 1000000000)");
    }
}
