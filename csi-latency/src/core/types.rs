//! Core data types shared by the measurement pipeline and its collaborators.
//!
//! Key types:
//! - [`RawLine`]: One text line from the device plus its host arrival time
//! - [`LatencySample`]: Signed one-way latency in microseconds
//! - [`TerminationReason`]: Why a session ended, mapped to a process exit code

use std::fmt;

/// Signed latency in microseconds (`host_arrival_us - device_timestamp_us`)
///
/// Negative values are legal: no clock-offset correction is applied between the
/// device and host clocks.
pub type LatencySample = i64;

/// Name of the mandatory device timestamp column
pub const DEVICE_TIMESTAMP_FIELD: &str = "esp_epoch_us";

/// Literal prefix that marks a header candidate line
pub const HEADER_PREFIX: &str = "type,";

/// A line received from the device, stamped with host arrival time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub text: String,
    /// Host-side epoch time (µs) at which the line was read
    pub host_arrival_us: i64,
}

impl RawLine {
    pub fn new(text: impl Into<String>, host_arrival_us: i64) -> Self {
        Self {
            text: text.into(),
            host_arrival_us,
        }
    }
}

/// Fields extracted from a data line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub device_timestamp_us: i64,
}

/// One accepted measurement, handed to sinks that keep raw data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRecord {
    pub host_arrival_us: i64,
    pub device_timestamp_us: i64,
    pub latency_us: LatencySample,
}

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingSchema,
    StreamingData,
    Terminated,
}

/// Why a session entered the terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Line source reported a clean end of stream
    StreamEnd,
    /// No recognized header within the configured number of lines
    HeaderTimeout,
    /// Header lacked the device timestamp column
    MissingRequiredField,
    /// Device unplugged or port closed underneath us
    Disconnected,
    /// Port could not be accessed
    PermissionDenied,
    /// Ctrl-C or equivalent
    Interrupted,
}

impl TerminationReason {
    /// Process exit status for this reason
    pub fn exit_code(self) -> i32 {
        match self {
            TerminationReason::StreamEnd => 0,
            TerminationReason::Disconnected | TerminationReason::PermissionDenied => 1,
            TerminationReason::MissingRequiredField => 10,
            TerminationReason::HeaderTimeout => 11,
            TerminationReason::Interrupted => 127,
        }
    }

    /// True for terminations the operator asked for or that are routine
    pub fn is_clean(self) -> bool {
        matches!(
            self,
            TerminationReason::StreamEnd | TerminationReason::Interrupted
        )
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationReason::StreamEnd => "end of stream",
            TerminationReason::HeaderTimeout => "header timeout",
            TerminationReason::MissingRequiredField => "header missing required field",
            TerminationReason::Disconnected => "device disconnected",
            TerminationReason::PermissionDenied => "permission denied",
            TerminationReason::Interrupted => "stopped by user",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_for_fatal_reasons() {
        assert_eq!(TerminationReason::StreamEnd.exit_code(), 0);
        assert_eq!(TerminationReason::MissingRequiredField.exit_code(), 10);
        assert_eq!(TerminationReason::HeaderTimeout.exit_code(), 11);
        assert_eq!(TerminationReason::Interrupted.exit_code(), 127);
        assert_ne!(TerminationReason::Disconnected.exit_code(), 0);
        assert_ne!(TerminationReason::PermissionDenied.exit_code(), 0);
    }

    #[test]
    fn test_clean_reasons() {
        assert!(TerminationReason::StreamEnd.is_clean());
        assert!(TerminationReason::Interrupted.is_clean());
        assert!(!TerminationReason::HeaderTimeout.is_clean());
        assert!(!TerminationReason::Disconnected.is_clean());
    }
}
