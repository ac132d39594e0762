//! ReportSink trait definition
//!
//! The session only produces values; sinks decide where they go (log, CSV,
//! memory). Sink failures are logged by the session and never end it.

use crate::core::types::{LatencySample, SampleRecord, TerminationReason};
use crate::error::{ParseError, Result};
use crate::pipeline::stats::StatsSnapshot;

/// Periodic progress, emitted every N accepted samples
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub count: usize,
    pub median: f64,
    pub p90: Option<i64>,
    pub p99: Option<i64>,
    /// Most recent latency sample
    pub last: LatencySample,
}

/// End-of-session summary
#[derive(Debug, Clone, PartialEq)]
pub struct FinalReport {
    pub stats: StatsSnapshot,
    pub firmware_label: String,
    pub reason: TerminationReason,
}

/// Why a single line was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipKind {
    /// Line source could not decode the bytes
    Decode,
    /// Data line failed record parsing
    Parse(ParseError),
}

/// A recoverable per-line error event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSkip {
    pub kind: SkipKind,
    /// Offending line, truncated for logging; empty for decode failures
    pub excerpt: String,
}

/// Destination for session output
pub trait ReportSink: Send {
    /// Called once per accepted sample
    fn on_sample(&mut self, _sample: &SampleRecord) -> Result<()> {
        Ok(())
    }

    /// Called for every recoverable line error
    fn on_skip(&mut self, _skip: &LineSkip) {}

    /// Periodic progress report
    fn emit_progress(&mut self, report: &ProgressReport) -> Result<()>;

    /// Final report; called at most once per session
    fn emit_final(&mut self, report: &FinalReport) -> Result<()>;
}
