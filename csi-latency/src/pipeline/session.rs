//! Session controller
//!
//! Drives one measurement run through
//! `AwaitingSchema -> StreamingData -> Terminated`.
//!
//! # Line Handling
//!
//! - **AwaitingSchema**: every line counts toward the header timeout, and
//!   empty polls count toward a separate silence budget. Header candidates (`type,...`) go to the [`SchemaDetector`]; a signature match
//!   switches to streaming, a header without `esp_epoch_us` ends the session.
//! - **StreamingData**: lines carrying the record marker become latency
//!   samples. Everything else, including a second header, is ignored.
//! - **Terminated**: reached from any trigger through [`Session::terminate`],
//!   which emits the final report exactly once.
//!
//! Per-line failures never escape the controller; they are counted in
//! [`SkipCounters`] and forwarded to the sink as [`LineSkip`] events.

use crate::core::sink::{FinalReport, LineSkip, ProgressReport, ReportSink, SkipKind};
use crate::core::source::{FaultKind, LineSource, Poll};
use crate::core::types::{RawLine, SampleRecord, SessionPhase, TerminationReason};
use crate::error::{ParseError, SchemaError};
use crate::pipeline::latency;
use crate::pipeline::record::{DEFAULT_TIMESTAMP_FLOOR_US, RecordParser};
use crate::pipeline::schema::{SchemaDetector, SchemaState, SignatureRegistry};
use crate::pipeline::stats::{SampleSet, StatsSnapshot, fmt_percentile};

/// Characters of an offending line kept in skip events
const EXCERPT_LEN: usize = 120;

/// Session tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Lines tolerated without a recognized header
    pub header_timeout_lines: u64,
    /// Empty polls (read timeouts) tolerated without a recognized header
    pub header_timeout_polls: u64,
    /// Emit a progress report every N samples (0 disables progress)
    pub report_every: usize,
    /// Device timestamps below this are rejected
    pub timestamp_floor_us: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            header_timeout_lines: 500,
            header_timeout_polls: 6,
            report_every: 500,
            timestamp_floor_us: DEFAULT_TIMESTAMP_FLOOR_US,
        }
    }
}

/// Tally of recoverable per-line events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipCounters {
    pub decode_errors: u64,
    pub empty_polls: u64,
    pub field_missing: u64,
    pub not_an_integer: u64,
    pub suspicious_timestamps: u64,
    pub malformed: u64,
    /// Lines that were neither header candidates nor records
    pub unrecognized: u64,
    /// Header lines seen after the schema was resolved
    pub ignored_headers: u64,
}

impl SkipCounters {
    fn record_parse_error(&mut self, err: &ParseError) {
        match err {
            ParseError::FieldMissing { .. } => self.field_missing += 1,
            ParseError::NotAnInteger(_) => self.not_an_integer += 1,
            ParseError::SuspiciousTimestamp { .. } => self.suspicious_timestamps += 1,
            ParseError::Malformed(_) => self.malformed += 1,
        }
    }

    /// Data lines rejected by the record parser
    pub fn parse_errors(&self) -> u64 {
        self.field_missing + self.not_an_integer + self.suspicious_timestamps + self.malformed
    }
}

/// Outcome of processing one line or poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Terminated(TerminationReason),
}

/// Everything the caller needs after a session ends
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub reason: TerminationReason,
    pub firmware_label: String,
    pub final_stats: Option<StatsSnapshot>,
    pub skips: SkipCounters,
}

impl SessionOutcome {
    pub fn exit_code(&self) -> i32 {
        self.reason.exit_code()
    }
}

/// One measurement run
pub struct Session {
    config: SessionConfig,
    detector: SchemaDetector,
    parser: RecordParser,
    schema: SchemaState,
    samples: SampleSet,
    lines_seen: u64,
    polls_waited: u64,
    phase: SessionPhase,
    reason: Option<TerminationReason>,
    final_stats: Option<StatsSnapshot>,
    skips: SkipCounters,
    sink: Box<dyn ReportSink>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        registry: SignatureRegistry,
        sink: Box<dyn ReportSink>,
    ) -> Self {
        Self {
            config,
            detector: SchemaDetector::new(registry),
            parser: RecordParser::new(config.timestamp_floor_us),
            schema: SchemaState::unresolved(),
            samples: SampleSet::new(),
            lines_seen: 0,
            polls_waited: 0,
            phase: SessionPhase::AwaitingSchema,
            reason: None,
            final_stats: None,
            skips: SkipCounters::default(),
            sink,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn schema(&self) -> &SchemaState {
        &self.schema
    }

    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    pub fn skips(&self) -> &SkipCounters {
        &self.skips
    }

    /// Lines received while waiting for the header
    pub fn lines_seen(&self) -> u64 {
        self.lines_seen
    }

    /// Empty polls received while waiting for the header
    pub fn polls_waited(&self) -> u64 {
        self.polls_waited
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.reason
    }

    /// Current statistics, recomputed on every call
    pub fn snapshot(&self) -> Option<StatsSnapshot> {
        self.samples.snapshot()
    }

    /// Poll `source` until the session terminates
    pub fn run<S: LineSource + ?Sized>(&mut self, source: &mut S) -> SessionOutcome {
        log::info!("Waiting for header line...");
        loop {
            if let Step::Terminated(reason) = self.handle_poll(source.next_line()) {
                return self.outcome_for(reason);
            }
        }
    }

    /// Feed one poll result into the state machine
    pub fn handle_poll(&mut self, poll: Poll) -> Step {
        if let Some(reason) = self.reason {
            return Step::Terminated(reason);
        }

        match poll {
            Poll::Line(line) => self.handle_line(&line),
            Poll::Empty => {
                self.skips.empty_polls += 1;
                log::warn!("No response within read timeout");
                if self.phase == SessionPhase::AwaitingSchema {
                    self.polls_waited += 1;
                    if self.polls_waited > self.config.header_timeout_polls {
                        log::error!(
                            "Device silent for {} read timeouts without a header, giving up",
                            self.polls_waited
                        );
                        return self.terminate(TerminationReason::HeaderTimeout);
                    }
                }
                Step::Continue
            }
            Poll::Fault(FaultKind::DecodeInvalid) => {
                self.skips.decode_errors += 1;
                log::warn!("Failed to decode line, skipping");
                self.sink.on_skip(&LineSkip {
                    kind: SkipKind::Decode,
                    excerpt: String::new(),
                });
                Step::Continue
            }
            Poll::Fault(FaultKind::Disconnected) => {
                self.terminate(TerminationReason::Disconnected)
            }
            Poll::Fault(FaultKind::PermissionDenied) => {
                self.terminate(TerminationReason::PermissionDenied)
            }
            Poll::Fault(FaultKind::Interrupted) => self.terminate(TerminationReason::Interrupted),
            Poll::EndOfStream => self.terminate(TerminationReason::StreamEnd),
        }
    }

    /// Feed one received line into the state machine
    pub fn handle_line(&mut self, line: &RawLine) -> Step {
        let text = line.text.trim();
        match self.phase {
            SessionPhase::AwaitingSchema => self.await_schema(text),
            SessionPhase::StreamingData => {
                self.stream_line(text, line.host_arrival_us);
                Step::Continue
            }
            SessionPhase::Terminated => match self.reason {
                Some(reason) => Step::Terminated(reason),
                None => Step::Continue,
            },
        }
    }

    fn await_schema(&mut self, text: &str) -> Step {
        self.lines_seen += 1;

        if SchemaDetector::is_candidate(text) {
            match self.detector.detect(text) {
                Ok(schema) if schema.resolved => {
                    log::info!(
                        "Detected firmware: {} (record marker {:?}, {} columns)",
                        schema.firmware_label,
                        schema.record_marker.as_deref().unwrap_or_default(),
                        schema.column_index.len()
                    );
                    self.schema = schema;
                    self.phase = SessionPhase::StreamingData;
                    return Step::Continue;
                }
                Ok(_) => {
                    log::warn!(
                        "Header matches no known firmware, still waiting ({} / {} lines)",
                        self.lines_seen,
                        self.config.header_timeout_lines
                    );
                }
                Err(SchemaError::MissingRequiredField(field)) => {
                    log::error!("Header missing required field {}", field);
                    return self.terminate(TerminationReason::MissingRequiredField);
                }
            }
        }

        if self.lines_seen > self.config.header_timeout_lines {
            log::error!(
                "No recognized header after {} lines, giving up",
                self.lines_seen
            );
            return self.terminate(TerminationReason::HeaderTimeout);
        }
        Step::Continue
    }

    fn stream_line(&mut self, text: &str, host_arrival_us: i64) {
        if !self.schema.is_record(text) {
            if SchemaDetector::is_candidate(text) {
                self.skips.ignored_headers += 1;
                log::debug!("Ignoring header line received mid-stream");
            } else {
                self.skips.unrecognized += 1;
                log::trace!("Ignoring non-record line");
            }
            return;
        }

        let record = match self.parser.parse(text, &self.schema) {
            Ok(record) => record,
            Err(e) => {
                let excerpt: String = text.chars().take(EXCERPT_LEN).collect();
                log::warn!("Parse error: {} | line: {}", e, excerpt);
                self.skips.record_parse_error(&e);
                self.sink.on_skip(&LineSkip {
                    kind: SkipKind::Parse(e),
                    excerpt,
                });
                return;
            }
        };

        let sample = latency::compute(host_arrival_us, record.device_timestamp_us);
        self.samples.push(sample);

        let sample_record = SampleRecord {
            host_arrival_us,
            device_timestamp_us: record.device_timestamp_us,
            latency_us: sample,
        };
        if let Err(e) = self.sink.on_sample(&sample_record) {
            log::warn!("Failed to record sample: {}", e);
        }

        let every = self.config.report_every;
        if every > 0 && self.samples.len() % every == 0 {
            self.report_progress(sample);
        }
    }

    fn report_progress(&mut self, last: i64) {
        let Some(stats) = self.samples.snapshot() else {
            return;
        };
        let report = ProgressReport {
            count: stats.count,
            median: stats.median,
            p90: stats.p90,
            p99: stats.p99,
            last,
        };
        log::debug!(
            "Progress snapshot: n={} p90={} p99={}",
            report.count,
            fmt_percentile(report.p90),
            fmt_percentile(report.p99)
        );
        if let Err(e) = self.sink.emit_progress(&report) {
            log::warn!("Failed to emit progress report: {}", e);
        }
    }

    /// Enter the terminal state and emit the final report
    ///
    /// Only the first call has any effect; later calls (e.g. an interrupt racing
    /// a disconnect) return the original reason.
    pub fn terminate(&mut self, reason: TerminationReason) -> Step {
        if let Some(existing) = self.reason {
            log::debug!("Already terminated ({}), ignoring {}", existing, reason);
            return Step::Terminated(existing);
        }

        self.phase = SessionPhase::Terminated;
        self.reason = Some(reason);
        if reason.is_clean() {
            log::info!("Session ended: {}", reason);
        } else {
            log::error!("Session ended: {}", reason);
        }

        self.final_stats = self.samples.snapshot();
        match &self.final_stats {
            Some(stats) => {
                let report = FinalReport {
                    stats: stats.clone(),
                    firmware_label: self.schema.firmware_label.clone(),
                    reason,
                };
                if let Err(e) = self.sink.emit_final(&report) {
                    log::error!("Failed to emit final report: {}", e);
                }
            }
            None => log::info!("No samples collected"),
        }

        if self.skips.parse_errors() > 0 || self.skips.decode_errors > 0 {
            log::info!(
                "Skipped lines: {} parse errors, {} decode errors",
                self.skips.parse_errors(),
                self.skips.decode_errors
            );
        }

        Step::Terminated(reason)
    }

    /// Summary of a terminated session; `None` while still running
    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.reason.map(|reason| self.outcome_for(reason))
    }

    fn outcome_for(&self, reason: TerminationReason) -> SessionOutcome {
        SessionOutcome {
            reason,
            firmware_label: self.schema.firmware_label.clone(),
            final_stats: self.final_stats.clone(),
            skips: self.skips.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::schema::{CSI_DATA_MARKER, ESP32_CSI_HEADER};
    use crate::report::MemorySink;

    const T0: i64 = 1_700_000_000_000_000;

    fn session() -> (Session, MemorySink) {
        let sink = MemorySink::new();
        let session = Session::new(
            SessionConfig::default(),
            SignatureRegistry::with_defaults(),
            Box::new(sink.clone()),
        );
        (session, sink)
    }

    /// Data line with the timestamp in column 22, as the default header declares
    fn data_line(device_ts: i64) -> String {
        let mut fields = vec![CSI_DATA_MARKER.to_string()];
        fields.extend((1..22).map(|i| i.to_string()));
        fields.push(device_ts.to_string());
        fields.extend(["128".to_string(), "0".to_string(), "\"[1,2,3]\"".to_string()]);
        fields.join(",")
    }

    #[test]
    fn test_header_resolves_schema() {
        let (mut session, _) = session();
        assert_eq!(session.phase(), SessionPhase::AwaitingSchema);

        let step = session.handle_line(&RawLine::new(ESP32_CSI_HEADER, T0));
        assert_eq!(step, Step::Continue);
        assert_eq!(session.phase(), SessionPhase::StreamingData);
        assert!(session.schema().resolved);
    }

    #[test]
    fn test_sample_flow() {
        let (mut session, sink) = session();
        session.handle_line(&RawLine::new(ESP32_CSI_HEADER, T0));
        session.handle_line(&RawLine::new(data_line(T0), T0 + 1_250));

        assert_eq!(session.samples().as_slice(), &[1_250]);
        assert_eq!(sink.samples().len(), 1);
        assert_eq!(sink.samples()[0].device_timestamp_us, T0);
    }

    #[test]
    fn test_data_before_header_is_not_parsed() {
        let (mut session, _) = session();
        session.handle_line(&RawLine::new(data_line(T0), T0 + 10));
        assert!(session.samples().is_empty());
        assert_eq!(session.lines_seen(), 1);
    }

    #[test]
    fn test_trailing_whitespace_is_stripped() {
        let (mut session, _) = session();
        session.handle_line(&RawLine::new(format!("{}\r", ESP32_CSI_HEADER), T0));
        assert!(session.schema().resolved);
    }

    #[test]
    fn test_terminate_is_at_most_once() {
        let (mut session, sink) = session();
        session.handle_line(&RawLine::new(ESP32_CSI_HEADER, T0));
        session.handle_line(&RawLine::new(data_line(T0), T0 + 5));

        let first = session.terminate(TerminationReason::Interrupted);
        let second = session.terminate(TerminationReason::Disconnected);

        assert_eq!(first, Step::Terminated(TerminationReason::Interrupted));
        assert_eq!(second, Step::Terminated(TerminationReason::Interrupted));
        assert_eq!(sink.finals().len(), 1);
        assert_eq!(sink.finals()[0].reason, TerminationReason::Interrupted);
    }

    #[test]
    fn test_no_final_report_without_samples() {
        let (mut session, sink) = session();
        session.terminate(TerminationReason::StreamEnd);
        assert!(sink.finals().is_empty());
        let outcome = session.outcome().unwrap();
        assert_eq!(outcome.final_stats, None);
        assert_eq!(outcome.firmware_label, "Unknown Firmware");
    }

    #[test]
    fn test_polls_after_termination_are_ignored() {
        let (mut session, _) = session();
        session.handle_poll(Poll::EndOfStream);
        let step = session.handle_poll(Poll::Line(RawLine::new(ESP32_CSI_HEADER, T0)));
        assert_eq!(step, Step::Terminated(TerminationReason::StreamEnd));
        assert_eq!(session.lines_seen(), 0);
    }

    #[test]
    fn test_silent_device_times_out() {
        let (mut session, sink) = session();
        for _ in 0..6 {
            assert_eq!(session.handle_poll(Poll::Empty), Step::Continue);
        }
        assert_eq!(session.phase(), SessionPhase::AwaitingSchema);
        assert_eq!(session.lines_seen(), 0);

        let step = session.handle_poll(Poll::Empty);
        assert_eq!(step, Step::Terminated(TerminationReason::HeaderTimeout));
        assert_eq!(session.polls_waited(), 7);
        assert_eq!(session.outcome().unwrap().exit_code(), 11);
        assert!(sink.finals().is_empty());
    }

    #[test]
    fn test_empty_polls_while_streaming_are_harmless() {
        let (mut session, _) = session();
        session.handle_line(&RawLine::new(ESP32_CSI_HEADER, T0));
        for _ in 0..100 {
            assert_eq!(session.handle_poll(Poll::Empty), Step::Continue);
        }
        assert_eq!(session.phase(), SessionPhase::StreamingData);
        assert_eq!(session.polls_waited(), 0);
        assert_eq!(session.skips().empty_polls, 100);
    }

    #[test]
    fn test_progress_disabled_with_zero_interval() {
        let sink = MemorySink::new();
        let mut session = Session::new(
            SessionConfig {
                report_every: 0,
                ..SessionConfig::default()
            },
            SignatureRegistry::with_defaults(),
            Box::new(sink.clone()),
        );
        session.handle_line(&RawLine::new(ESP32_CSI_HEADER, T0));
        for i in 0..10 {
            session.handle_line(&RawLine::new(data_line(T0 + i), T0 + i + 3));
        }
        assert_eq!(session.samples().len(), 10);
        assert!(sink.progress().is_empty());
    }
}
