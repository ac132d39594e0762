//! Core abstractions shared by the pipeline and its collaborators.
//!
//! - [`source::LineSource`]: Trait to implement for new line transports
//! - [`sink::ReportSink`]: Trait to implement for new report destinations
//! - [`types`]: Lines, records, samples and termination reasons

pub mod sink;
pub mod source;
pub mod types;

pub use sink::{FinalReport, LineSkip, ProgressReport, ReportSink, SkipKind};
pub use source::{FaultKind, LineSource, Poll};
pub use types::{
    DEVICE_TIMESTAMP_FIELD, HEADER_PREFIX, LatencySample, RawLine, Record, SampleRecord,
    SessionPhase, TerminationReason,
};
