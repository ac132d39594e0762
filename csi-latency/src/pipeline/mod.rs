//! Measurement pipeline
//!
//! Header detection, record parsing, latency computation, statistics and the
//! session state machine that sequences them one line at a time.

pub mod fields;
pub mod latency;
pub mod record;
pub mod schema;
pub mod session;
pub mod stats;

pub use record::{DEFAULT_TIMESTAMP_FLOOR_US, RecordParser};
pub use schema::{
    FirmwareSignature, SchemaDetector, SchemaState, SignatureRegistry, UNKNOWN_FIRMWARE,
};
pub use session::{Session, SessionConfig, SessionOutcome, SkipCounters, Step};
pub use stats::{SampleSet, StatsSnapshot};
