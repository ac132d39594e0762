//! Report sinks
//!
//! - [`ConsoleReporter`]: progress and final stats through the `log` facade
//! - [`CsvRecorder`]: raw samples and final stats written to CSV files
//! - [`MemorySink`]: keeps everything in memory for tests and embedding
//! - [`MultiSink`]: forwards to several sinks

mod console;
mod memory;
mod recorder;

pub use console::ConsoleReporter;
pub use memory::MemorySink;
pub use recorder::{CsvRecorder, RAW_FILE_PREFIX, STATS_FILE_PREFIX};

use crate::core::sink::{FinalReport, LineSkip, ProgressReport, ReportSink};
use crate::core::types::SampleRecord;
use crate::error::Result;

/// Fans every event out to a list of sinks
///
/// Each sink sees every event even when an earlier one fails; the first error
/// is returned.
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn ReportSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn ReportSink>) {
        self.sinks.push(sink);
    }

    pub fn with(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn forward<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut dyn ReportSink) -> Result<()>,
    {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = f(sink.as_mut()) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl ReportSink for MultiSink {
    fn on_sample(&mut self, sample: &SampleRecord) -> Result<()> {
        self.forward(|sink| sink.on_sample(sample))
    }

    fn on_skip(&mut self, skip: &LineSkip) {
        for sink in &mut self.sinks {
            sink.on_skip(skip);
        }
    }

    fn emit_progress(&mut self, report: &ProgressReport) -> Result<()> {
        self.forward(|sink| sink.emit_progress(report))
    }

    fn emit_final(&mut self, report: &FinalReport) -> Result<()> {
        self.forward(|sink| sink.emit_final(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct FailingSink;

    impl ReportSink for FailingSink {
        fn emit_progress(&mut self, _report: &ProgressReport) -> Result<()> {
            Err(Error::Other("disk full".to_string()))
        }

        fn emit_final(&mut self, _report: &FinalReport) -> Result<()> {
            Err(Error::Other("disk full".to_string()))
        }
    }

    #[test]
    fn test_failure_does_not_starve_later_sinks() {
        let memory = MemorySink::new();
        let mut multi = MultiSink::new()
            .with(Box::new(FailingSink))
            .with(Box::new(memory.clone()));
        assert_eq!(multi.len(), 2);

        let report = ProgressReport {
            count: 500,
            median: 12.0,
            p90: Some(20),
            p99: Some(30),
            last: 11,
        };
        assert!(multi.emit_progress(&report).is_err());
        assert_eq!(memory.progress(), vec![report]);
    }

    #[test]
    fn test_samples_forwarded() {
        let memory = MemorySink::new();
        let mut multi = MultiSink::new().with(Box::new(memory.clone()));
        let sample = SampleRecord {
            host_arrival_us: 10,
            device_timestamp_us: 4,
            latency_us: 6,
        };
        multi.on_sample(&sample).unwrap();
        assert_eq!(memory.samples(), vec![sample]);
    }
}
