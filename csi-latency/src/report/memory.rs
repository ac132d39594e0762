//! In-memory sink

use crate::core::sink::{FinalReport, LineSkip, ProgressReport, ReportSink};
use crate::core::types::SampleRecord;
use crate::error::Result;
use std::sync::{Arc, Mutex, MutexGuard};

/// Sink that stores every event
///
/// Clones share storage, so a clone kept by the caller observes what the
/// session emitted through the boxed original.
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemorySinkInner>>,
}

#[derive(Default)]
struct MemorySinkInner {
    samples: Vec<SampleRecord>,
    skips: Vec<LineSkip>,
    progress: Vec<ProgressReport>,
    finals: Vec<FinalReport>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemorySinkInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn samples(&self) -> Vec<SampleRecord> {
        self.lock().samples.clone()
    }

    pub fn skips(&self) -> Vec<LineSkip> {
        self.lock().skips.clone()
    }

    pub fn progress(&self) -> Vec<ProgressReport> {
        self.lock().progress.clone()
    }

    pub fn finals(&self) -> Vec<FinalReport> {
        self.lock().finals.clone()
    }
}

impl ReportSink for MemorySink {
    fn on_sample(&mut self, sample: &SampleRecord) -> Result<()> {
        self.lock().samples.push(*sample);
        Ok(())
    }

    fn on_skip(&mut self, skip: &LineSkip) {
        self.lock().skips.push(skip.clone());
    }

    fn emit_progress(&mut self, report: &ProgressReport) -> Result<()> {
        self.lock().progress.push(report.clone());
        Ok(())
    }

    fn emit_final(&mut self, report: &FinalReport) -> Result<()> {
        self.lock().finals.push(report.clone());
        Ok(())
    }
}
