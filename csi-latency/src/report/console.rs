//! Log-facade reporter

use crate::core::sink::{FinalReport, LineSkip, ProgressReport, ReportSink, SkipKind};
use crate::error::Result;
use crate::pipeline::stats::fmt_percentile;

/// Writes progress lines and the final summary at `info` level
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    skips: u64,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress line, e.g. `N=   500  median=      50μs  p90=      61μs ...`
    pub fn format_progress(report: &ProgressReport) -> String {
        format!(
            "N={:>6}  median={:>8.0}μs  p90={:>8}μs  p99={:>8}μs  last={:>8}μs",
            report.count,
            report.median,
            fmt_percentile(report.p90),
            fmt_percentile(report.p99),
            report.last
        )
    }
}

impl ConsoleReporter {
    /// End-of-session summary, one log record per line
    fn summary_lines(&self, report: &FinalReport) -> Vec<String> {
        let mut lines = vec![format!("Firmware: {}", report.firmware_label)];
        lines.extend(report.stats.to_string().lines().map(str::to_string));
        if self.skips > 0 {
            lines.push(format!("  Skipped lines:  {}", self.skips));
        }
        lines
    }
}

impl ReportSink for ConsoleReporter {
    fn on_skip(&mut self, skip: &LineSkip) {
        self.skips += 1;
        if let SkipKind::Parse(e) = &skip.kind {
            log::debug!("Skipped line #{}: {}", self.skips, e);
        }
    }

    fn emit_progress(&mut self, report: &ProgressReport) -> Result<()> {
        log::info!("{}", Self::format_progress(report));
        Ok(())
    }

    fn emit_final(&mut self, report: &FinalReport) -> Result<()> {
        for line in self.summary_lines(report) {
            log::info!("{}", line);
        }
        Ok(())
    }
}
