//! CSV recording of raw samples and final statistics
//!
//! Two files per session, sharing a `YYYYmmdd_HHMMSS` stamp:
//!
//! | File | Rows |
//! |------|------|
//! | `csi_latency_data_<stamp>.csv` | `host_rx_epoch_us,esp_epoch_us,delta_us`, one per sample |
//! | `csi_latency_stats_<stamp>.csv` | one summary row written at session end |

use crate::core::sink::{FinalReport, ProgressReport, ReportSink};
use crate::core::types::SampleRecord;
use crate::error::Result;
use crate::pipeline::stats::fmt_percentile;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

pub const RAW_FILE_PREFIX: &str = "csi_latency_data_";
pub const STATS_FILE_PREFIX: &str = "csi_latency_stats_";

const RAW_HEADER: [&str; 3] = ["host_rx_epoch_us", "esp_epoch_us", "delta_us"];

const STATS_HEADER: [&str; 10] = [
    "timestamp",
    "baud_rate",
    "firmware_type",
    "total_samples",
    "median_us",
    "stdev_us",
    "min_us",
    "max_us",
    "p90_us",
    "p99_us",
];

/// Sink that persists samples and the final summary to CSV
pub struct CsvRecorder {
    raw: csv::Writer<File>,
    stats: csv::Writer<File>,
    raw_path: PathBuf,
    stats_path: PathBuf,
    baud_rate: u32,
}

impl CsvRecorder {
    /// Create both files in `dir`, stamped with the current local time
    pub fn create<P: AsRef<Path>>(dir: P, baud_rate: u32) -> Result<Self> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        Self::create_with_stamp(dir, &stamp, baud_rate)
    }

    /// Create both files in `dir` using an explicit file-name stamp
    pub fn create_with_stamp<P: AsRef<Path>>(dir: P, stamp: &str, baud_rate: u32) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let raw_path = dir.join(format!("{}{}.csv", RAW_FILE_PREFIX, stamp));
        let stats_path = dir.join(format!("{}{}.csv", STATS_FILE_PREFIX, stamp));

        let mut raw = csv::Writer::from_path(&raw_path)?;
        raw.write_record(RAW_HEADER)?;
        raw.flush()?;

        let mut stats = csv::Writer::from_path(&stats_path)?;
        stats.write_record(STATS_HEADER)?;
        stats.flush()?;

        log::info!(
            "Recording to {} and {}",
            raw_path.display(),
            stats_path.display()
        );

        Ok(Self {
            raw,
            stats,
            raw_path,
            stats_path,
            baud_rate,
        })
    }

    pub fn raw_path(&self) -> &Path {
        &self.raw_path
    }

    pub fn stats_path(&self) -> &Path {
        &self.stats_path
    }
}

impl ReportSink for CsvRecorder {
    fn on_sample(&mut self, sample: &SampleRecord) -> Result<()> {
        self.raw.write_record(&[
            sample.host_arrival_us.to_string(),
            sample.device_timestamp_us.to_string(),
            sample.latency_us.to_string(),
        ])?;
        Ok(())
    }

    fn emit_progress(&mut self, _report: &ProgressReport) -> Result<()> {
        // Bound data loss on a hard crash to one reporting interval
        self.raw.flush()?;
        Ok(())
    }

    fn emit_final(&mut self, report: &FinalReport) -> Result<()> {
        self.raw.flush()?;

        let stats = &report.stats;
        let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        self.stats.write_record(&[
            timestamp.to_string(),
            self.baud_rate.to_string(),
            report.firmware_label.clone(),
            stats.count.to_string(),
            format!("{:.0}", stats.median),
            format!("{:.0}", stats.stdev),
            stats.min.to_string(),
            stats.max.to_string(),
            fmt_percentile(stats.p90),
            fmt_percentile(stats.p99),
        ])?;
        self.stats.flush()?;

        log::info!("Final statistics written to {}", self.stats_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TerminationReason;
    use crate::pipeline::stats::snapshot;

    #[test]
    fn test_files_created_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = CsvRecorder::create_with_stamp(dir.path(), "20240101_120000", 921_600)
            .unwrap();

        assert_eq!(
            recorder.raw_path().file_name().unwrap(),
            "csi_latency_data_20240101_120000.csv"
        );
        let raw = fs::read_to_string(recorder.raw_path()).unwrap();
        assert_eq!(raw, "host_rx_epoch_us,esp_epoch_us,delta_us\n");
        let stats = fs::read_to_string(recorder.stats_path()).unwrap();
        assert!(stats.starts_with("timestamp,baud_rate,firmware_type,total_samples"));
    }

    #[test]
    fn test_samples_and_final_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = CsvRecorder::create_with_stamp(dir.path(), "s", 115_200).unwrap();

        for (host, esp) in [(1_000_150, 1_000_100), (1_000_260, 1_000_200)] {
            recorder
                .on_sample(&SampleRecord {
                    host_arrival_us: host,
                    device_timestamp_us: esp,
                    latency_us: host - esp,
                })
                .unwrap();
        }
        recorder
            .emit_final(&FinalReport {
                stats: snapshot(&[50, 60]).unwrap(),
                firmware_label: "ESP32 CSI Receiver".to_string(),
                reason: TerminationReason::StreamEnd,
            })
            .unwrap();

        let raw = fs::read_to_string(recorder.raw_path()).unwrap();
        let rows: Vec<&str> = raw.lines().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], "1000150,1000100,50");
        assert_eq!(rows[2], "1000260,1000200,60");

        let stats = fs::read_to_string(recorder.stats_path()).unwrap();
        let row = stats.lines().nth(1).unwrap();
        assert!(row.ends_with(",115200,ESP32 CSI Receiver,2,55,7,50,60,N/A,N/A"));
    }
}
