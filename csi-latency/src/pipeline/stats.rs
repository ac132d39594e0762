//! Latency statistics over the full session sample set.
//!
//! Snapshots are recomputed from scratch by sorting a copy of the samples. At
//! the reporting cadence (every few hundred samples) the O(n log n) cost is
//! negligible next to serial I/O.
//!
//! Percentiles use the "exclusive" sample-quantile definition: the data is cut
//! into `q` equal-probability groups with `m = n + 1` linear interpolation
//! between order statistics, and the cut point is truncated toward zero. p90 is
//! only reported from 10 samples on and p99 from 99 samples on.

use crate::core::types::LatencySample;
use std::fmt;

/// Minimum sample count before p90 is reported
pub const P90_MIN_SAMPLES: usize = 10;

/// Minimum sample count before p99 is reported
pub const P99_MIN_SAMPLES: usize = 99;

/// Summary of a sample set at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub count: usize,
    pub median: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub stdev: f64,
    pub min: LatencySample,
    pub max: LatencySample,
    pub p90: Option<i64>,
    pub p99: Option<i64>,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Final stats ({} samples):", self.count)?;
        writeln!(f, "  Median latency: {:.0} µs", self.median)?;
        writeln!(f, "  Std dev:        {:.0} µs", self.stdev)?;
        writeln!(f, "  Min / Max:      {} / {} µs", self.min, self.max)?;
        write!(
            f,
            "  p90 / p99:      {} / {} µs",
            fmt_percentile(self.p90),
            fmt_percentile(self.p99)
        )
    }
}

/// Render an optional percentile, `N/A` when unavailable
pub fn fmt_percentile(value: Option<i64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

/// Compute a snapshot; `None` for an empty sample set
pub fn snapshot(samples: &[LatencySample]) -> Option<StatsSnapshot> {
    if samples.is_empty() {
        return None;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let count = sorted.len();

    let p90 = (count >= P90_MIN_SAMPLES).then(|| quantile_cut(&sorted, 10, 9));
    let p99 = (count >= P99_MIN_SAMPLES).then(|| quantile_cut(&sorted, 100, 99));

    Some(StatsSnapshot {
        count,
        median: median(&sorted),
        stdev: sample_stdev(&sorted),
        min: sorted[0],
        max: sorted[count - 1],
        p90,
        p99,
    })
}

/// Median of sorted, non-empty data
fn median(sorted: &[LatencySample]) -> f64 {
    let n = sorted.len();
    let mid = n / 2;
    if n % 2 == 1 {
        sorted[mid] as f64
    } else {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    }
}

/// Sample standard deviation, 0 for fewer than two values
fn sample_stdev(values: &[LatencySample]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    variance.sqrt()
}

/// `cut`-th of the `groups - 1` cut points splitting `sorted` into `groups`
/// equal-probability groups (exclusive method), truncated toward zero
///
/// Requires `sorted.len() >= 2` and `1 <= cut < groups`.
fn quantile_cut(sorted: &[LatencySample], groups: usize, cut: usize) -> i64 {
    let len = sorted.len() as i128;
    let n = groups as i128;
    let i = cut as i128;
    let m = len + 1;

    let j = (i * m / n).clamp(1, len - 1);
    let delta = i * m - j * n;
    let lo = sorted[(j - 1) as usize] as i128;
    let hi = sorted[j as usize] as i128;

    // Integer division truncates toward zero, like int() on the exact quotient
    ((lo * (n - delta) + hi * delta) / n) as i64
}

/// Append-only latency samples for one session
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    samples: Vec<LatencySample>,
}

impl SampleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: LatencySample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<LatencySample> {
        self.samples.last().copied()
    }

    pub fn as_slice(&self) -> &[LatencySample] {
        &self.samples
    }

    /// Fresh snapshot of everything collected so far
    pub fn snapshot(&self) -> Option<StatsSnapshot> {
        snapshot(&self.samples)
    }
}
