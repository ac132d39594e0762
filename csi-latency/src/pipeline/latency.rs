//! Naive one-way latency

use crate::core::types::LatencySample;

/// Host arrival time minus device timestamp, in microseconds
///
/// No clock-offset correction is applied, so the result can be negative when
/// the device clock runs ahead of the host clock.
#[inline]
pub fn compute(host_arrival_us: i64, device_timestamp_us: i64) -> LatencySample {
    host_arrival_us.saturating_sub(device_timestamp_us)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_latency() {
        assert_eq!(compute(100_000, 40_000), 60_000);
    }

    #[test]
    fn test_negative_latency_preserved() {
        assert_eq!(compute(100, 500), -400);
    }

    #[test]
    fn test_zero_latency() {
        let t = 1_700_000_000_000_000;
        assert_eq!(compute(t, t), 0);
    }
}
