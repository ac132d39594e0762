//! Host clock helpers

use std::time::{SystemTime, UNIX_EPOCH};

/// Current host time in microseconds since the Unix epoch
///
/// Wall-clock rather than monotonic: device timestamps are epoch-based, so the
/// host side has to be too.
pub fn now_epoch_us() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_micros() as i64,
        Err(e) => -(e.duration().as_micros() as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_after_timestamp_floor() {
        // Any sane host clock is far past 1970-01-01T00:16:40
        assert!(now_epoch_us() > 1_000_000_000);
    }
}
