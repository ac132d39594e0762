//! Host checks run before a measurement session.

use crate::error::{Error, Result};
use std::process::Command;

const NTP_SYNCED_MARKER: &str = "System clock synchronized: yes";

/// Whether `timedatectl` output reports an NTP-synchronized clock
pub fn ntp_synchronized(timedatectl_output: &str) -> bool {
    timedatectl_output.contains(NTP_SYNCED_MARKER)
}

/// Query `timedatectl`; `None` when it cannot be run (non-systemd host, Windows)
pub fn check_ntp_sync() -> Option<bool> {
    match Command::new("timedatectl").output() {
        Ok(output) => Some(ntp_synchronized(&String::from_utf8_lossy(&output.stdout))),
        Err(e) => {
            log::warn!("Couldn't verify NTP state: {}", e);
            None
        }
    }
}

/// Check the host clock
///
/// Fails only when `require_sync` is set and synchronization cannot be
/// confirmed; otherwise problems are logged as warnings.
pub fn verify_clock(require_sync: bool) -> Result<()> {
    match check_ntp_sync() {
        Some(true) => {
            log::info!("Host clock is NTP-synchronized");
            Ok(())
        }
        Some(false) if require_sync => Err(Error::ClockNotSynchronized),
        Some(false) => {
            log::warn!("Host clock is not NTP-synchronized; latencies may be offset");
            Ok(())
        }
        None if require_sync => Err(Error::ClockNotSynchronized),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synced_output() {
        let out = "               Local time: Mon 2024-01-01 12:00:00 UTC\n\
                   System clock synchronized: yes\n\
                                 NTP service: active\n";
        assert!(ntp_synchronized(out));
    }

    #[test]
    fn test_unsynced_output() {
        assert!(!ntp_synchronized("System clock synchronized: no\n"));
        assert!(!ntp_synchronized(""));
    }
}
