use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Windows FILETIME, 100ns intervals since 1601-01-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct FileTime(pub u64);

const EPOCH_DELTA_SECS: u64 = 11_644_473_600;

impl FileTime {
    pub fn now() -> Self {
        let since_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self((since_unix.as_secs() + EPOCH_DELTA_SECS) * 10_000_000
            + since_unix.subsec_nanos() as u64 / 100)
    }

    pub fn to_system_time(&self) -> Option<SystemTime> {
        let intervals = self.0;
        let secs = intervals / 10_000_000;
        let nanos = (intervals % 10_000_000) * 100;
        secs.checked_sub(EPOCH_DELTA_SECS)
            .map(|unix_secs| UNIX_EPOCH + Duration::new(unix_secs, nanos as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_epoch_conversion() {
        let epoch = FileTime(EPOCH_DELTA_SECS * 10_000_000);
        assert_eq!(epoch.to_system_time(), Some(UNIX_EPOCH));
    }

    #[test]
    fn pre_1970_has_no_system_time() {
        assert_eq!(FileTime(0).to_system_time(), None);
    }
}
