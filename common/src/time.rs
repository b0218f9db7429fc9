// Network time: whole seconds since 2000-01-01T00:00:00Z.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Add, Sub},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crate::config::NETWORK_EPOCH_OFFSET;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetTime(u32);

impl NetTime {
    pub const fn from_secs(secs: u32) -> Self {
        NetTime(secs)
    }

    pub const fn as_secs(&self) -> u32 {
        self.0
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        let unix = time
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        NetTime(unix.saturating_sub(NETWORK_EPOCH_OFFSET) as u32)
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn to_human(&self) -> String {
        let unix = (self.0 as u64 + NETWORK_EPOCH_OFFSET) as i64;
        match DateTime::<Utc>::from_timestamp(unix, 0) {
            Some(time) => time.format("%Y-%b-%d %H:%M:%S UTC").to_string(),
            None => self.0.to_string(),
        }
    }
}

impl Add<Duration> for NetTime {
    type Output = NetTime;

    fn add(self, rhs: Duration) -> NetTime {
        NetTime(self.0.saturating_add(rhs.as_secs() as u32))
    }
}

impl Sub<Duration> for NetTime {
    type Output = NetTime;

    fn sub(self, rhs: Duration) -> NetTime {
        NetTime(self.0.saturating_sub(rhs.as_secs() as u32))
    }
}

impl fmt::Debug for NetTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NetTime({})", self.0)
    }
}

impl fmt::Display for NetTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_offset() {
        let epoch = UNIX_EPOCH + Duration::from_secs(NETWORK_EPOCH_OFFSET + 30);
        assert_eq!(NetTime::from_system_time(epoch).as_secs(), 30);
        assert_eq!(NetTime::from_secs(0).to_human(), "2000-Jan-01 00:00:00 UTC");
    }
}
