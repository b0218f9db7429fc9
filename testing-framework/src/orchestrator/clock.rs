// File: testing-framework/src/orchestrator/clock.rs
//
// Manual Network Clock
//
// The application reads network time only through its TimeKeeper. The test
// environment hands it this clock so ledger close times are decided by the
// test, never by the wall clock.

use std::{
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};
use trackable_common::time::NetTime;
use trackable_daemon::time_keeper::TimeKeeper;

/// Network clock that only moves when told to.
///
/// `Env` sets it before every close so the ledger closes at the requested
/// time, then parks it on the close time of the ledger that was accepted.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use trackable_common::time::NetTime;
/// use trackable_daemon::time_keeper::TimeKeeper;
/// use trackable_testing_framework::orchestrator::ManualTimeKeeper;
///
/// let clock = ManualTimeKeeper::new(NetTime::from_secs(1_000));
/// clock.advance(Duration::from_secs(5));
/// assert_eq!(clock.now(), NetTime::from_secs(1_005));
/// ```
#[derive(Debug)]
pub struct ManualTimeKeeper {
    now: AtomicU32,
}

impl ManualTimeKeeper {
    /// Create a clock stopped at `start`.
    pub fn new(start: NetTime) -> Self {
        Self {
            now: AtomicU32::new(start.as_secs()),
        }
    }

    /// Move the clock to `time`. The clock may go backwards.
    pub fn set(&self, time: NetTime) {
        self.now.store(time.as_secs(), Ordering::SeqCst);
    }

    /// Move the clock forward by `by`, rounded down to whole seconds.
    pub fn advance(&self, by: Duration) {
        let secs = u32::try_from(by.as_secs()).unwrap_or(u32::MAX);
        self.now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(secs))
            })
            .ok();
    }
}

impl Default for ManualTimeKeeper {
    fn default() -> Self {
        Self::new(NetTime::now())
    }
}

impl TimeKeeper for ManualTimeKeeper {
    fn now(&self) -> NetTime {
        NetTime::from_secs(self.now.load(Ordering::SeqCst))
    }
}
