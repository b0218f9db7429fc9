// Network clock source.
//
// The application reads time only through this trait so a test harness can
// drive it manually.

use trackable_common::time::NetTime;

pub trait TimeKeeper: Send + Sync {
    /// Current network time.
    fn now(&self) -> NetTime;

    /// Time proposed as the close time of the open ledger.
    fn close_time(&self) -> NetTime {
        self.now()
    }
}

/// Wall clock time keeper.
pub struct SystemTimeKeeper;

impl TimeKeeper for SystemTimeKeeper {
    fn now(&self) -> NetTime {
        NetTime::now()
    }
}
