// File: testing-framework/src/orchestrator/suite.rs
//
// Test Suite Reporter
//
// Scenario code records failed expectations instead of panicking on the
// first one, so a single run reports every broken check. Failures nobody
// claimed through `take_failures` fail the test when the suite is dropped.

use log::error;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Collector of expectation results for one test.
///
/// # Examples
///
/// ```rust
/// use trackable_testing_framework::orchestrator::TestSuite;
///
/// let suite = TestSuite::new("example");
/// assert!(suite.expect(1 + 1 == 2, "arithmetic"));
/// suite.fail("recorded on purpose");
/// assert_eq!(suite.take_failures(), vec!["recorded on purpose".to_string()]);
/// ```
#[derive(Debug)]
pub struct TestSuite {
    name: String,
    passes: AtomicUsize,
    failures: Mutex<Vec<String>>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passes: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record `condition`, with `message` as the failure text. Returns the
    /// condition so callers can skip dependent checks.
    pub fn expect(&self, condition: bool, message: impl AsRef<str>) -> bool {
        if condition {
            self.pass();
        } else {
            self.fail(message);
        }
        condition
    }

    pub fn pass(&self) {
        self.passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fail(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        error!("[{}] {}", self.name, message);
        self.failures.lock().push(message.to_owned());
    }

    pub fn passes(&self) -> usize {
        self.passes.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> usize {
        self.failures.lock().len()
    }

    /// Claim the failures recorded so far. Claimed failures no longer fail
    /// the test on drop.
    pub fn take_failures(&self) -> Vec<String> {
        std::mem::take(&mut *self.failures.lock())
    }
}

impl Drop for TestSuite {
    fn drop(&mut self) {
        // A second panic while unwinding would abort the test binary
        if std::thread::panicking() {
            return;
        }
        let failures = self.failures.get_mut();
        if !failures.is_empty() {
            panic!(
                "{} failure(s) in {}:\n  {}",
                failures.len(),
                self.name,
                failures.join("\n  ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_counts() {
        let suite = TestSuite::new("counts");
        assert!(suite.expect(true, "never shown"));
        assert!(!suite.expect(false, "shown"));
        assert_eq!(suite.passes(), 1);
        assert_eq!(suite.failure_count(), 1);
        assert_eq!(suite.take_failures(), vec!["shown".to_string()]);
        assert_eq!(suite.failure_count(), 0);
    }

    #[test]
    #[should_panic(expected = "1 failure(s) in unclaimed")]
    fn test_unclaimed_failures_panic_on_drop() {
        let suite = TestSuite::new("unclaimed");
        suite.fail("left behind");
    }
}
