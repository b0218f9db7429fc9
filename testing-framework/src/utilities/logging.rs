// File: testing-framework/src/utilities/logging.rs
//
// Test logging. Output goes through the test harness capture, so it only
// shows for failing tests or with `--nocapture`. Filter with RUST_LOG.

/// Install env_logger for the current test binary. Safe to call from every
/// test; only the first call installs the logger.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
