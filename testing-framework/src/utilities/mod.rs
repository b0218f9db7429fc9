// File: testing-framework/src/utilities/mod.rs
//
// Testing Utilities
//
// Temporary node store directories, test logging and the HTTP publisher
// validator site scenarios fetch lists from.

/// Temporary node store directories and predictable object batches
pub mod storage;

/// env_logger setup for test binaries
pub mod logging;

/// Loopback HTTP server serving a signed validator list
pub mod publisher;

pub use logging::init_test_logging;
pub use publisher::{PublishedValidator, TrustedPublisherServer};
pub use storage::{are_batches_equal, create_predictable_batch, create_temp_dir, TempNodeStore};
