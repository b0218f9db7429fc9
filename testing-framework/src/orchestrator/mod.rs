// File: testing-framework/src/orchestrator/mod.rs
//
// Deterministic Infrastructure
//
// The pieces every scenario leans on: a network clock the test drives, a
// replayable RNG and the reporter collecting failed expectations.

pub mod clock;
pub mod rng;
pub mod suite;

pub use clock::ManualTimeKeeper;
pub use rng::TestRng;
pub use suite::TestSuite;
