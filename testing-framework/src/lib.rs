//! # Trackable Testing Framework
//!
//! In-process test environment for the Trackable ledger daemon.
//!
//! ## Architecture Overview
//!
//! - **orchestrator**: manual network clock, seeded RNG and failure
//!   recording shared by every scenario
//! - **client**: request/response and websocket clients over the daemon's
//!   in-process RPC service
//! - **jtx**: `Env`, accounts, amounts, transaction templates, funclets and
//!   requirement predicates
//! - **utilities**: temporary node stores, predictable node objects, test
//!   logging and a validator list publisher
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trackable_testing_framework::prelude::*;
//!
//! #[test]
//! fn test_simple_payment() {
//!     let mut env = Env::new();
//!     let alice = Account::new("alice");
//!     let bob = Account::new("bob");
//!     env.fund(xrp(10_000), [&alice, &bob]);
//!     env.apply(pay(&alice, &bob, xrp(100)), &[require(balance(&bob, xrp(10_100)))]);
//!     env.close();
//! }
//! ```
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: the ledger closes only when the test says so, at the
//!    time the test picks
//! 2. **Scoped**: each `Env` owns its application and stops it on drop
//! 3. **Recorded failures**: requirement mismatches are collected and
//!    reported together when the environment goes away

#![warn(clippy::all)]

/// Clock, RNG and failure recording
pub mod orchestrator;

/// Clients over the in-process RPC service
pub mod client;

/// Transaction test kit
pub mod jtx;

/// Shared utilities
pub mod utilities;

// Convenient re-exports for common usage
pub mod prelude;

pub use jtx::{Account, Env, EnvError};
pub use orchestrator::{ManualTimeKeeper, TestRng, TestSuite};

/// Framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
