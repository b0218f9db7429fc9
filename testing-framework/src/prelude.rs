// File: testing-framework/src/prelude.rs
//
// Everything a scenario usually needs, in one import.

pub use crate::client::{AbstractClient, ClientError, JsonRpcClient, WsClient};
pub use crate::jtx::env::{notrackable, Fundable, NoTrackable};
pub use crate::jtx::*;
pub use crate::orchestrator::{ManualTimeKeeper, TestRng, TestSuite};
pub use crate::utilities::{init_test_logging, TempNodeStore};

pub use trackable_common::{
    amount::{Amount, Drops, IouAmount, Issue},
    crypto::{AccountId, Hash256, KeyPair},
    features::{FeatureId, FeatureSet},
    flags::{asf, lsf, tf},
    ter::Ter,
    time::NetTime,
};
pub use trackable_daemon::config::Config;
pub use trackable_daemon::ledger::ReadView;
