// File: testing-framework/src/jtx/mod.rs
//
// Transaction Test Kit
//
// Scenarios describe a transaction as a JSON template plus funclets, small
// callables that adjust it before submission, and requirements checked
// after it applied:
//
//     env.apply(pay(&alice, &bob, xrp(10)), &[fee(10), require(balance(&bob, xrp(10)))]);
//
// `Env` owns the application and turns templates into signed transactions.

pub mod account;
pub mod amount;
pub mod env;
pub mod envconfig;
pub mod funclets;
pub mod requires;

pub use account::Account;
pub use amount::{drops, xrp, xrp_frac, Iou};
pub use env::{Env, EnvError};
pub use envconfig::{envconfig, envconfig_with, no_admin, validator};
pub use funclets::*;
pub use requires::*;

use serde_json::{json, Value};
use std::{fmt, sync::Arc};
use trackable_common::{ter::Ter, transaction::Transaction};

/// Check run against the environment after a transaction applied with the
/// expected result.
pub type Requirement = Arc<dyn Fn(&Env) -> anyhow::Result<()> + Send + Sync>;

/// Replaces autofill signing for one transaction.
pub type Signer = Arc<dyn Fn(&Env, &mut JTx) + Send + Sync>;

/// A modifier of a pending transaction.
pub enum Funclet {
    /// Runs before autofill, on the JSON and the JTx settings.
    WithJson(Box<dyn Fn(&Env, &mut JTx) + Send + Sync>),
    /// Runs after the JSON was parsed. Inspection only.
    WithTx(Box<dyn Fn(&Env, &JTx) + Send + Sync>),
}

impl Funclet {
    pub fn with_json(f: impl Fn(&Env, &mut JTx) + Send + Sync + 'static) -> Self {
        Funclet::WithJson(Box::new(f))
    }

    pub fn with_tx(f: impl Fn(&Env, &JTx) + Send + Sync + 'static) -> Self {
        Funclet::WithTx(Box::new(f))
    }
}

impl fmt::Debug for Funclet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Funclet::WithJson(_) => f.write_str("Funclet::WithJson"),
            Funclet::WithTx(_) => f.write_str("Funclet::WithTx"),
        }
    }
}

/// A transaction being prepared for submission.
#[derive(Clone)]
pub struct JTx {
    pub jv: Value,
    /// The parsed transaction, `None` when the JSON is not a valid one.
    pub stx: Option<Arc<Transaction>>,
    pub requires: Vec<Requirement>,
    /// Expected result. `None` accepts any.
    pub ter: Option<Ter>,
    pub fill_fee: bool,
    pub fill_seq: bool,
    pub fill_sig: bool,
    pub signer: Option<Signer>,
}

impl JTx {
    pub fn new(jv: Value) -> Self {
        Self {
            jv,
            stx: None,
            requires: Vec::new(),
            ter: Some(Ter::tesSUCCESS),
            fill_fee: true,
            fill_seq: true,
            fill_sig: true,
            signer: None,
        }
    }

    /// The `Account` field, as base58.
    pub fn account(&self) -> Option<&str> {
        self.jv.get("Account").and_then(Value::as_str)
    }
}

impl Default for JTx {
    fn default() -> Self {
        Self::new(json!({}))
    }
}

impl fmt::Debug for JTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JTx")
            .field("jv", &self.jv)
            .field("stx", &self.stx)
            .field("requires", &self.requires.len())
            .field("ter", &self.ter)
            .field("fill_fee", &self.fill_fee)
            .field("fill_seq", &self.fill_seq)
            .field("fill_sig", &self.fill_sig)
            .field("signer", &self.signer.is_some())
            .finish()
    }
}
