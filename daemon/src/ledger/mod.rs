//! Ledgers, their entries and the views transactions are applied through.

pub mod entry;
pub mod helpers;
pub mod keylet;
pub mod ledger;
pub mod view;

pub use self::ledger::*;
pub use entry::*;
pub use view::*;

use thiserror::Error;
use trackable_common::crypto::Hash256;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Ledger entry {0} not found")]
    EntryNotFound(Hash256),
    #[error("Ledger {0} is not accepted")]
    NotAccepted(u32),
}
