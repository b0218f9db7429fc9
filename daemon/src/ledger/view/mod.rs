//! Layered views over ledger state.
//!
//! A [`ReadView`] answers reads. An [`ApplyView`] also records changes, which
//! are kept in a [`RawStateTable`] until the owner of the layer folds them
//! into the layer below.

mod apply_impl;
mod open;
mod sandbox;

pub use apply_impl::*;
pub use open::*;
pub use sandbox::*;

use std::{collections::BTreeMap, ops::BitOr, sync::Arc};
use trackable_common::{
    amount::{Amount, Drops},
    crypto::{AccountId, Hash256},
};

use super::{
    entry::LedgerEntry,
    keylet::Keylet,
    ledger::{AffectedNode, Fees, LedgerInfo, NodeAction, Rules, StateMap, TxEntry},
};

/// Flags controlling how a transaction is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ApplyFlags(u32);

impl ApplyFlags {
    pub const NONE: ApplyFlags = ApplyFlags(0);
    pub const NO_CHECK_SIGN: ApplyFlags = ApplyFlags(0x01);
    pub const RETRY: ApplyFlags = ApplyFlags(0x20);
    pub const ADMIN: ApplyFlags = ApplyFlags(0x400);

    pub fn contains(&self, other: ApplyFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ApplyFlags {
    type Output = ApplyFlags;

    fn bitor(self, rhs: ApplyFlags) -> ApplyFlags {
        ApplyFlags(self.0 | rhs.0)
    }
}

pub trait ReadView {
    fn info(&self) -> &LedgerInfo;

    fn fees(&self) -> &Fees;

    fn rules(&self) -> &Rules;

    /// Whether this view is an open ledger. Open ledgers refuse fees an
    /// account cannot pay instead of claiming them.
    fn open(&self) -> bool;

    fn read(&self, key: &Hash256) -> Option<Arc<LedgerEntry>>;

    fn read_keylet(&self, keylet: &Keylet) -> Option<Arc<LedgerEntry>> {
        self.read(&keylet.key)
            .filter(|entry| entry.entry_type() == keylet.entry_type)
    }

    fn exists(&self, keylet: &Keylet) -> bool {
        self.read_keylet(keylet).is_some()
    }

    fn tx_read(&self, id: &Hash256) -> Option<TxEntry>;

    fn tx_ids(&self) -> Vec<Hash256>;

    fn seq(&self) -> u32 {
        self.info().seq
    }

    /// Balance of `account` with `issuer` adjusted for credits that are not
    /// spendable yet.
    fn balance_hook(&self, _account: &AccountId, _issuer: &AccountId, amount: Amount) -> Amount {
        amount
    }
}

pub trait ApplyView: ReadView {
    fn flags(&self) -> ApplyFlags;

    /// Current version of an entry, for modification.
    fn peek(&self, keylet: &Keylet) -> Option<LedgerEntry> {
        self.read_keylet(keylet).map(|entry| entry.as_ref().clone())
    }

    fn insert(&mut self, entry: LedgerEntry);

    fn update(&mut self, entry: LedgerEntry);

    fn erase(&mut self, key: &Hash256);

    /// Remove native currency from existence (fees).
    fn destroy_drops(&mut self, drops: Drops);

    fn credit_hook(
        &mut self,
        _from: &AccountId,
        _to: &AccountId,
        _amount: &Amount,
        _pre_credit_balance: &Amount,
    ) {
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Action {
    Insert(Arc<LedgerEntry>),
    Replace(Arc<LedgerEntry>),
    Erase,
}

/// Pending changes of one view layer.
#[derive(Clone, Debug, Default)]
pub struct RawStateTable {
    items: BTreeMap<Hash256, Action>,
    destroyed: Drops,
}

impl RawStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.destroyed.is_zero()
    }

    /// `None` when the key is untouched; `Some(None)` when it was erased.
    pub fn lookup(&self, key: &Hash256) -> Option<Option<Arc<LedgerEntry>>> {
        self.items.get(key).map(|action| match action {
            Action::Insert(entry) | Action::Replace(entry) => Some(entry.clone()),
            Action::Erase => None,
        })
    }

    pub fn read(&self, base: &dyn ReadView, key: &Hash256) -> Option<Arc<LedgerEntry>> {
        match self.lookup(key) {
            Some(found) => found,
            None => base.read(key),
        }
    }

    pub fn insert(&mut self, entry: LedgerEntry) {
        let key = entry.key();
        let entry = Arc::new(entry);
        let action = match self.items.get(&key) {
            Some(Action::Erase) => Action::Replace(entry),
            _ => Action::Insert(entry),
        };
        self.items.insert(key, action);
    }

    pub fn replace(&mut self, entry: LedgerEntry) {
        let key = entry.key();
        let entry = Arc::new(entry);
        let action = match self.items.get(&key) {
            Some(Action::Insert(_)) => Action::Insert(entry),
            _ => Action::Replace(entry),
        };
        self.items.insert(key, action);
    }

    pub fn erase(&mut self, key: &Hash256) {
        match self.items.get(key) {
            Some(Action::Insert(_)) => {
                self.items.remove(key);
            }
            _ => {
                self.items.insert(*key, Action::Erase);
            }
        }
    }

    pub fn destroy_drops(&mut self, drops: Drops) {
        self.destroyed += drops;
    }

    pub fn destroyed_drops(&self) -> Drops {
        self.destroyed
    }

    /// Fold the changes into the table of the layer below.
    pub fn apply_to_table(&self, target: &mut RawStateTable) {
        for (key, action) in &self.items {
            match action {
                Action::Insert(entry) => target.insert(entry.as_ref().clone()),
                Action::Replace(entry) => target.replace(entry.as_ref().clone()),
                Action::Erase => target.erase(key),
            }
        }
        target.destroy_drops(self.destroyed);
    }

    pub fn apply_to_view(&self, target: &mut dyn ApplyView) {
        for (key, action) in &self.items {
            match action {
                Action::Insert(entry) => target.insert(entry.as_ref().clone()),
                Action::Replace(entry) => target.update(entry.as_ref().clone()),
                Action::Erase => target.erase(key),
            }
        }
        if !self.destroyed.is_zero() {
            target.destroy_drops(self.destroyed);
        }
    }

    pub fn apply_to_map(&self, target: &mut StateMap) {
        for (key, action) in &self.items {
            match action {
                Action::Insert(entry) | Action::Replace(entry) => {
                    target.insert(*key, entry.clone());
                }
                Action::Erase => {
                    target.remove(key);
                }
            }
        }
    }

    /// Metadata view of the changes, given the state they were made on.
    pub fn affected_nodes(&self, base: &dyn ReadView) -> Vec<AffectedNode> {
        self.items
            .iter()
            .filter_map(|(key, action)| {
                let (action, entry_type) = match action {
                    Action::Insert(entry) => (NodeAction::Created, entry.entry_type()),
                    Action::Replace(entry) => (NodeAction::Modified, entry.entry_type()),
                    Action::Erase => (NodeAction::Deleted, base.read(key)?.entry_type()),
                };
                Some(AffectedNode {
                    action,
                    entry_type,
                    key: *key,
                })
            })
            .collect()
    }
}
