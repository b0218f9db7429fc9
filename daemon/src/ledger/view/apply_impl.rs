use std::sync::Arc;
use trackable_common::{
    amount::{Amount, Drops},
    crypto::Hash256,
};

use super::{ApplyFlags, ApplyView, RawStateTable, ReadView};
use crate::ledger::{
    entry::LedgerEntry,
    ledger::{AffectedNode, Fees, LedgerInfo, Rules, TxEntry},
};

/// The layer a single transaction writes to.
pub struct ApplyViewImpl<'a> {
    base: &'a dyn ReadView,
    flags: ApplyFlags,
    items: RawStateTable,
    delivered: Option<Amount>,
}

impl<'a> ApplyViewImpl<'a> {
    pub fn new(base: &'a dyn ReadView, flags: ApplyFlags) -> Self {
        Self {
            base,
            flags,
            items: RawStateTable::new(),
            delivered: None,
        }
    }

    pub fn set_delivered(&mut self, amount: Amount) {
        self.delivered = Some(amount);
    }

    pub fn delivered(&self) -> Option<Amount> {
        self.delivered
    }

    /// Drop every change made so far.
    pub fn discard(&mut self) {
        self.items = RawStateTable::new();
        self.delivered = None;
    }

    pub fn affected_nodes(&self) -> Vec<AffectedNode> {
        self.items.affected_nodes(self.base)
    }

    pub fn items(&self) -> &RawStateTable {
        &self.items
    }

    pub fn finish(self) -> RawStateTable {
        self.items
    }
}

impl ReadView for ApplyViewImpl<'_> {
    fn info(&self) -> &LedgerInfo {
        self.base.info()
    }

    fn fees(&self) -> &Fees {
        self.base.fees()
    }

    fn rules(&self) -> &Rules {
        self.base.rules()
    }

    fn open(&self) -> bool {
        self.base.open()
    }

    fn read(&self, key: &Hash256) -> Option<Arc<LedgerEntry>> {
        self.items.read(self.base, key)
    }

    fn tx_read(&self, id: &Hash256) -> Option<TxEntry> {
        self.base.tx_read(id)
    }

    fn tx_ids(&self) -> Vec<Hash256> {
        self.base.tx_ids()
    }
}

impl ApplyView for ApplyViewImpl<'_> {
    fn flags(&self) -> ApplyFlags {
        self.flags
    }

    fn insert(&mut self, entry: LedgerEntry) {
        self.items.insert(entry);
    }

    fn update(&mut self, entry: LedgerEntry) {
        self.items.replace(entry);
    }

    fn erase(&mut self, key: &Hash256) {
        self.items.erase(key);
    }

    fn destroy_drops(&mut self, drops: Drops) {
        self.items.destroy_drops(drops);
    }
}
