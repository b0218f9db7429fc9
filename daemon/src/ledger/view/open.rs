use indexmap::IndexMap;
use std::sync::Arc;
use trackable_common::{crypto::Hash256, transaction::Transaction};

use super::{RawStateTable, ReadView};
use crate::ledger::{
    entry::LedgerEntry,
    ledger::{Fees, Ledger, LedgerInfo, Rules, TxEntry, TxMeta},
};

#[derive(Clone, Debug)]
enum Base<'a> {
    Shared(Arc<Ledger>),
    Borrowed(&'a Ledger),
}

impl Base<'_> {
    fn ledger(&self) -> &Ledger {
        match self {
            Base::Shared(ledger) => ledger,
            Base::Borrowed(ledger) => ledger,
        }
    }
}

/// Transactions and state changes accumulated on top of a ledger.
///
/// The open ledger of a running application is an `OpenView<'static>` over
/// the last closed ledger. Changes are folded into a ledger with
/// [`OpenView::into_delta`].
#[derive(Clone, Debug)]
pub struct OpenView<'a> {
    base: Base<'a>,
    info: LedgerInfo,
    fees: Fees,
    rules: Rules,
    open: bool,
    items: RawStateTable,
    txs: IndexMap<Hash256, TxEntry>,
}

impl OpenView<'static> {
    /// An open ledger following `base`.
    pub fn new_open(base: Arc<Ledger>, rules: Rules) -> Self {
        let parent = base.info();
        let info = LedgerInfo {
            seq: parent.seq + 1,
            parent_close_time: parent.close_time,
            parent_hash: parent.hash,
            close_time_resolution: parent.close_time_resolution,
            drops: parent.drops,
            accepted: false,
            ..Default::default()
        };
        let fees = *base.fees();
        Self {
            base: Base::Shared(base),
            info,
            fees,
            rules,
            open: true,
            items: RawStateTable::new(),
            txs: IndexMap::new(),
        }
    }
}

impl<'a> OpenView<'a> {
    /// A view over `base` that is open only if the base is.
    pub fn new(base: &'a Ledger) -> Self {
        Self {
            info: base.info().clone(),
            fees: *base.fees(),
            rules: base.rules().clone(),
            open: base.open(),
            base: Base::Borrowed(base),
            items: RawStateTable::new(),
            txs: IndexMap::new(),
        }
    }

    pub fn base(&self) -> &Ledger {
        self.base.ledger()
    }

    pub fn tx_count(&self) -> usize {
        self.txs.len()
    }

    pub fn txs(&self) -> impl Iterator<Item = (&Hash256, &TxEntry)> {
        self.txs.iter()
    }

    pub fn set_rules(&mut self, rules: Rules) {
        self.rules = rules;
    }

    /// Record the outcome of one transaction.
    pub fn raw_tx_insert(&mut self, table: &RawStateTable, tx: Arc<Transaction>, meta: TxMeta) {
        table.apply_to_table(&mut self.items);
        self.txs.insert(
            tx.id(),
            TxEntry {
                tx,
                meta: Some(Arc::new(meta)),
            },
        );
    }

    pub fn items(&self) -> &RawStateTable {
        &self.items
    }

    pub fn into_delta(self) -> (RawStateTable, IndexMap<Hash256, TxEntry>) {
        (self.items, self.txs)
    }
}

impl ReadView for OpenView<'_> {
    fn info(&self) -> &LedgerInfo {
        &self.info
    }

    fn fees(&self) -> &Fees {
        &self.fees
    }

    fn rules(&self) -> &Rules {
        &self.rules
    }

    fn open(&self) -> bool {
        self.open
    }

    fn read(&self, key: &Hash256) -> Option<Arc<LedgerEntry>> {
        self.items.read(self.base.ledger(), key)
    }

    fn tx_read(&self, id: &Hash256) -> Option<TxEntry> {
        self.txs.get(id).cloned()
    }

    fn tx_ids(&self) -> Vec<Hash256> {
        self.txs.keys().copied().collect()
    }
}
