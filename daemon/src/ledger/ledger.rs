use serde_json::{json, Value};
use std::{collections::BTreeMap, sync::Arc};
use trackable_common::{
    amount::{Amount, Drops},
    config::SYSTEM_CURRENCY_START,
    crypto::{prefix, sha512_half, AccountId, Hash256},
    features::{FeatureId, FeatureSet},
    serializer::Writer,
    ter::Ter,
    time::NetTime,
    transaction::Transaction,
};

use super::{
    entry::{AccountRoot, Amendments, EntryType, LedgerEntry},
    keylet,
    view::{RawStateTable, ReadView},
    LedgerError,
};
use crate::config::{FeeSetup, REFERENCE_FEE_UNITS};

/// Close time resolutions, finest first.
pub const POSSIBLE_CLOSE_RESOLUTIONS: [u32; 6] = [10, 20, 30, 60, 90, 120];
pub const DEFAULT_CLOSE_RESOLUTION: u32 = 30;
// Resolution gets finer every this many ledgers when validators agree
const INCREASE_RESOLUTION_EVERY: u32 = 8;
// and coarser every this many ledgers when they do not
const DECREASE_RESOLUTION_EVERY: u32 = 1;

pub const CLOSE_FLAG_NO_CONSENSUS_TIME: u8 = 0x01;

pub type StateMap = BTreeMap<Hash256, Arc<LedgerEntry>>;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct LedgerInfo {
    pub seq: u32,
    pub parent_close_time: NetTime,
    pub close_time: NetTime,
    pub close_time_resolution: u32,
    pub close_flags: u8,
    /// Native currency in existence, reduced by destroyed fees.
    pub drops: Drops,
    pub hash: Hash256,
    pub parent_hash: Hash256,
    pub tx_hash: Hash256,
    pub account_hash: Hash256,
    pub accepted: bool,
}

impl LedgerInfo {
    pub fn close_agree(&self) -> bool {
        self.close_flags & CLOSE_FLAG_NO_CONSENSUS_TIME == 0
    }

    pub fn to_json(&self) -> Value {
        json!({
            "ledger_index": self.seq,
            "ledger_hash": self.hash.to_hex(),
            "parent_hash": self.parent_hash.to_hex(),
            "account_hash": self.account_hash.to_hex(),
            "transaction_hash": self.tx_hash.to_hex(),
            "total_coins": self.drops.to_string(),
            "close_time": self.close_time.as_secs(),
            "close_time_human": self.close_time.to_human(),
            "close_time_resolution": self.close_time_resolution,
            "parent_close_time": self.parent_close_time.as_secs(),
            "closed": self.accepted,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fees {
    /// Drops charged for a reference transaction.
    pub base: Drops,
    /// Fee units of a reference transaction.
    pub units: u64,
    pub reserve: Drops,
    pub increment: Drops,
}

impl Fees {
    pub fn from_setup(setup: &FeeSetup) -> Self {
        Self {
            base: Drops::new(setup.reference_fee),
            units: REFERENCE_FEE_UNITS,
            reserve: Drops::new(setup.account_reserve),
            increment: Drops::new(setup.owner_reserve),
        }
    }

    /// Reserve required of an account owning `owner_count` objects.
    pub fn account_reserve(&self, owner_count: u32) -> Drops {
        Drops::new(self.reserve.drops() + owner_count as i64 * self.increment.drops())
    }
}

/// Amendments in force for a view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rules {
    enabled: Arc<FeatureSet>,
}

impl Rules {
    pub fn new(presets: &FeatureSet, amendments: Option<&Amendments>) -> Self {
        let mut enabled = presets.clone();
        if let Some(amendments) = amendments {
            for id in &amendments.enabled {
                enabled.insert(*id);
            }
        }
        Self {
            enabled: Arc::new(enabled),
        }
    }

    pub fn enabled(&self, feature: &FeatureId) -> bool {
        self.enabled.contains(feature)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeAction {
    Created,
    Modified,
    Deleted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AffectedNode {
    pub action: NodeAction,
    pub entry_type: EntryType,
    pub key: Hash256,
}

/// Outcome of applying one transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxMeta {
    pub index: u32,
    pub result: Ter,
    pub affected: Vec<AffectedNode>,
    pub delivered: Option<Amount>,
}

impl TxMeta {
    pub fn to_json(&self) -> Value {
        let nodes: Vec<Value> = self
            .affected
            .iter()
            .map(|node| {
                let kind = match node.action {
                    NodeAction::Created => "CreatedNode",
                    NodeAction::Modified => "ModifiedNode",
                    NodeAction::Deleted => "DeletedNode",
                };
                json!({ kind: {
                    "LedgerEntryType": node.entry_type.name(),
                    "LedgerIndex": node.key.to_hex(),
                }})
            })
            .collect();
        let mut meta = json!({
            "TransactionIndex": self.index,
            "TransactionResult": self.result.token(),
            "AffectedNodes": nodes,
        });
        if let Some(delivered) = &self.delivered {
            meta["delivered_amount"] = delivered.to_json();
        }
        meta
    }
}

#[derive(Clone, Debug)]
pub struct TxEntry {
    pub tx: Arc<Transaction>,
    pub meta: Option<Arc<TxMeta>>,
}

/// Round a close time to the resolution. A zero time stays zero.
pub fn round_close_time(close_time: NetTime, resolution: u32) -> NetTime {
    if close_time.as_secs() == 0 || resolution == 0 {
        return close_time;
    }
    let shifted = close_time.as_secs() as u64 + (resolution / 2) as u64;
    NetTime::from_secs((shifted - shifted % resolution as u64) as u32)
}

/// Resolution of the ledger following one closed with `previous`.
pub fn next_close_resolution(previous: u32, previous_agree: bool, seq: u32) -> u32 {
    let position = POSSIBLE_CLOSE_RESOLUTIONS
        .iter()
        .position(|r| *r == previous);
    let Some(position) = position else {
        return previous;
    };
    if !previous_agree && seq % DECREASE_RESOLUTION_EVERY == 0 {
        if let Some(coarser) = POSSIBLE_CLOSE_RESOLUTIONS.get(position + 1) {
            return *coarser;
        }
    }
    if previous_agree && seq % INCREASE_RESOLUTION_EVERY == 0 && position > 0 {
        return POSSIBLE_CLOSE_RESOLUTIONS[position - 1];
    }
    previous
}

/// A ledger: header, state map and transactions. Immutable once accepted.
#[derive(Clone, Debug)]
pub struct Ledger {
    info: LedgerInfo,
    fees: Fees,
    rules: Rules,
    state: StateMap,
    txs: BTreeMap<Hash256, TxEntry>,
}

impl Ledger {
    /// The first ledger: the master account holds every drop.
    pub fn genesis(
        setup: &FeeSetup,
        presets: &FeatureSet,
        amendments: &[FeatureId],
        master: AccountId,
    ) -> Result<Self, LedgerError> {
        let mut state = StateMap::new();
        let root = LedgerEntry::AccountRoot(AccountRoot::new(
            master,
            Drops::new(SYSTEM_CURRENCY_START),
        ));
        state.insert(root.key(), Arc::new(root));
        let mut amendment_entry = None;
        if !amendments.is_empty() {
            let entry = Amendments {
                enabled: amendments.to_vec(),
                majorities: Vec::new(),
            };
            amendment_entry = Some(entry.clone());
            let entry = LedgerEntry::Amendments(entry);
            state.insert(entry.key(), Arc::new(entry));
        }
        let mut ledger = Ledger {
            info: LedgerInfo {
                seq: 1,
                close_time_resolution: DEFAULT_CLOSE_RESOLUTION,
                drops: Drops::new(SYSTEM_CURRENCY_START),
                ..Default::default()
            },
            fees: Fees::from_setup(setup),
            rules: Rules::new(presets, amendment_entry.as_ref()),
            state,
            txs: BTreeMap::new(),
        };
        ledger.accept(NetTime::default(), true)?;
        Ok(ledger)
    }

    /// The open successor of a closed ledger.
    pub fn successor(previous: &Ledger, presets: &FeatureSet) -> Self {
        let prev = &previous.info;
        let seq = prev.seq + 1;
        let resolution =
            next_close_resolution(prev.close_time_resolution, prev.close_agree(), seq);
        let close_time = if prev.close_time.as_secs() == 0 {
            round_close_time(prev.close_time, resolution)
        } else {
            prev.close_time + std::time::Duration::from_secs(resolution as u64)
        };
        let amendments = previous
            .state
            .get(&keylet::amendments().key)
            .and_then(|e| e.as_amendments().cloned());
        Ledger {
            info: LedgerInfo {
                seq,
                parent_close_time: prev.close_time,
                close_time,
                close_time_resolution: resolution,
                close_flags: 0,
                drops: prev.drops,
                hash: Hash256::zero(),
                parent_hash: prev.hash,
                tx_hash: Hash256::zero(),
                account_hash: Hash256::zero(),
                accepted: false,
            },
            fees: previous.fees,
            rules: Rules::new(presets, amendments.as_ref()),
            state: previous.state.clone(),
            txs: BTreeMap::new(),
        }
    }

    /// Fold an open ledger's changes into this not yet accepted ledger.
    pub fn apply_delta(
        &mut self,
        table: &RawStateTable,
        txs: impl IntoIterator<Item = (Hash256, TxEntry)>,
    ) {
        table.apply_to_map(&mut self.state);
        self.info.drops = self.info.drops - table.destroyed_drops();
        self.txs.extend(txs);
    }

    pub fn raw_replace(&mut self, entry: LedgerEntry) {
        self.state.insert(entry.key(), Arc::new(entry));
    }

    /// Round the close time, compute hashes and freeze the ledger.
    pub fn accept(&mut self, close_time: NetTime, close_agree: bool) -> Result<(), LedgerError> {
        let resolution = self.info.close_time_resolution;
        let mut close_time = round_close_time(close_time, resolution);
        if self.info.seq > 1 && close_time <= self.info.parent_close_time {
            close_time = self.info.parent_close_time + std::time::Duration::from_secs(1);
        }
        self.info.close_time = close_time;
        if !close_agree {
            self.info.close_flags |= CLOSE_FLAG_NO_CONSENSUS_TIME;
        }
        self.info.account_hash = self.state_hash()?;
        self.info.tx_hash = self.tx_hash();
        self.info.hash = self.header_hash();
        self.info.accepted = true;
        Ok(())
    }

    fn state_hash(&self) -> Result<Hash256, LedgerError> {
        let mut writer = Writer::new();
        writer.write_bytes(&prefix::LEAF_NODE);
        for (key, entry) in &self.state {
            writer.write_hash(key);
            writer.write_vl(&bincode::serialize(entry.as_ref())?);
        }
        Ok(sha512_half(&[writer.as_bytes()]))
    }

    fn tx_hash(&self) -> Hash256 {
        if self.txs.is_empty() {
            return Hash256::zero();
        }
        let ids: Vec<&[u8]> = self.txs.keys().map(|id| id.as_bytes().as_slice()).collect();
        sha512_half(&ids)
    }

    fn header_hash(&self) -> Hash256 {
        let info = &self.info;
        let mut writer = Writer::new();
        writer.write_bytes(&prefix::LEDGER_MASTER);
        writer.write_u32(info.seq);
        writer.write_u64(info.drops.drops() as u64);
        writer.write_hash(&info.parent_hash);
        writer.write_hash(&info.tx_hash);
        writer.write_hash(&info.account_hash);
        writer.write_u32(info.parent_close_time.as_secs());
        writer.write_u32(info.close_time.as_secs());
        writer.write_u8(info.close_time_resolution as u8);
        writer.write_u8(info.close_flags);
        sha512_half(&[writer.as_bytes()])
    }

    pub fn state(&self) -> &StateMap {
        &self.state
    }

    pub fn txs(&self) -> &BTreeMap<Hash256, TxEntry> {
        &self.txs
    }

    pub fn set_rules(&mut self, rules: Rules) {
        self.rules = rules;
    }

    pub fn is_flag_ledger(&self) -> bool {
        self.info.seq % trackable_common::config::FLAG_LEDGER_INTERVAL == 0
    }
}

impl ReadView for Ledger {
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
        false
    }

    fn read(&self, key: &Hash256) -> Option<Arc<LedgerEntry>> {
        self.state.get(key).cloned()
    }

    fn tx_read(&self, id: &Hash256) -> Option<TxEntry> {
        self.txs.get(id).cloned()
    }

    fn tx_ids(&self) -> Vec<Hash256> {
        self.txs.keys().copied().collect()
    }
}
