//! Open ledger fee escalation.
//!
//! Fees are compared as levels: a transaction paying exactly the base fee
//! has level 256. Once the open ledger holds more transactions than the
//! number expected per ledger, the level required of the next transaction
//! grows with the square of the open ledger size.

use log::{debug, trace};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use trackable_common::{
    amount::Drops, config::BASE_FEE_LEVEL, features::FEATURE_FEE_ESCALATION, ter::Ter,
    transaction::Transaction,
};

use crate::{
    config::Config,
    ledger::{
        view::{ApplyFlags, OpenView, ReadView},
        Ledger,
    },
    tx,
};

/// `value * mul / div`, computed without overflow. Saturates on a zero
/// divisor.
pub fn mul_div(value: u64, mul: u64, div: u64) -> u64 {
    if div == 0 {
        return u64::MAX;
    }
    let result = value as u128 * mul as u128 / div as u128;
    result.min(u64::MAX as u128) as u64
}

/// Fee level a transaction pays relative to the reference fee.
pub fn fee_level(fee: Drops, base: Drops) -> u64 {
    if base.drops() <= 0 {
        return u64::MAX;
    }
    mul_div(fee.drops().max(0) as u64, BASE_FEE_LEVEL, base.drops() as u64)
}

/// Drops needed to pay `level`, rounded up.
pub fn level_to_drops(level: u64, base: Drops) -> Drops {
    let numerator = level as u128 * base.drops().max(0) as u128;
    let drops = numerator.div_ceil(BASE_FEE_LEVEL as u128);
    Drops::new(drops.min(i64::MAX as u128) as i64)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxQSetup {
    pub minimum_txn_in_ledger: u32,
    pub minimum_escalation_multiplier: u64,
}

impl TxQSetup {
    pub fn from_config(config: &Config) -> Self {
        Self {
            minimum_txn_in_ledger: config.txns_expected(),
            minimum_escalation_multiplier: config.transaction_queue.minimum_escalation_multiplier,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeMetrics {
    /// Transactions per ledger before escalation starts.
    pub txns_expected: u32,
    pub escalation_multiplier: u64,
}

/// Snapshot of the fee state of an open ledger, as reported by
/// `server_info`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenLedgerMetrics {
    pub txns_in_ledger: u32,
    pub txns_expected: u32,
    pub reference_level: u64,
    pub required_level: u64,
    pub escalation_multiplier: u64,
}

impl OpenLedgerMetrics {
    pub fn to_json(&self) -> Value {
        json!({
            "ledger_current_index_txns": self.txns_in_ledger,
            "expected_ledger_size": self.txns_expected,
            "reference_level": self.reference_level.to_string(),
            "open_ledger_level": self.required_level.to_string(),
            "escalation_multiplier": self.escalation_multiplier.to_string(),
        })
    }
}

pub struct TxQ {
    setup: TxQSetup,
    metrics: Mutex<FeeMetrics>,
}

pub type SharedTxQ = Arc<TxQ>;

impl TxQ {
    pub fn new(setup: TxQSetup) -> Self {
        let metrics = FeeMetrics {
            txns_expected: setup.minimum_txn_in_ledger,
            escalation_multiplier: setup.minimum_escalation_multiplier,
        };
        Self {
            setup,
            metrics: Mutex::new(metrics),
        }
    }

    pub fn fee_metrics(&self) -> FeeMetrics {
        *self.metrics.lock()
    }

    /// Level the next transaction must pay to get into `view`.
    pub fn required_fee_level<V: ReadView + ?Sized>(&self, view: &V, txns_in_ledger: usize) -> u64 {
        if !view.rules().enabled(&FEATURE_FEE_ESCALATION) {
            return BASE_FEE_LEVEL;
        }
        let metrics = self.fee_metrics();
        let current = txns_in_ledger as u64;
        let target = metrics.txns_expected as u64;
        if current <= target {
            return BASE_FEE_LEVEL;
        }
        mul_div(
            metrics.escalation_multiplier,
            current * current,
            target * target,
        )
        .max(BASE_FEE_LEVEL)
    }

    /// Drops the next transaction must pay to get into `view`.
    pub fn open_ledger_fee(&self, view: &OpenView<'_>) -> Drops {
        let level = self.required_fee_level(view, view.tx_count());
        level_to_drops(level, view.fees().base)
    }

    pub fn metrics(&self, view: &OpenView<'_>) -> OpenLedgerMetrics {
        let metrics = self.fee_metrics();
        OpenLedgerMetrics {
            txns_in_ledger: view.tx_count() as u32,
            txns_expected: metrics.txns_expected,
            reference_level: BASE_FEE_LEVEL,
            required_level: self.required_fee_level(view, view.tx_count()),
            escalation_multiplier: metrics.escalation_multiplier,
        }
    }

    /// Apply a transaction to the open ledger, rejecting it when it pays
    /// less than the escalated fee.
    pub fn apply(&self, view: &mut OpenView<'_>, tx: &Arc<Transaction>, flags: ApplyFlags) -> (Ter, bool) {
        let required = self.required_fee_level(view, view.tx_count());
        let paid = fee_level(tx.fee(), view.fees().base);
        if paid < required {
            debug!(
                "Transaction {} pays level {} but {} is required",
                tx.id(),
                paid,
                required
            );
            return (Ter::telINSUF_FEE_P, false);
        }
        tx::apply(view, tx, flags)
    }

    /// Update the expected ledger size and the escalation multiplier from a
    /// freshly closed ledger.
    pub fn process_closed_ledger(&self, ledger: &Ledger) {
        let base = ledger.fees().base;
        let mut levels: Vec<u64> = ledger
            .txs()
            .values()
            .map(|entry| fee_level(entry.tx.fee(), base))
            .collect();
        levels.sort_unstable();

        let mut metrics = self.metrics.lock();
        let size = levels.len() as u32;
        if size > metrics.txns_expected {
            metrics.txns_expected = size;
        } else if size < self.setup.minimum_txn_in_ledger {
            metrics.txns_expected = self.setup.minimum_txn_in_ledger;
        }
        metrics.escalation_multiplier = match levels.len() {
            0 => self.setup.minimum_escalation_multiplier,
            n if n % 2 == 1 => levels[n / 2],
            n => (levels[n / 2 - 1] + levels[n / 2]).div_ceil(2),
        }
        .max(self.setup.minimum_escalation_multiplier);
        trace!(
            "Ledger {} closed with {} transactions, expecting {} at multiplier {}",
            ledger.info().seq,
            size,
            metrics.txns_expected,
            metrics.escalation_multiplier
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackable_common::features::FeatureSet;

    fn queue(target: u32) -> TxQ {
        TxQ::new(TxQSetup {
            minimum_txn_in_ledger: target,
            minimum_escalation_multiplier: 128_000,
        })
    }

    fn escalating_ledger() -> Ledger {
        let mut features = FeatureSet::new();
        features.insert(*FEATURE_FEE_ESCALATION);
        Ledger::genesis(
            &crate::config::FeeSetup::default(),
            &features,
            &[],
            Default::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_fee_level() {
        let base = Drops::new(10);
        assert_eq!(fee_level(Drops::new(10), base), 256);
        assert_eq!(fee_level(Drops::new(20), base), 512);
        assert_eq!(level_to_drops(256, base), Drops::new(10));
        assert_eq!(level_to_drops(227_555, base), Drops::new(8889));
    }

    #[test]
    fn test_escalation_curve() {
        let ledger = escalating_ledger();
        let txq = queue(3);
        let drops: Vec<i64> = (2..7)
            .map(|n| level_to_drops(txq.required_fee_level(&ledger, n), Drops::new(10)).drops())
            .collect();
        assert_eq!(drops, vec![10, 10, 8889, 13889, 20000]);
    }

    #[test]
    fn test_no_escalation_without_feature() {
        let ledger = Ledger::genesis(
            &crate::config::FeeSetup::default(),
            &FeatureSet::new(),
            &[],
            Default::default(),
        )
        .unwrap();
        assert_eq!(queue(3).required_fee_level(&ledger, 50), BASE_FEE_LEVEL);
    }
}
