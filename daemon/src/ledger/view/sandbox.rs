use std::{
    cmp::Ordering,
    collections::{btree_map::Entry, BTreeMap},
    sync::Arc,
};
use trackable_common::{
    amount::{Amount, Currency, Drops},
    crypto::{AccountId, Hash256},
};

use super::{ApplyFlags, ApplyView, RawStateTable, ReadView};
use crate::ledger::{
    entry::LedgerEntry,
    ledger::{Fees, LedgerInfo, Rules, TxEntry},
};

#[derive(Clone, Debug)]
struct CreditValue {
    low_credits: Amount,
    high_credits: Amount,
    low_orig_balance: Amount,
}

/// What one side of a line sent and received inside a sandbox, and its
/// balance before the first credit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Adjustment {
    pub debits: Amount,
    pub credits: Amount,
    pub orig_balance: Amount,
}

/// Credits made inside a payment that the receiver may not spend until the
/// payment completes.
#[derive(Clone, Debug, Default)]
pub struct DeferredCredits {
    credits: BTreeMap<(AccountId, AccountId, Currency), CreditValue>,
}

fn add_or_keep(a: &Amount, b: &Amount) -> Amount {
    a.checked_add(b).unwrap_or(*a)
}

impl DeferredCredits {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: &AccountId, b: &AccountId, currency: Currency) -> (AccountId, AccountId, Currency) {
        if a < b {
            (*a, *b, currency)
        } else {
            (*b, *a, currency)
        }
    }

    /// Record `amount` moving from `sender` to `receiver`.
    /// `pre_credit_sender_balance` is the sender's balance, from its own
    /// perspective, before this credit.
    pub fn credit(
        &mut self,
        sender: &AccountId,
        receiver: &AccountId,
        amount: &Amount,
        pre_credit_sender_balance: &Amount,
    ) {
        let sender_is_low = sender < receiver;
        match self.credits.entry(Self::key(sender, receiver, amount.currency())) {
            Entry::Vacant(slot) => {
                let value = if sender_is_low {
                    CreditValue {
                        high_credits: *amount,
                        low_credits: amount.zeroed(),
                        low_orig_balance: *pre_credit_sender_balance,
                    }
                } else {
                    CreditValue {
                        low_credits: *amount,
                        high_credits: amount.zeroed(),
                        low_orig_balance: pre_credit_sender_balance.negate(),
                    }
                };
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => {
                let value = slot.get_mut();
                if sender_is_low {
                    value.high_credits = add_or_keep(&value.high_credits, amount);
                } else {
                    value.low_credits = add_or_keep(&value.low_credits, amount);
                }
            }
        }
    }

    pub fn adjustments(
        &self,
        main: &AccountId,
        other: &AccountId,
        currency: Currency,
    ) -> Option<Adjustment> {
        let value = self.credits.get(&Self::key(main, other, currency))?;
        Some(if main < other {
            Adjustment {
                debits: value.high_credits,
                credits: value.low_credits,
                orig_balance: value.low_orig_balance,
            }
        } else {
            Adjustment {
                debits: value.low_credits,
                credits: value.high_credits,
                orig_balance: value.low_orig_balance.negate(),
            }
        })
    }

    /// Fold a child's credits into these. The original balance recorded
    /// here wins since it predates the child's.
    pub fn merge(&mut self, other: DeferredCredits) {
        for (key, value) in other.credits {
            match self.credits.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
                Entry::Occupied(mut slot) => {
                    let mine = slot.get_mut();
                    mine.low_credits = add_or_keep(&mine.low_credits, &value.low_credits);
                    mine.high_credits = add_or_keep(&mine.high_credits, &value.high_credits);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.credits.is_empty()
    }
}

/// Changes of a finished sandbox, ready to be merged into its parent or
/// applied to the view it was opened on.
#[derive(Debug, Default)]
pub struct SandboxDelta {
    pub items: RawStateTable,
    pub credits: DeferredCredits,
}

impl SandboxDelta {
    pub fn apply(&self, target: &mut dyn ApplyView) {
        self.items.apply_to_view(target);
    }
}

/// A view that hides credits received during a payment from the balance
/// of the receiver until the payment is done.
pub struct PaymentSandbox<'a> {
    base: &'a dyn ReadView,
    parent: Option<&'a PaymentSandbox<'a>>,
    flags: ApplyFlags,
    items: RawStateTable,
    credits: DeferredCredits,
}

impl<'a> PaymentSandbox<'a> {
    pub fn new(base: &'a dyn ReadView, flags: ApplyFlags) -> Self {
        Self {
            base,
            parent: None,
            flags,
            items: RawStateTable::new(),
            credits: DeferredCredits::new(),
        }
    }

    pub fn nested(parent: &'a PaymentSandbox<'a>) -> Self {
        Self {
            base: parent,
            parent: Some(parent),
            flags: parent.flags,
            items: RawStateTable::new(),
            credits: DeferredCredits::new(),
        }
    }

    pub fn finish(self) -> SandboxDelta {
        SandboxDelta {
            items: self.items,
            credits: self.credits,
        }
    }

    /// Take over the changes of a finished child.
    pub fn merge(&mut self, delta: SandboxDelta) {
        delta.items.apply_to_table(&mut self.items);
        self.credits.merge(delta.credits);
    }
}

fn less_than(a: &Amount, b: &Amount) -> bool {
    matches!(a.compare(b), Ok(Ordering::Less))
}

impl ReadView for PaymentSandbox<'_> {
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

    fn balance_hook(&self, account: &AccountId, issuer: &AccountId, amount: Amount) -> Amount {
        let currency = amount.currency();
        let mut delta = amount.zeroed();
        let mut last_balance = amount;
        let mut min_balance = amount;

        let mut current = Some(self);
        while let Some(sandbox) = current {
            if let Some(adjustment) = sandbox.credits.adjustments(account, issuer, currency) {
                delta = add_or_keep(&delta, &adjustment.debits);
                last_balance = adjustment.orig_balance;
                if less_than(&last_balance, &min_balance) {
                    min_balance = last_balance;
                }
            }
            current = sandbox.parent;
        }

        let mut adjusted = amount;
        if let Ok(candidate) = last_balance.checked_sub(&delta) {
            if less_than(&candidate, &adjusted) {
                adjusted = candidate;
            }
        }
        if less_than(&min_balance, &adjusted) {
            adjusted = min_balance;
        }
        let mut adjusted = adjusted.with_issuer(amount.issuer());
        if issuer.is_zero() && adjusted.is_negative() {
            adjusted = adjusted.zeroed();
        }
        adjusted
    }
}

impl ApplyView for PaymentSandbox<'_> {
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

    fn credit_hook(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: &Amount,
        pre_credit_balance: &Amount,
    ) {
        self.credits.credit(from, to, amount, pre_credit_balance);
    }
}
