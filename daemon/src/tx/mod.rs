//! Transaction application.
//!
//! A transaction goes through three stages:
//! - preflight: checks that only need the transaction and the rules
//! - preclaim: checks against the ledger that do not change it
//! - apply: the fee is taken and the sequence consumed, then the
//!   transaction type specific body runs
//!
//! A `tec` result from the body keeps the fee and sequence but none of the
//! body's changes.

mod account_set;
mod offer;
mod payment;
mod regular_key;
mod signer_list;
mod trust_set;

use log::{debug, trace};
use std::sync::Arc;
use trackable_common::{
    amount::Drops,
    crypto::{public_key_type, AccountId, PublicKey},
    flags::lsf,
    ter::Ter,
    transaction::{Field, Transaction, TxType},
};

use crate::ledger::{
    helpers::peek_account,
    view::{ApplyFlags, ApplyView, ApplyViewImpl, OpenView, ReadView},
    LedgerEntry, Rules, TxMeta,
};

/// A transaction being applied, with the view its body writes to.
pub struct ApplyContext<'a> {
    pub view: ApplyViewImpl<'a>,
    pub tx: &'a Transaction,
    pub account: AccountId,
    /// Balance of the source account before the fee was taken.
    pub prior_balance: Drops,
    pub signed_with_master: bool,
}

impl ApplyContext<'_> {
    pub fn rules(&self) -> &Rules {
        self.view.rules()
    }
}

fn preflight_common(tx: &Transaction, flags: ApplyFlags) -> Ter {
    if tx.account().is_zero() {
        return Ter::temBAD_SRC_ACCOUNT;
    }
    if tx.fee().is_negative() {
        return Ter::temBAD_FEE;
    }
    // Foreign key types fail the signature check before the key type check
    if !flags.contains(ApplyFlags::NO_CHECK_SIGN) && tx.check_sign().is_err() {
        return Ter::temINVALID;
    }
    let key = tx.signing_pub_key();
    if !key.is_empty() && public_key_type(key).is_none() {
        return Ter::temBAD_SIGNATURE;
    }
    Ter::tesSUCCESS
}

fn preflight(tx: &Transaction, rules: &Rules, flags: ApplyFlags) -> Ter {
    let ter = preflight_common(tx, flags);
    if !ter.is_tes_success() {
        return ter;
    }
    match tx.tx_type() {
        TxType::Payment => payment::preflight(tx),
        TxType::AccountSet => account_set::preflight(tx, rules),
        TxType::SetRegularKey => regular_key::preflight(tx),
        TxType::OfferCreate => offer::preflight_create(tx),
        TxType::OfferCancel => offer::preflight_cancel(tx),
        TxType::SignerListSet => signer_list::preflight(tx, rules),
        TxType::TrustSet => trust_set::preflight(tx),
    }
}

/// Sequence, fee and signing authority.
fn preclaim_common<V: ReadView + ?Sized>(view: &V, tx: &Transaction) -> Ter {
    let Some(root) = peek_account(view, &tx.account()) else {
        return Ter::terNO_ACCOUNT;
    };
    let sequence = tx.sequence();
    if sequence > root.sequence {
        return Ter::terPRE_SEQ;
    }
    if sequence < root.sequence {
        return Ter::tefPAST_SEQ;
    }
    if let Some(last) = tx.get_u32(Field::LastLedgerSequence) {
        if last < view.seq() {
            return Ter::tefMAX_LEDGER;
        }
    }
    if view.tx_read(&tx.id()).is_some() {
        return Ter::tefALREADY;
    }

    let fee = tx.fee();
    if view.open() && fee < view.fees().base {
        return Ter::telINSUF_FEE_P;
    }
    if view.open() && root.balance < fee {
        return Ter::terINSUF_FEE_B;
    }

    let Ok(key) = PublicKey::from_slice(tx.signing_pub_key()) else {
        return Ter::tefBAD_AUTH;
    };
    let signer = key.account_id();
    if signer == root.account {
        if root.is_flag(lsf::DISABLE_MASTER) {
            return Ter::tefMASTER_DISABLED;
        }
    } else if root.regular_key != Some(signer) {
        return Ter::tefBAD_AUTH;
    }
    Ter::tesSUCCESS
}

fn preclaim<V: ReadView + ?Sized>(view: &V, tx: &Transaction) -> Ter {
    let ter = preclaim_common(view, tx);
    if !ter.is_tes_success() {
        return ter;
    }
    match tx.tx_type() {
        TxType::Payment => payment::preclaim(view, tx),
        TxType::AccountSet => account_set::preclaim(view, tx),
        TxType::TrustSet => trust_set::preclaim(view, tx),
        TxType::OfferCreate => offer::preclaim_create(view, tx),
        TxType::SetRegularKey | TxType::OfferCancel | TxType::SignerListSet => Ter::tesSUCCESS,
    }
}

fn do_apply(ctx: &mut ApplyContext<'_>) -> Ter {
    match ctx.tx.tx_type() {
        TxType::Payment => payment::do_apply(ctx),
        TxType::AccountSet => account_set::do_apply(ctx),
        TxType::SetRegularKey => regular_key::do_apply(ctx),
        TxType::OfferCreate => offer::do_apply_create(ctx),
        TxType::OfferCancel => offer::do_apply_cancel(ctx),
        TxType::SignerListSet => signer_list::do_apply(ctx),
        TxType::TrustSet => trust_set::do_apply(ctx),
    }
}

/// Take the fee and consume the sequence. A closed ledger takes whatever
/// the account has when that is less than the fee.
fn pay_fee<V: ApplyView + ?Sized>(view: &mut V, tx: &Transaction) -> Ter {
    let Some(mut root) = peek_account(view, &tx.account()) else {
        return Ter::tefINTERNAL;
    };
    let mut fee = tx.fee();
    let mut ter = Ter::tesSUCCESS;
    if root.balance < fee {
        fee = root.balance;
        ter = Ter::tecINSUFF_FEE;
    }
    root.balance -= fee;
    root.sequence += 1;
    if root.account_txn_id.is_some() {
        root.account_txn_id = Some(tx.id());
    }
    view.update(LedgerEntry::AccountRoot(root));
    view.destroy_drops(fee);
    ter
}

/// Apply a transaction to an open view. Returns the result and whether the
/// transaction made it into the view.
pub fn apply(view: &mut OpenView<'_>, tx: &Arc<Transaction>, flags: ApplyFlags) -> (Ter, bool) {
    let ter = preflight(tx, view.rules(), flags);
    if !ter.is_tes_success() {
        debug!("Transaction {} failed preflight: {}", tx.id(), ter);
        return (ter, false);
    }
    let claim = preclaim(&*view, tx);
    if !claim.is_tes_success() && !claim.is_tec_claim() {
        debug!("Transaction {} failed preclaim: {}", tx.id(), claim);
        return (claim, false);
    }

    let index = view.tx_count() as u32;
    let (result, items, meta) = {
        let mut fee_view = ApplyViewImpl::new(&*view, flags);
        let prior_balance = peek_account(&fee_view, &tx.account())
            .map(|root| root.balance)
            .unwrap_or_default();
        let signed_with_master = PublicKey::from_slice(tx.signing_pub_key())
            .map(|key| key.account_id() == tx.account())
            .unwrap_or(false);

        let mut result = pay_fee(&mut fee_view, tx);
        let mut delivered = None;
        if result.is_tes_success() && claim.is_tec_claim() {
            result = claim;
        } else if result.is_tes_success() {
            let mut ctx = ApplyContext {
                view: ApplyViewImpl::new(&fee_view, flags),
                tx,
                account: tx.account(),
                prior_balance,
                signed_with_master,
            };
            result = do_apply(&mut ctx);
            if result.is_tes_success() {
                delivered = ctx.view.delivered();
                ctx.view.finish().apply_to_view(&mut fee_view);
            }
        }
        if !result.is_tes_success() && !result.is_tec_claim() {
            debug!("Transaction {} not applied: {}", tx.id(), result);
            return (result, false);
        }
        let meta = TxMeta {
            index,
            result,
            affected: fee_view.affected_nodes(),
            delivered,
        };
        (result, fee_view.finish(), meta)
    };

    trace!("Transaction {} applied with {}", tx.id(), result);
    view.raw_tx_insert(&items, tx.clone(), meta);
    (result, true)
}

/// Whether the transaction sets a flag its type does not know.
pub(crate) fn has_invalid_flags(tx: &Transaction, mask: u32) -> bool {
    tx.flags() & mask != 0
}
