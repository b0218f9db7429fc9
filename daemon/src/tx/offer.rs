use log::trace;
use trackable_common::{
    crypto::AccountId,
    flags::{lsf, tf},
    ter::Ter,
    transaction::{Field, Transaction},
};

use super::{has_invalid_flags, ApplyContext};
use crate::ledger::{
    entry::{LedgerEntry, Offer},
    helpers::{account_funds, adjust_owner_count, dir_insert, dir_remove, peek_account},
    keylet,
    view::{ApplyView, ReadView},
};

pub(super) fn preflight_create(tx: &Transaction) -> Ter {
    if has_invalid_flags(tx, tf::OFFER_CREATE_MASK) {
        return Ter::temINVALID_FLAG;
    }
    let flags = tx.flags();
    if flags & tf::IMMEDIATE_OR_CANCEL != 0 && flags & tf::FILL_OR_KILL != 0 {
        return Ter::temINVALID_FLAG;
    }
    if tx.get_u32(Field::Expiration) == Some(0) {
        return Ter::temBAD_EXPIRATION;
    }
    if tx.get_u32(Field::OfferSequence) == Some(0) {
        return Ter::temBAD_SEQUENCE;
    }
    let (Some(pays), Some(gets)) = (
        tx.get_amount(Field::TakerPays),
        tx.get_amount(Field::TakerGets),
    ) else {
        return Ter::temBAD_OFFER;
    };
    if pays.is_native() && gets.is_native() {
        return Ter::temBAD_OFFER;
    }
    if pays.signum() <= 0 || gets.signum() <= 0 {
        return Ter::temBAD_OFFER;
    }
    if pays.issue() == gets.issue() {
        return Ter::temREDUNDANT;
    }
    if (!pays.is_native() && pays.issuer().is_zero())
        || (!gets.is_native() && gets.issuer().is_zero())
    {
        return Ter::temBAD_ISSUER;
    }
    Ter::tesSUCCESS
}

pub(super) fn preclaim_create<V: ReadView + ?Sized>(view: &V, tx: &Transaction) -> Ter {
    if tx.get_u32(Field::OfferSequence).is_some_and(|seq| seq >= tx.sequence()) {
        return Ter::temBAD_SEQUENCE;
    }
    let Some(gets) = tx.get_amount(Field::TakerGets) else {
        return Ter::temBAD_OFFER;
    };
    if !gets.is_native() && peek_account(view, &gets.issuer()).is_none() {
        return Ter::tecNO_ISSUER;
    }
    Ter::tesSUCCESS
}

pub(super) fn preflight_cancel(tx: &Transaction) -> Ter {
    if has_invalid_flags(tx, tf::UNIVERSAL_MASK) {
        return Ter::temINVALID_FLAG;
    }
    if tx.get_u32(Field::OfferSequence).unwrap_or_default() == 0 {
        return Ter::temBAD_SEQUENCE;
    }
    Ter::tesSUCCESS
}

/// Remove an offer and its directory reference. Missing offers are not an
/// error.
fn offer_delete<V: ApplyView + ?Sized>(view: &mut V, owner: &AccountId, sequence: u32) -> Ter {
    let keylet = keylet::offer(owner, sequence);
    if !view.exists(&keylet) {
        return Ter::tesSUCCESS;
    }
    dir_remove(view, owner, &keylet.key);
    view.erase(&keylet.key);
    adjust_owner_count(view, owner, -1)
}

pub(super) fn do_apply_cancel(ctx: &mut ApplyContext<'_>) -> Ter {
    let sequence = ctx.tx.get_u32(Field::OfferSequence).unwrap_or_default();
    offer_delete(&mut ctx.view, &ctx.account, sequence)
}

// Offers rest in the ledger without crossing
pub(super) fn do_apply_create(ctx: &mut ApplyContext<'_>) -> Ter {
    let tx = ctx.tx;
    let account = ctx.account;
    let (Some(taker_pays), Some(taker_gets)) = (
        tx.get_amount(Field::TakerPays),
        tx.get_amount(Field::TakerGets),
    ) else {
        return Ter::temBAD_OFFER;
    };

    if let Some(cancel) = tx.get_u32(Field::OfferSequence) {
        let ter = offer_delete(&mut ctx.view, &account, cancel);
        if !ter.is_tes_success() {
            return ter;
        }
    }

    let expiration = tx.get_u32(Field::Expiration);
    if expiration.is_some_and(|exp| exp <= ctx.view.info().parent_close_time.as_secs()) {
        return Ter::tecEXPIRED;
    }

    let funds = account_funds(&ctx.view, &account, &taker_gets);
    if funds.signum() <= 0 {
        return Ter::tecUNFUNDED_OFFER;
    }

    let flags = tx.flags();
    if flags & tf::FILL_OR_KILL != 0 {
        return Ter::tecKILLED;
    }
    if flags & tf::IMMEDIATE_OR_CANCEL != 0 {
        trace!("Offer {} from {} not placed", tx.sequence(), account);
        return Ter::tesSUCCESS;
    }

    let Some(root) = peek_account(&ctx.view, &account) else {
        return Ter::tefINTERNAL;
    };
    let reserve = ctx.view.fees().account_reserve(root.owner_count + 1);
    if ctx.prior_balance < reserve {
        return Ter::tecINSUF_RESERVE_OFFER;
    }

    let mut offer_flags = 0;
    if flags & tf::PASSIVE != 0 {
        offer_flags |= lsf::PASSIVE;
    }
    if flags & tf::SELL != 0 {
        offer_flags |= lsf::SELL;
    }
    let offer = Offer {
        account,
        sequence: tx.sequence(),
        taker_pays,
        taker_gets,
        flags: offer_flags,
        expiration,
    };
    let key = keylet::offer(&account, offer.sequence).key;
    ctx.view.insert(LedgerEntry::Offer(offer));
    dir_insert(&mut ctx.view, &account, key);
    adjust_owner_count(&mut ctx.view, &account, 1)
}
