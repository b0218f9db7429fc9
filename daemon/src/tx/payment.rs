use std::cmp::Ordering;
use trackable_common::{
    amount::{Amount, Drops},
    crypto::AccountId,
    flags::{lsf, tf},
    ter::Ter,
    transaction::{Field, Transaction},
};

use super::{has_invalid_flags, ApplyContext};
use crate::ledger::{
    entry::{AccountRoot, LedgerEntry},
    helpers::{
        account_holds, account_send, is_frozen, peek_account, peek_line, send_cost, side_flag,
        transfer_xrp,
    },
    keylet,
    view::{ApplyView, PaymentSandbox, ReadView},
};

pub(super) fn preflight(tx: &Transaction) -> Ter {
    if has_invalid_flags(tx, tf::PAYMENT_MASK) {
        return Ter::temINVALID_FLAG;
    }
    let Some(amount) = tx.get_amount(Field::Amount) else {
        return Ter::temBAD_AMOUNT;
    };
    let send_max = tx.get_amount(Field::SendMax);
    let destination = tx.get_account(Field::Destination).unwrap_or_default();
    if destination.is_zero() {
        return Ter::temDST_NEEDED;
    }
    if amount.signum() <= 0 || send_max.is_some_and(|max| max.signum() <= 0) {
        return Ter::temBAD_AMOUNT;
    }

    let flags = tx.flags();
    let source_native = send_max.map(|max| max.is_native()).unwrap_or(amount.is_native());
    if amount.is_native() && source_native {
        if tx.account() == destination {
            return Ter::temREDUNDANT;
        }
        if send_max.is_some() {
            return Ter::temBAD_SEND_XRP_MAX;
        }
        if flags & tf::PARTIAL_PAYMENT != 0 {
            return Ter::temBAD_SEND_XRP_PARTIAL;
        }
        if flags & tf::LIMIT_QUALITY != 0 {
            return Ter::temBAD_SEND_XRP_LIMIT;
        }
        if flags & tf::NO_TRACKABLE_DIRECT != 0 {
            return Ter::temBAD_SEND_XRP_NO_DIRECT;
        }
    } else if tx.account() == destination && send_max.is_none() {
        return Ter::temREDUNDANT;
    } else if amount.is_native() != source_native {
        // Converting between currencies takes offer crossing.
        return Ter::temBAD_PATH;
    }
    Ter::tesSUCCESS
}

pub(super) fn preclaim<V: ReadView + ?Sized>(view: &V, tx: &Transaction) -> Ter {
    let destination = tx.get_account(Field::Destination).unwrap_or_default();
    let amount = tx.get_amount(Field::Amount).unwrap_or(Amount::native(0));
    match peek_account(view, &destination) {
        None if !amount.is_native() => Ter::tecNO_DST,
        None if tx.flags() & tf::PARTIAL_PAYMENT != 0 => Ter::telNO_DST_PARTIAL,
        None if amount.drops().unwrap_or_default() < view.fees().reserve => {
            Ter::tecNO_DST_INSUF_XRP
        }
        None => Ter::tesSUCCESS,
        Some(root)
            if root.is_flag(lsf::REQUIRE_DEST_TAG)
                && !tx.is_field_present(Field::DestinationTag) =>
        {
            Ter::tecDST_TAG_NEEDED
        }
        Some(_) => Ter::tesSUCCESS,
    }
}

fn exceeds(a: &Amount, b: &Amount) -> bool {
    matches!(a.compare(b), Ok(Ordering::Greater))
}

fn pay_native(ctx: &mut ApplyContext<'_>, destination: &AccountId, amount: Drops) -> Ter {
    let Some(root) = peek_account(&ctx.view, &ctx.account) else {
        return Ter::tefINTERNAL;
    };
    let reserve = ctx.view.fees().account_reserve(root.owner_count);
    let needed = amount.drops() + reserve.max(ctx.tx.fee()).drops();
    if ctx.prior_balance.drops() < needed {
        return Ter::tecUNFUNDED_PAYMENT;
    }
    let ter = transfer_xrp(&mut ctx.view, &ctx.account, destination, amount);
    if ter.is_tes_success() {
        ctx.view.set_delivered(Amount::Native(amount));
    }
    ter
}

/// Whether a trust line with `holder` lets `amount` arrive.
fn check_receive<V: ReadView + ?Sized>(view: &V, holder: &AccountId, amount: &Amount) -> Ter {
    let issue = amount.issue();
    let Some(line) = peek_line(view, &keylet::line_for_issue(holder, &issue)) else {
        return Ter::tecPATH_DRY;
    };
    let (Some(value), balance) = (amount.iou_value(), line.balance_for(holder)) else {
        return Ter::tefINTERNAL;
    };
    if balance + value > line.limit_for(holder) {
        return Ter::tecPATH_PARTIAL;
    }
    Ter::tesSUCCESS
}

/// Whether the issuer lets its IOUs flow from one holder to another.
fn issuer_allows_trackable<V: ReadView + ?Sized>(
    view: &V,
    from: &AccountId,
    to: &AccountId,
    amount: &Amount,
) -> bool {
    let issue = amount.issue();
    let blocked = |holder: &AccountId| {
        peek_line(view, &keylet::line_for_issue(holder, &issue))
            .map(|line| {
                let issuer_low = line.is_low(&issue.account);
                line.is_flag(side_flag(issuer_low, lsf::LOW_NO_TRACKABLE, lsf::HIGH_NO_TRACKABLE))
            })
            .unwrap_or(true)
    };
    !(blocked(from) && blocked(to))
}

fn pay_iou(ctx: &mut ApplyContext<'_>, destination: &AccountId, amount: &Amount) -> Ter {
    let issue = amount.issue();
    let account = ctx.account;
    if is_frozen(&ctx.view, &account, &issue) || is_frozen(&ctx.view, destination, &issue) {
        return Ter::tecPATH_DRY;
    }
    let send_max = ctx.tx.get_amount(Field::SendMax);

    let cost = if account == issue.account {
        *amount
    } else if *destination == issue.account {
        if peek_line(&ctx.view, &keylet::line_for_issue(&account, &issue)).is_none() {
            return Ter::tecPATH_DRY;
        }
        *amount
    } else {
        if !issuer_allows_trackable(&ctx.view, &account, destination, amount) {
            return Ter::tecPATH_DRY;
        }
        send_cost(&ctx.view, amount)
    };

    if *destination != issue.account {
        let ter = check_receive(&ctx.view, destination, amount);
        if !ter.is_tes_success() {
            return ter;
        }
    }
    if send_max.is_some_and(|max| exceeds(&cost, &max)) {
        return Ter::tecPATH_PARTIAL;
    }
    if account != issue.account && exceeds(&cost, &account_holds(&ctx.view, &account, &issue)) {
        return Ter::tecPATH_PARTIAL;
    }

    let delta = {
        let mut sandbox = PaymentSandbox::new(&ctx.view, ctx.view.flags());
        let ter = account_send(&mut sandbox, &account, destination, amount);
        if !ter.is_tes_success() {
            return ter;
        }
        sandbox.finish()
    };
    delta.apply(&mut ctx.view);
    ctx.view.set_delivered(*amount);
    Ter::tesSUCCESS
}

pub(super) fn do_apply(ctx: &mut ApplyContext<'_>) -> Ter {
    let destination = ctx.tx.get_account(Field::Destination).unwrap_or_default();
    let Some(amount) = ctx.tx.get_amount(Field::Amount) else {
        return Ter::temBAD_AMOUNT;
    };
    if peek_account(&ctx.view, &destination).is_none() {
        ctx.view.insert(LedgerEntry::AccountRoot(AccountRoot::new(
            destination,
            Drops::zero(),
        )));
    }
    match amount {
        Amount::Native(drops) => pay_native(ctx, &destination, drops),
        Amount::Iou { .. } => pay_iou(ctx, &destination, &amount),
    }
}
