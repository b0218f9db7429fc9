use trackable_common::{
    amount::{Amount, Drops},
    config::QUALITY_ONE,
    crypto::AccountId,
    flags::{lsf, tf},
    ter::Ter,
    transaction::{Field, Transaction},
};

use super::{has_invalid_flags, ApplyContext};
use crate::ledger::{
    entry::LedgerEntry,
    helpers::{
        adjust_owner_count, is_default_side, peek_account, peek_line, side_flag, trust_create,
        trust_delete, TrustLineSetup,
    },
    keylet,
    view::{ApplyView, ReadView},
};

pub(super) fn preflight(tx: &Transaction) -> Ter {
    if has_invalid_flags(tx, tf::TRUST_SET_MASK) {
        return Ter::temINVALID_FLAG;
    }
    let Some(limit) = tx.get_amount(Field::LimitAmount) else {
        return Ter::temBAD_LIMIT;
    };
    if limit.is_native() {
        return Ter::temBAD_LIMIT;
    }
    if limit.is_negative() {
        return Ter::temBAD_LIMIT;
    }
    let issuer = limit.issuer();
    if issuer.is_zero() || issuer == AccountId::no_account() {
        return Ter::temDST_NEEDED;
    }
    if issuer == tx.account() {
        return Ter::temDST_IS_SRC;
    }
    Ter::tesSUCCESS
}

pub(super) fn preclaim<V: ReadView + ?Sized>(view: &V, tx: &Transaction) -> Ter {
    let issuer = tx
        .get_amount(Field::LimitAmount)
        .map(|limit| limit.issuer())
        .unwrap_or_default();
    if peek_account(view, &issuer).is_none() {
        return Ter::tecNO_DST;
    }
    Ter::tesSUCCESS
}

// QUALITY_ONE means the same as no quality
fn quality(tx: &Transaction, field: Field) -> Option<u32> {
    tx.get_u32(field)
        .map(|q| if q == QUALITY_ONE { 0 } else { q })
}

pub(super) fn do_apply(ctx: &mut ApplyContext<'_>) -> Ter {
    let tx = ctx.tx;
    let Some(limit) = tx.get_amount(Field::LimitAmount) else {
        return Ter::temBAD_LIMIT;
    };
    let Amount::Iou { value: limit_value, issue } = limit else {
        return Ter::temBAD_LIMIT;
    };
    let account = ctx.account;
    let peer = issue.account;
    let Some(root) = peek_account(&ctx.view, &account) else {
        return Ter::tefINTERNAL;
    };

    let flags = tx.flags();
    let set_no_trackable = flags & tf::SET_NO_TRACKABLE != 0 && flags & tf::CLEAR_NO_TRACKABLE == 0;
    let clear_no_trackable = flags & tf::CLEAR_NO_TRACKABLE != 0 && !set_no_trackable;
    let set_freeze = flags & tf::SET_FREEZE != 0 && !root.is_flag(lsf::NO_FREEZE);
    let clear_freeze = flags & tf::CLEAR_FREEZE != 0 && !set_freeze;
    let set_auth = flags & tf::SETF_AUTH != 0 && root.is_flag(lsf::REQUIRE_AUTH);
    let quality_in = quality(tx, Field::QualityIn);
    let quality_out = quality(tx, Field::QualityOut);

    // The first two objects an account owns need no extra reserve.
    let reserve_create = if root.owner_count < 2 {
        Drops::zero()
    } else {
        ctx.view.fees().account_reserve(root.owner_count + 1)
    };

    let Some(mut line) = peek_line(&ctx.view, &keylet::line(&account, &peer, &issue.currency))
    else {
        if limit_value.is_zero()
            && quality_in.unwrap_or(0) == 0
            && quality_out.unwrap_or(0) == 0
            && !set_auth
        {
            return Ter::tecNO_LINE_REDUNDANT;
        }
        if ctx.prior_balance < reserve_create {
            return Ter::tecNO_LINE_INSUF_RESERVE;
        }
        return trust_create(
            &mut ctx.view,
            &account,
            &peer,
            issue.currency,
            TrustLineSetup {
                limit: limit_value,
                no_trackable: set_no_trackable,
                auth: set_auth,
                freeze: set_freeze,
                quality_in: quality_in.unwrap_or(0),
                quality_out: quality_out.unwrap_or(0),
                ..Default::default()
            },
        );
    };

    let low = line.is_low(&account);
    line.set_limit_for(&account, limit_value);
    if let Some(q) = quality_in {
        if low {
            line.low_quality_in = q;
        } else {
            line.high_quality_in = q;
        }
    }
    if let Some(q) = quality_out {
        if low {
            line.low_quality_out = q;
        } else {
            line.high_quality_out = q;
        }
    }

    let no_trackable_flag = side_flag(low, lsf::LOW_NO_TRACKABLE, lsf::HIGH_NO_TRACKABLE);
    if set_no_trackable {
        if line.balance_for(&account).is_negative() {
            return Ter::tecNO_PERMISSION;
        }
        line.flags |= no_trackable_flag;
    } else if clear_no_trackable {
        line.flags &= !no_trackable_flag;
    }
    let freeze_flag = side_flag(low, lsf::LOW_FREEZE, lsf::HIGH_FREEZE);
    if set_freeze {
        line.flags |= freeze_flag;
    } else if clear_freeze {
        line.flags &= !freeze_flag;
    }
    if set_auth {
        line.flags |= side_flag(low, lsf::LOW_AUTH, lsf::HIGH_AUTH);
    }

    let reserve_flag = side_flag(low, lsf::LOW_RESERVE, lsf::HIGH_RESERVE);
    let peer_reserve_flag = side_flag(!low, lsf::LOW_RESERVE, lsf::HIGH_RESERVE);
    let is_default = is_default_side(&ctx.view, &line, &account);
    if !is_default && !line.is_flag(reserve_flag) {
        if ctx.prior_balance < reserve_create {
            return Ter::tecINSUF_RESERVE_LINE;
        }
        line.flags |= reserve_flag;
        let ter = adjust_owner_count(&mut ctx.view, &account, 1);
        if !ter.is_tes_success() {
            return ter;
        }
    } else if is_default && line.is_flag(reserve_flag) {
        line.flags &= !reserve_flag;
        let ter = adjust_owner_count(&mut ctx.view, &account, -1);
        if !ter.is_tes_success() {
            return ter;
        }
    }

    if is_default && !line.is_flag(peer_reserve_flag) {
        return trust_delete(&mut ctx.view, &line);
    }
    ctx.view.update(LedgerEntry::RippleState(line));
    Ter::tesSUCCESS
}
