use std::collections::BTreeSet;
use trackable_common::{
    crypto::AccountId,
    features::FEATURE_MULTI_SIGN,
    flags::{lsf, tf},
    ter::Ter,
    transaction::{Field, SignerEntry, Transaction},
};

use super::{has_invalid_flags, ApplyContext};
use crate::ledger::{
    entry::{LedgerEntry, SignerList},
    helpers::{adjust_owner_count, dir_insert, dir_remove, peek_account},
    keylet,
    view::{ApplyView, ReadView},
    Rules,
};

pub const MIN_SIGNERS: usize = 1;
pub const MAX_SIGNERS: usize = 8;

/// Owner count charged for a signer list: two for the list plus one per
/// signer.
fn owner_count_delta(signers: usize) -> i32 {
    2 + signers as i32
}

fn validate(account: &AccountId, quorum: u32, entries: &[SignerEntry]) -> Ter {
    if entries.len() < MIN_SIGNERS || entries.len() > MAX_SIGNERS {
        return Ter::temMALFORMED;
    }
    let mut seen = BTreeSet::new();
    let mut total: u64 = 0;
    for entry in entries {
        if entry.weight == 0 {
            return Ter::temBAD_WEIGHT;
        }
        if entry.account == *account || !seen.insert(entry.account) {
            return Ter::temBAD_SIGNER;
        }
        total += entry.weight as u64;
    }
    if quorum == 0 || total < quorum as u64 {
        return Ter::temBAD_QUORUM;
    }
    Ter::tesSUCCESS
}

pub(super) fn preflight(tx: &Transaction, rules: &Rules) -> Ter {
    if !rules.enabled(&FEATURE_MULTI_SIGN) {
        return Ter::temDISABLED;
    }
    if has_invalid_flags(tx, tf::UNIVERSAL_MASK) {
        return Ter::temINVALID_FLAG;
    }
    let quorum = tx.get_u32(Field::SignerQuorum).unwrap_or_default();
    let entries = tx.signer_entries();
    // A zero quorum without entries removes the list
    if quorum == 0 && entries.is_empty() {
        return Ter::tesSUCCESS;
    }
    validate(&tx.account(), quorum, entries)
}

fn remove_list(ctx: &mut ApplyContext<'_>) -> Ter {
    let keylet = keylet::signers(&ctx.account);
    let Some(list) = ctx.view.read_keylet(&keylet).and_then(|e| e.as_signer_list().cloned()) else {
        return Ter::tesSUCCESS;
    };
    dir_remove(&mut ctx.view, &ctx.account, &keylet.key);
    ctx.view.erase(&keylet.key);
    adjust_owner_count(&mut ctx.view, &ctx.account, -owner_count_delta(list.entries.len()))
}

pub(super) fn do_apply(ctx: &mut ApplyContext<'_>) -> Ter {
    let Some(root) = peek_account(&ctx.view, &ctx.account) else {
        return Ter::tefINTERNAL;
    };
    let quorum = ctx.tx.get_u32(Field::SignerQuorum).unwrap_or_default();
    let entries = ctx.tx.signer_entries();

    if quorum == 0 && entries.is_empty() {
        if root.is_flag(lsf::DISABLE_MASTER) && root.regular_key.is_none() {
            return Ter::tecNO_ALTERNATIVE_KEY;
        }
        return remove_list(ctx);
    }

    let ter = remove_list(ctx);
    if !ter.is_tes_success() {
        return ter;
    }
    let Some(root) = peek_account(&ctx.view, &ctx.account) else {
        return Ter::tefINTERNAL;
    };
    let delta = owner_count_delta(entries.len());
    let reserve = ctx
        .view
        .fees()
        .account_reserve(root.owner_count + delta as u32);
    if ctx.prior_balance < reserve {
        return Ter::tecINSUFFICIENT_RESERVE;
    }

    let mut sorted: Vec<(AccountId, u16)> = entries.iter().map(|e| (e.account, e.weight)).collect();
    sorted.sort();
    let list = SignerList {
        owner: ctx.account,
        quorum,
        entries: sorted,
    };
    let key = keylet::signers(&ctx.account).key;
    ctx.view.insert(LedgerEntry::SignerList(list));
    dir_insert(&mut ctx.view, &ctx.account, key);
    adjust_owner_count(&mut ctx.view, &ctx.account, delta)
}
