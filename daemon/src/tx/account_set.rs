use trackable_common::{
    config::{MAX_DOMAIN_LENGTH, QUALITY_ONE},
    crypto::public_key_type,
    features::{FEATURE_MULTI_SIGN, FIX_1201},
    flags::{asf, lsf, tf},
    ter::Ter,
    transaction::{Field, Transaction},
};

use super::{has_invalid_flags, ApplyContext};
use crate::ledger::{
    entry::LedgerEntry,
    helpers::{owner_entries, peek_account},
    keylet,
    view::{ApplyView, ReadView},
    Rules,
};

struct FlagRequest {
    set_flag: u32,
    clear_flag: u32,
    tx_flags: u32,
}

impl FlagRequest {
    fn new(tx: &Transaction) -> Self {
        Self {
            set_flag: tx.get_u32(Field::SetFlag).unwrap_or_default(),
            clear_flag: tx.get_u32(Field::ClearFlag).unwrap_or_default(),
            tx_flags: tx.flags(),
        }
    }

    /// Whether the request turns the flag on, through `SetFlag` or the
    /// legacy transaction flag.
    fn sets(&self, asf_flag: u32, tf_flag: u32) -> bool {
        self.set_flag == asf_flag || self.tx_flags & tf_flag != 0
    }

    fn clears(&self, asf_flag: u32, tf_flag: u32) -> bool {
        self.clear_flag == asf_flag || self.tx_flags & tf_flag != 0
    }
}

const LEGACY_PAIRS: [(u32, u32, u32); 3] = [
    (asf::REQUIRE_DEST, tf::REQUIRE_DEST_TAG, tf::OPTIONAL_DEST_TAG),
    (asf::REQUIRE_AUTH, tf::REQUIRE_AUTH, tf::OPTIONAL_AUTH),
    (asf::DISALLOW_XRP, tf::DISALLOW_XRP, tf::ALLOW_XRP),
];

pub(super) fn preflight(tx: &Transaction, rules: &Rules) -> Ter {
    if has_invalid_flags(tx, tf::ACCOUNT_SET_MASK) {
        return Ter::temINVALID_FLAG;
    }
    let request = FlagRequest::new(tx);
    if request.set_flag != 0 && request.set_flag == request.clear_flag {
        return Ter::temINVALID_FLAG;
    }
    for (flag, set_tf, clear_tf) in LEGACY_PAIRS {
        if request.sets(flag, set_tf) && request.clears(flag, clear_tf) {
            return Ter::temINVALID_FLAG;
        }
    }

    if let Some(rate) = tx.get_u32(Field::TransferRate) {
        if rate != 0 && rate < QUALITY_ONE {
            return Ter::temBAD_TRANSFER_RATE;
        }
        if rules.enabled(&FIX_1201) && rate > 2 * QUALITY_ONE {
            return Ter::temBAD_TRANSFER_RATE;
        }
    }

    if let Some(key) = tx.get_blob(Field::MessageKey) {
        if !key.is_empty() && public_key_type(key).is_none() {
            return Ter::telBAD_PUBLIC_KEY;
        }
    }
    if tx.get_blob(Field::Domain).is_some_and(|d| d.len() > MAX_DOMAIN_LENGTH) {
        return Ter::telBAD_DOMAIN;
    }
    Ter::tesSUCCESS
}

pub(super) fn preclaim<V: ReadView + ?Sized>(view: &V, tx: &Transaction) -> Ter {
    let request = FlagRequest::new(tx);
    if request.sets(asf::REQUIRE_AUTH, tf::REQUIRE_AUTH) {
        let already = peek_account(view, &tx.account())
            .map(|root| root.is_flag(lsf::REQUIRE_AUTH))
            .unwrap_or(false);
        if !already && !owner_entries(view, &tx.account()).is_empty() {
            return Ter::tecOWNERS;
        }
    }
    Ter::tesSUCCESS
}

fn toggle(flags: &mut u32, flag: u32, set: bool, clear: bool) {
    if set {
        *flags |= flag;
    } else if clear {
        *flags &= !flag;
    }
}

pub(super) fn do_apply(ctx: &mut ApplyContext<'_>) -> Ter {
    let Some(mut root) = peek_account(&ctx.view, &ctx.account) else {
        return Ter::tefINTERNAL;
    };
    let tx = ctx.tx;
    let request = FlagRequest::new(tx);
    let mut flags = root.flags;

    for (flag, set_tf, clear_tf) in LEGACY_PAIRS {
        let Some(ledger_flag) = asf::to_ledger_flag(flag) else {
            continue;
        };
        toggle(
            &mut flags,
            ledger_flag,
            request.sets(flag, set_tf),
            request.clears(flag, clear_tf),
        );
    }

    if request.set_flag == asf::DISABLE_MASTER {
        if !ctx.signed_with_master {
            return Ter::tecNEED_MASTER_KEY;
        }
        if root.regular_key.is_none() {
            let multi_sign = ctx.rules().enabled(&FEATURE_MULTI_SIGN);
            if !multi_sign {
                return Ter::tecNO_REGULAR_KEY;
            }
            if !ctx.view.exists(&keylet::signers(&ctx.account)) {
                return Ter::tecNO_ALTERNATIVE_KEY;
            }
        }
        flags |= lsf::DISABLE_MASTER;
    }
    if request.clear_flag == asf::DISABLE_MASTER {
        flags &= !lsf::DISABLE_MASTER;
    }

    if request.set_flag == asf::DEFAULT_TRACKABLE {
        flags |= lsf::DEFAULT_TRACKABLE;
    } else if request.clear_flag == asf::DEFAULT_TRACKABLE {
        flags &= !lsf::DEFAULT_TRACKABLE;
    }

    // NoFreeze can not be cleared once set
    if request.set_flag == asf::NO_FREEZE {
        if !ctx.signed_with_master {
            return Ter::tecNEED_MASTER_KEY;
        }
        flags |= lsf::NO_FREEZE;
    }

    // and holders of NoFreeze may not lift a global freeze
    if request.set_flag == asf::GLOBAL_FREEZE {
        flags |= lsf::GLOBAL_FREEZE;
    } else if request.clear_flag == asf::GLOBAL_FREEZE && flags & lsf::NO_FREEZE == 0 {
        flags &= !lsf::GLOBAL_FREEZE;
    }

    if request.set_flag == asf::ACCOUNT_TXN_ID && root.account_txn_id.is_none() {
        root.account_txn_id = Some(tx.id());
    } else if request.clear_flag == asf::ACCOUNT_TXN_ID {
        root.account_txn_id = None;
    }

    if let Some(hash) = tx.get_h128(Field::EmailHash) {
        root.email_hash = (hash != [0u8; 16]).then_some(hash);
    }
    if let Some(locator) = tx.get_h256(Field::WalletLocator) {
        root.wallet_locator = (!locator.is_zero()).then_some(locator);
    }
    if let Some(key) = tx.get_blob(Field::MessageKey) {
        root.message_key = (!key.is_empty()).then(|| key.to_vec());
    }
    if let Some(domain) = tx.get_blob(Field::Domain) {
        root.domain = (!domain.is_empty()).then(|| domain.to_vec());
    }
    if let Some(rate) = tx.get_u32(Field::TransferRate) {
        root.transfer_rate = (rate != 0 && rate != QUALITY_ONE).then_some(rate);
    }

    root.flags = flags;
    ctx.view.update(LedgerEntry::AccountRoot(root));
    Ter::tesSUCCESS
}
