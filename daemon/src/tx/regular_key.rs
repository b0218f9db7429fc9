use trackable_common::{
    flags::{lsf, tf},
    ter::Ter,
    transaction::{Field, Transaction},
};

use super::{has_invalid_flags, ApplyContext};
use crate::ledger::{entry::LedgerEntry, helpers::peek_account, keylet, view::ApplyView, view::ReadView};

pub(super) fn preflight(tx: &Transaction) -> Ter {
    if has_invalid_flags(tx, tf::UNIVERSAL_MASK) {
        return Ter::temINVALID_FLAG;
    }
    Ter::tesSUCCESS
}

pub(super) fn do_apply(ctx: &mut ApplyContext<'_>) -> Ter {
    let Some(mut root) = peek_account(&ctx.view, &ctx.account) else {
        return Ter::tefINTERNAL;
    };
    match ctx.tx.get_account(Field::RegularKey) {
        Some(key) => root.regular_key = Some(key),
        None => {
            // The account must keep some way to sign
            if root.is_flag(lsf::DISABLE_MASTER) && !ctx.view.exists(&keylet::signers(&ctx.account)) {
                return Ter::tecNO_ALTERNATIVE_KEY;
            }
            root.regular_key = None;
        }
    }
    ctx.view.update(LedgerEntry::AccountRoot(root));
    Ter::tesSUCCESS
}
