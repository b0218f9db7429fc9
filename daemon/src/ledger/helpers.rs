//! Balance queries and value transfers shared by the transactors and the
//! RPC handlers.

use log::trace;
use std::sync::Arc;
use trackable_common::{
    amount::{Amount, Currency, Drops, IouAmount, Issue},
    config::QUALITY_ONE,
    crypto::{AccountId, Hash256},
    flags::lsf,
    ter::Ter,
};

use super::{
    entry::{AccountRoot, DirectoryNode, LedgerEntry, RippleState},
    keylet::{self, Keylet},
    view::{ApplyView, ReadView},
};

pub fn peek_account<V: ReadView + ?Sized>(view: &V, id: &AccountId) -> Option<AccountRoot> {
    view.read_keylet(&keylet::account(id))
        .and_then(|entry| entry.as_account_root().cloned())
}

pub fn peek_line<V: ReadView + ?Sized>(view: &V, keylet: &Keylet) -> Option<RippleState> {
    view.read_keylet(keylet)
        .and_then(|entry| entry.as_ripple_state().cloned())
}

pub fn transfer_rate<V: ReadView + ?Sized>(view: &V, issuer: &AccountId) -> u32 {
    peek_account(view, issuer)
        .and_then(|root| root.transfer_rate)
        .unwrap_or(QUALITY_ONE)
}

/// Whether `account` may not move `issue` because the issuer froze it.
pub fn is_frozen<V: ReadView + ?Sized>(view: &V, account: &AccountId, issue: &Issue) -> bool {
    if issue.is_native() {
        return false;
    }
    let Some(issuer) = peek_account(view, &issue.account) else {
        return false;
    };
    if issuer.is_flag(lsf::GLOBAL_FREEZE) {
        return true;
    }
    if account == &issue.account {
        return false;
    }
    peek_line(view, &keylet::line_for_issue(account, issue))
        .map(|line| {
            let issuer_is_high = !line.is_low(&issue.account);
            line.is_flag(if issuer_is_high {
                lsf::HIGH_FREEZE
            } else {
                lsf::LOW_FREEZE
            })
        })
        .unwrap_or(false)
}

/// Native balance an account may spend: balance above its reserve.
pub fn xrp_liquid<V: ReadView + ?Sized>(view: &V, account: &AccountId, owner_count_adj: i32) -> Drops {
    let Some(root) = peek_account(view, account) else {
        return Drops::zero();
    };
    let owners = (root.owner_count as i64 + owner_count_adj as i64).max(0) as u32;
    let reserve = view.fees().account_reserve(owners);
    let balance = view
        .balance_hook(account, &AccountId::xrp_account(), Amount::Native(root.balance))
        .drops()
        .unwrap_or_default();
    if balance < reserve {
        Drops::zero()
    } else {
        balance - reserve
    }
}

/// How much of `issue` the account holds and may spend.
pub fn account_holds<V: ReadView + ?Sized>(view: &V, account: &AccountId, issue: &Issue) -> Amount {
    if issue.is_native() {
        return Amount::Native(xrp_liquid(view, account, 0));
    }
    let zero = Amount::iou(IouAmount::zero(), *issue);
    if is_frozen(view, account, issue) {
        return zero;
    }
    let Some(line) = peek_line(view, &keylet::line_for_issue(account, issue)) else {
        return zero;
    };
    let held = Amount::iou(line.balance_for(account), *issue);
    view.balance_hook(account, &issue.account, held)
}

/// Like [`account_holds`], but an issuer has unlimited funds of its own
/// currency.
pub fn account_funds<V: ReadView + ?Sized>(view: &V, account: &AccountId, default: &Amount) -> Amount {
    if !default.is_native() && default.issuer() == *account {
        return *default;
    }
    account_holds(view, account, &default.issue())
}

pub fn adjust_owner_count<V: ApplyView + ?Sized>(view: &mut V, account: &AccountId, delta: i32) -> Ter {
    let Some(mut root) = peek_account(view, account) else {
        return Ter::tefINTERNAL;
    };
    root.owner_count = (root.owner_count as i64 + delta as i64).max(0) as u32;
    view.update(LedgerEntry::AccountRoot(root));
    Ter::tesSUCCESS
}

pub fn dir_insert<V: ApplyView + ?Sized>(view: &mut V, owner: &AccountId, key: Hash256) {
    let keylet = keylet::owner_dir(owner);
    match view.read_keylet(&keylet).and_then(|e| e.as_directory().cloned()) {
        Some(mut dir) => {
            if !dir.indexes.contains(&key) {
                dir.indexes.push(key);
                view.update(LedgerEntry::DirectoryNode(dir));
            }
        }
        None => view.insert(LedgerEntry::DirectoryNode(DirectoryNode {
            owner: *owner,
            indexes: vec![key],
        })),
    }
}

/// Returns false when the key was not in the directory.
pub fn dir_remove<V: ApplyView + ?Sized>(view: &mut V, owner: &AccountId, key: &Hash256) -> bool {
    let keylet = keylet::owner_dir(owner);
    let Some(mut dir) = view.read_keylet(&keylet).and_then(|e| e.as_directory().cloned()) else {
        return false;
    };
    let before = dir.indexes.len();
    dir.indexes.retain(|index| index != key);
    if dir.indexes.len() == before {
        return false;
    }
    if dir.indexes.is_empty() {
        view.erase(&keylet.key);
    } else {
        view.update(LedgerEntry::DirectoryNode(dir));
    }
    true
}

/// Entries listed in an account's owner directory.
pub fn owner_entries<V: ReadView + ?Sized>(view: &V, owner: &AccountId) -> Vec<Arc<LedgerEntry>> {
    view.read_keylet(&keylet::owner_dir(owner))
        .and_then(|e| e.as_directory().cloned())
        .map(|dir| dir.indexes.iter().filter_map(|key| view.read(key)).collect())
        .unwrap_or_default()
}

pub fn side_flag(is_low: bool, low_flag: u32, high_flag: u32) -> u32 {
    if is_low {
        low_flag
    } else {
        high_flag
    }
}

/// Whether `account`'s side of the line holds nothing worth a reserve.
pub fn is_default_side<V: ReadView + ?Sized>(view: &V, line: &RippleState, account: &AccountId) -> bool {
    let low = line.is_low(account);
    let default_trackable = peek_account(view, account)
        .map(|root| root.is_flag(lsf::DEFAULT_TRACKABLE))
        .unwrap_or(false);
    let no_trackable = line.is_flag(side_flag(low, lsf::LOW_NO_TRACKABLE, lsf::HIGH_NO_TRACKABLE));
    let (quality_in, quality_out) = if low {
        (line.low_quality_in, line.low_quality_out)
    } else {
        (line.high_quality_in, line.high_quality_out)
    };
    line.balance_for(account).signum() <= 0
        && line.limit_for(account).is_zero()
        && no_trackable == !default_trackable
        && !line.is_flag(side_flag(low, lsf::LOW_FREEZE, lsf::HIGH_FREEZE))
        && quality_in == 0
        && quality_out == 0
}

/// Settings of the side of a new trust line that asked for it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrustLineSetup {
    pub limit: IouAmount,
    /// Initial balance from the creating account's side.
    pub balance: IouAmount,
    pub no_trackable: bool,
    pub auth: bool,
    pub freeze: bool,
    pub quality_in: u32,
    pub quality_out: u32,
}

/// Create a trust line owned by `account` towards `peer`. The peer side
/// blocks rippling unless the peer enabled `DefaultTrackable`.
pub fn trust_create<V: ApplyView + ?Sized>(
    view: &mut V,
    account: &AccountId,
    peer: &AccountId,
    currency: Currency,
    setup: TrustLineSetup,
) -> Ter {
    let Some(peer_root) = peek_account(view, peer) else {
        return Ter::tecNO_TARGET;
    };
    let mut line = RippleState::new(*account, *peer, currency);
    let low = line.is_low(account);
    line.set_limit_for(account, setup.limit);
    line.balance = if low { setup.balance } else { -setup.balance };
    line.flags |= side_flag(low, lsf::LOW_RESERVE, lsf::HIGH_RESERVE);
    if setup.no_trackable {
        line.flags |= side_flag(low, lsf::LOW_NO_TRACKABLE, lsf::HIGH_NO_TRACKABLE);
    }
    if setup.auth {
        line.flags |= side_flag(low, lsf::LOW_AUTH, lsf::HIGH_AUTH);
    }
    if setup.freeze {
        line.flags |= side_flag(low, lsf::LOW_FREEZE, lsf::HIGH_FREEZE);
    }
    if !peer_root.is_flag(lsf::DEFAULT_TRACKABLE) {
        line.flags |= side_flag(!low, lsf::LOW_NO_TRACKABLE, lsf::HIGH_NO_TRACKABLE);
    }
    if low {
        line.low_quality_in = setup.quality_in;
        line.low_quality_out = setup.quality_out;
    } else {
        line.high_quality_in = setup.quality_in;
        line.high_quality_out = setup.quality_out;
    }

    let key = line.key();
    dir_insert(view, account, key);
    dir_insert(view, peer, key);
    trace!("Created trust line {} between {} and {}", key, account, peer);
    view.insert(LedgerEntry::RippleState(line));
    adjust_owner_count(view, account, 1)
}

/// Remove a trust line from both owner directories and the ledger. Owner
/// counts are the caller's business.
pub fn trust_delete<V: ApplyView + ?Sized>(view: &mut V, line: &RippleState) -> Ter {
    let key = line.key();
    if !dir_remove(view, &line.low, &key) || !dir_remove(view, &line.high, &key) {
        return Ter::tefBAD_LEDGER;
    }
    view.erase(&key);
    Ter::tesSUCCESS
}

/// Move IOUs directly between two accounts sharing a trust line. Creates
/// the line for the receiver when there is none.
pub fn ripple_credit<V: ApplyView + ?Sized>(
    view: &mut V,
    sender: &AccountId,
    receiver: &AccountId,
    amount: &Amount,
) -> Ter {
    let Some(value) = amount.iou_value() else {
        return Ter::tefINTERNAL;
    };
    let currency = amount.currency();
    let Some(mut line) = peek_line(view, &keylet::line(sender, receiver, &currency)) else {
        view.credit_hook(sender, receiver, amount, &amount.zeroed());
        return trust_create(
            view,
            receiver,
            sender,
            currency,
            TrustLineSetup {
                balance: value,
                ..Default::default()
            },
        );
    };

    let before = line.balance_for(sender);
    view.credit_hook(sender, receiver, amount, &Amount::iou(before, amount.issue()));
    let after = before - value;

    let sender_low = line.is_low(sender);
    let sender_reserve = side_flag(sender_low, lsf::LOW_RESERVE, lsf::HIGH_RESERVE);
    let receiver_reserve = side_flag(!sender_low, lsf::LOW_RESERVE, lsf::HIGH_RESERVE);
    line.balance = if sender_low { after } else { -after };

    let mut delete = false;
    if before.signum() > 0
        && after.signum() <= 0
        && line.is_flag(sender_reserve)
        && is_default_side(view, &line, sender)
    {
        let ter = adjust_owner_count(view, sender, -1);
        if !ter.is_tes_success() {
            return ter;
        }
        line.flags &= !sender_reserve;
        delete = after.is_zero() && !line.is_flag(receiver_reserve);
    }

    if delete {
        trust_delete(view, &line)
    } else {
        view.update(LedgerEntry::RippleState(line));
        Ter::tesSUCCESS
    }
}

/// The issuer hands out IOUs to a holder.
pub fn issue_iou<V: ApplyView + ?Sized>(view: &mut V, account: &AccountId, amount: &Amount) -> Ter {
    ripple_credit(view, &amount.issuer(), account, amount)
}

/// A holder returns IOUs to their issuer.
pub fn redeem_iou<V: ApplyView + ?Sized>(view: &mut V, account: &AccountId, amount: &Amount) -> Ter {
    ripple_credit(view, account, &amount.issuer(), amount)
}

pub fn transfer_xrp<V: ApplyView + ?Sized>(
    view: &mut V,
    from: &AccountId,
    to: &AccountId,
    amount: Drops,
) -> Ter {
    let (Some(mut sender), Some(_)) = (peek_account(view, from), peek_account(view, to)) else {
        return Ter::tefINTERNAL;
    };
    if sender.balance < amount {
        return if view.open() {
            Ter::telFAILED_PROCESSING
        } else {
            Ter::tecFAILED_PROCESSING
        };
    }
    view.credit_hook(
        from,
        &AccountId::xrp_account(),
        &Amount::Native(amount),
        &Amount::Native(sender.balance),
    );
    sender.balance -= amount;
    view.update(LedgerEntry::AccountRoot(sender));

    // Read again: sender and receiver may be the same account.
    let Some(mut receiver) = peek_account(view, to) else {
        return Ter::tefINTERNAL;
    };
    view.credit_hook(
        &AccountId::xrp_account(),
        to,
        &Amount::Native(amount),
        &Amount::Native(-receiver.balance),
    );
    receiver.balance += amount;
    view.update(LedgerEntry::AccountRoot(receiver));
    Ter::tesSUCCESS
}

/// Send `amount` from one account to another. IOUs between two holders
/// travel through the issuer, which charges its transfer rate.
pub fn account_send<V: ApplyView + ?Sized>(
    view: &mut V,
    from: &AccountId,
    to: &AccountId,
    amount: &Amount,
) -> Ter {
    let issue = match amount {
        Amount::Native(drops) => return transfer_xrp(view, from, to, *drops),
        Amount::Iou { issue, .. } => *issue,
    };
    if from == to || amount.is_zero() {
        return Ter::tesSUCCESS;
    }
    if *from == issue.account || *to == issue.account || issue.account == AccountId::no_account() {
        return ripple_credit(view, from, to, amount);
    }
    let ter = ripple_credit(view, &issue.account, to, amount);
    if !ter.is_tes_success() {
        return ter;
    }
    ripple_credit(view, from, &issue.account, &send_cost(view, amount))
}

/// What the sender pays for `amount` to arrive, transfer fee included.
pub fn send_cost<V: ReadView + ?Sized>(view: &V, amount: &Amount) -> Amount {
    match amount {
        Amount::Native(_) => *amount,
        Amount::Iou { value, issue } => {
            let rate = transfer_rate(view, &issue.account);
            if rate == QUALITY_ONE {
                *amount
            } else {
                Amount::iou(value.multiply_rate(rate), *issue)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::FeeSetup,
        ledger::{ledger::Ledger, view::{ApplyFlags, ApplyViewImpl, PaymentSandbox}},
    };
    use trackable_common::{
        config::DROPS_PER_UNIT, crypto::KeyPair, features::FeatureSet, time::NetTime,
    };

    fn id(name: &str) -> AccountId {
        KeyPair::from_passphrase(name).public_key().account_id()
    }

    fn usd(value: i64, issuer: &AccountId) -> Amount {
        Amount::iou(
            IouAmount::from_integer(value),
            Issue::new("USD".parse().unwrap(), *issuer),
        )
    }

    // Genesis plus funded accounts, each with DefaultTrackable set.
    fn ledger_with(accounts: &[&str]) -> Ledger {
        let master = id("masterpassphrase");
        let ledger =
            Ledger::genesis(&FeeSetup::default(), &FeatureSet::new(), &[], master).unwrap();
        let mut next = Ledger::successor(&ledger, &FeatureSet::new());
        for name in accounts {
            let mut root = AccountRoot::new(id(name), Drops::new(10_000 * DROPS_PER_UNIT));
            root.flags |= lsf::DEFAULT_TRACKABLE;
            next.raw_replace(LedgerEntry::AccountRoot(root));
        }
        next.accept(NetTime::from_secs(10), true).unwrap();
        next
    }

    #[test]
    fn test_trust_create_and_owner_directories() {
        let ledger = ledger_with(&["alice", "gw"]);
        let (alice, gw) = (id("alice"), id("gw"));
        let mut view = ApplyViewImpl::new(&ledger, ApplyFlags::NONE);
        let ter = trust_create(
            &mut view,
            &alice,
            &gw,
            "USD".parse().unwrap(),
            TrustLineSetup {
                limit: IouAmount::from_integer(100),
                ..Default::default()
            },
        );
        assert_eq!(ter, Ter::tesSUCCESS);
        assert_eq!(peek_account(&view, &alice).unwrap().owner_count, 1);
        assert_eq!(peek_account(&view, &gw).unwrap().owner_count, 0);
        assert_eq!(owner_entries(&view, &alice).len(), 1);
        assert_eq!(owner_entries(&view, &gw).len(), 1);
    }

    #[test]
    fn test_issue_and_send_through_issuer() {
        let ledger = ledger_with(&["alice", "bob", "gw"]);
        let (alice, bob, gw) = (id("alice"), id("bob"), id("gw"));
        let mut view = ApplyViewImpl::new(&ledger, ApplyFlags::NONE);
        for holder in [&alice, &bob] {
            let setup = TrustLineSetup {
                limit: IouAmount::from_integer(100),
                ..Default::default()
            };
            assert!(trust_create(&mut view, holder, &gw, "USD".parse().unwrap(), setup)
                .is_tes_success());
        }
        assert!(issue_iou(&mut view, &alice, &usd(50, &gw)).is_tes_success());
        assert!(account_send(&mut view, &alice, &bob, &usd(20, &gw)).is_tes_success());
        let issue = usd(0, &gw).issue();
        assert_eq!(account_holds(&view, &alice, &issue), usd(30, &gw));
        assert_eq!(account_holds(&view, &bob, &issue), usd(20, &gw));
        assert_eq!(account_funds(&view, &gw, &usd(7, &gw)), usd(7, &gw));
    }

    #[test]
    fn test_sandbox_hides_received_funds() {
        let ledger = ledger_with(&["alice", "bob"]);
        let (alice, bob) = (id("alice"), id("bob"));
        let base = ApplyViewImpl::new(&ledger, ApplyFlags::NONE);
        let before = xrp_liquid(&base, &bob, 0);

        let mut sandbox = PaymentSandbox::new(&base, ApplyFlags::NONE);
        let amount = Drops::new(100 * DROPS_PER_UNIT);
        assert!(transfer_xrp(&mut sandbox, &alice, &bob, amount).is_tes_success());
        assert_eq!(xrp_liquid(&sandbox, &bob, 0), before);
        assert_eq!(xrp_liquid(&sandbox, &alice, 0), before - amount);
        assert_eq!(peek_account(&sandbox, &bob).unwrap().balance, Drops::new(10_100 * DROPS_PER_UNIT));
    }

    #[test]
    fn test_xrp_liquid_never_negative() {
        let ledger = ledger_with(&["alice"]);
        let alice = id("alice");
        let mut view = ApplyViewImpl::new(&ledger, ApplyFlags::NONE);
        let mut root = peek_account(&view, &alice).unwrap();
        root.balance = Drops::new(1);
        view.update(LedgerEntry::AccountRoot(root));
        assert_eq!(xrp_liquid(&view, &alice, 0), Drops::zero());
    }
}
