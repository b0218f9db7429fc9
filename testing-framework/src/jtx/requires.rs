// File: testing-framework/src/jtx/requires.rs
//
// Requirement predicates over the open ledger. Each returns an error
// describing the mismatch, so a failing check names what it found.

use anyhow::{bail, Result};
use std::sync::Arc;
use trackable_common::{
    amount::Amount,
    flags::asf,
};
use trackable_daemon::ledger::{helpers, EntryType, LedgerEntry};

use super::{Account, Env, Requirement};

fn requirement(check: impl Fn(&Env) -> Result<()> + Send + Sync + 'static) -> Requirement {
    Arc::new(check)
}

/// `account` holds exactly `amount`: native balance, or the trust line
/// balance toward the issuer of `amount`.
pub fn balance(account: &Account, amount: Amount) -> Requirement {
    let account = account.clone();
    requirement(move |env| {
        let actual = env.balance_of(&account, &amount.issue());
        if actual != amount {
            bail!("Balance mismatch for {}: expected {}, got {}", account, amount, actual);
        }
        Ok(())
    })
}

/// `account` has no account root.
pub fn no_account(account: &Account) -> Requirement {
    let account = account.clone();
    requirement(move |env| {
        if env.le(&account).is_some() {
            bail!("Account {} exists", account);
        }
        Ok(())
    })
}

fn ledger_flags(env: &Env, account: &Account) -> Result<u32> {
    match env.le(&account).as_deref().and_then(LedgerEntry::as_account_root) {
        Some(root) => Ok(root.flags),
        None => bail!("Missing account root for {}", account),
    }
}

fn to_ledger_flags(asf_flags: &[u32]) -> u32 {
    asf_flags
        .iter()
        .filter_map(|flag| asf::to_ledger_flag(*flag))
        .fold(0, |mask, flag| mask | flag)
}

/// Every account flag in `asf_flags` is set on `account`.
pub fn flags(account: &Account, asf_flags: &[u32]) -> Requirement {
    let account = account.clone();
    let mask = to_ledger_flags(asf_flags);
    requirement(move |env| {
        let actual = ledger_flags(env, &account)?;
        if actual & mask != mask {
            bail!("Flags of {}: expected {:#x} set, got {:#x}", account, mask, actual);
        }
        Ok(())
    })
}

/// No account flag in `asf_flags` is set on `account`.
pub fn nflags(account: &Account, asf_flags: &[u32]) -> Requirement {
    let account = account.clone();
    let mask = to_ledger_flags(asf_flags);
    requirement(move |env| {
        let actual = ledger_flags(env, &account)?;
        if actual & mask != 0 {
            bail!("Flags of {}: expected {:#x} clear, got {:#x}", account, mask, actual);
        }
        Ok(())
    })
}

/// `account` owns `count` ledger objects, per its owner count.
pub fn owners(account: &Account, count: u32) -> Requirement {
    let account = account.clone();
    requirement(move |env| {
        let actual = match env.le(&account).as_deref().and_then(LedgerEntry::as_account_root) {
            Some(root) => root.owner_count,
            None => bail!("Missing account root for {}", account),
        };
        if actual != count {
            bail!("Owner count of {}: expected {}, got {}", account, count, actual);
        }
        Ok(())
    })
}

fn owned(env: &Env, account: &Account, entry_type: EntryType) -> usize {
    env.with_current(|view| {
        helpers::owner_entries(view, &account.id())
            .iter()
            .filter(|entry| entry.entry_type() == entry_type)
            .count()
    })
}

/// `account`'s owner directory holds `count` trust lines.
pub fn lines(account: &Account, count: usize) -> Requirement {
    let account = account.clone();
    requirement(move |env| {
        let actual = owned(env, &account, EntryType::RippleState);
        if actual != count {
            bail!("Trust lines of {}: expected {}, got {}", account, count, actual);
        }
        Ok(())
    })
}

/// `account`'s owner directory holds `count` offers.
pub fn offers(account: &Account, count: usize) -> Requirement {
    let account = account.clone();
    requirement(move |env| {
        let actual = owned(env, &account, EntryType::Offer);
        if actual != count {
            bail!("Offers of {}: expected {}, got {}", account, count, actual);
        }
        Ok(())
    })
}
