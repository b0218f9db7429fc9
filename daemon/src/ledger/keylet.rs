//! Keys of ledger entries.
//!
//! Every key is the SHA-512-half of a two byte namespace followed by the
//! fields that identify the entry.

use trackable_common::{
    amount::{Currency, Issue},
    crypto::{sha512_half, AccountId, Hash256},
};

use super::EntryType;

mod space {
    pub const ACCOUNT: u16 = b'a' as u16;
    pub const TRUST_LINE: u16 = b'r' as u16;
    pub const OFFER: u16 = b'o' as u16;
    pub const OWNER_DIR: u16 = b'O' as u16;
    pub const SIGNER_LIST: u16 = b'S' as u16;
    pub const AMENDMENTS: u16 = b'f' as u16;
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Keylet {
    pub entry_type: EntryType,
    pub key: Hash256,
}

impl Keylet {
    pub fn new(entry_type: EntryType, key: Hash256) -> Self {
        Self { entry_type, key }
    }
}

pub fn account(id: &AccountId) -> Keylet {
    Keylet::new(
        EntryType::AccountRoot,
        sha512_half(&[&space::ACCOUNT.to_be_bytes(), id.as_bytes()]),
    )
}

/// Trust line between two accounts. The key does not depend on argument
/// order.
pub fn line(a: &AccountId, b: &AccountId, currency: &Currency) -> Keylet {
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    Keylet::new(
        EntryType::RippleState,
        sha512_half(&[
            &space::TRUST_LINE.to_be_bytes(),
            low.as_bytes(),
            high.as_bytes(),
            currency.as_bytes(),
        ]),
    )
}

pub fn line_for_issue(account: &AccountId, issue: &Issue) -> Keylet {
    line(account, &issue.account, &issue.currency)
}

pub fn offer(owner: &AccountId, sequence: u32) -> Keylet {
    Keylet::new(
        EntryType::Offer,
        sha512_half(&[
            &space::OFFER.to_be_bytes(),
            owner.as_bytes(),
            &sequence.to_be_bytes(),
        ]),
    )
}

pub fn owner_dir(owner: &AccountId) -> Keylet {
    Keylet::new(
        EntryType::DirectoryNode,
        sha512_half(&[&space::OWNER_DIR.to_be_bytes(), owner.as_bytes()]),
    )
}

pub fn signers(owner: &AccountId) -> Keylet {
    Keylet::new(
        EntryType::SignerList,
        sha512_half(&[
            &space::SIGNER_LIST.to_be_bytes(),
            owner.as_bytes(),
            &0u32.to_be_bytes(),
        ]),
    )
}

pub fn amendments() -> Keylet {
    Keylet::new(
        EntryType::Amendments,
        sha512_half(&[&space::AMENDMENTS.to_be_bytes()]),
    )
}
