// File: testing-framework/src/jtx/account.rs
//
// Named test accounts. The key pair is derived from the name, so the same
// name always yields the same account.

use std::{fmt, str::FromStr};
use trackable_common::{
    amount::{Currency, Issue},
    config::MASTER_PASSPHRASE,
    crypto::{AccountId, KeyPair, PublicKey},
};

use super::amount::Iou;

#[derive(Clone)]
pub struct Account {
    name: String,
    passphrase: String,
    keys: KeyPair,
    id: AccountId,
}

impl Account {
    /// Account whose keys come from the passphrase `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with_passphrase(name.clone(), name)
    }

    fn with_passphrase(name: String, passphrase: String) -> Self {
        let keys = KeyPair::from_passphrase(&passphrase);
        let id = keys.public_key().account_id();
        Self {
            name,
            passphrase,
            keys,
            id,
        }
    }

    /// The account holding the genesis supply.
    pub fn master() -> Self {
        Self::with_passphrase("master".into(), MASTER_PASSPHRASE.into())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Secret the server accepts when it signs for this account.
    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Base58 account identifier.
    pub fn human(&self) -> String {
        self.id.to_base58()
    }

    pub fn public_key(&self) -> &PublicKey {
        self.keys.public_key()
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    /// Currency `code` issued by this account.
    ///
    /// # Panics
    ///
    /// When `code` is not a currency code.
    pub fn iou(&self, code: &str) -> Iou {
        match Currency::from_str(code) {
            Ok(currency) => Iou::new(Issue::new(currency, self.id)),
            Err(e) => panic!("{} is not a currency code: {}", code, e),
        }
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Account {}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account({} {})", self.name, self.id)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&Account> for AccountId {
    fn from(account: &Account) -> Self {
        account.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accounts_are_deterministic() {
        assert_eq!(Account::new("alice"), Account::new("alice"));
        assert_ne!(Account::new("alice").id(), Account::new("bob").id());
    }

    #[test]
    fn test_master_uses_the_genesis_passphrase() {
        let master = Account::master();
        assert_eq!(master.name(), "master");
        assert_eq!(master.passphrase(), MASTER_PASSPHRASE);
        assert_eq!(master.id(), KeyPair::from_passphrase(MASTER_PASSPHRASE).public_key().account_id());
    }

    #[test]
    fn test_iou_issuer() {
        let gw = Account::new("gateway");
        let usd = gw.iou("USD");
        assert_eq!(usd.issue().account, gw.id());
    }
}
