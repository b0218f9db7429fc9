use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use trackable_common::{
    amount::{Amount, Currency, Drops, Issue, IouAmount},
    crypto::{AccountId, Hash256},
    time::NetTime,
};

use super::keylet::{self, Keylet};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum EntryType {
    AccountRoot,
    RippleState,
    Offer,
    DirectoryNode,
    SignerList,
    Amendments,
}

impl EntryType {
    pub fn name(&self) -> &'static str {
        match self {
            EntryType::AccountRoot => "AccountRoot",
            EntryType::RippleState => "RippleState",
            EntryType::Offer => "Offer",
            EntryType::DirectoryNode => "DirectoryNode",
            EntryType::SignerList => "SignerList",
            EntryType::Amendments => "Amendments",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Amounts are stored in their canonical binary form
mod amount_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use trackable_common::{amount::Amount, serializer::Serializer as _};

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&amount.to_bytes())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Amount::from_bytes(&bytes).map_err(D::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRoot {
    pub account: AccountId,
    pub balance: Drops,
    pub sequence: u32,
    pub owner_count: u32,
    pub flags: u32,
    pub regular_key: Option<AccountId>,
    pub domain: Option<Vec<u8>>,
    pub message_key: Option<Vec<u8>>,
    pub email_hash: Option<[u8; 16]>,
    pub wallet_locator: Option<Hash256>,
    pub transfer_rate: Option<u32>,
    pub account_txn_id: Option<Hash256>,
}

impl AccountRoot {
    pub fn new(account: AccountId, balance: Drops) -> Self {
        Self {
            account,
            balance,
            sequence: 1,
            owner_count: 0,
            flags: 0,
            regular_key: None,
            domain: None,
            message_key: None,
            email_hash: None,
            wallet_locator: None,
            transfer_rate: None,
            account_txn_id: None,
        }
    }

    pub fn is_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }
}

/// Trust line. The balance is from the low account's side: positive when
/// the low account holds the high account's IOUs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RippleState {
    pub low: AccountId,
    pub high: AccountId,
    pub currency: Currency,
    pub balance: IouAmount,
    pub low_limit: IouAmount,
    pub high_limit: IouAmount,
    pub flags: u32,
    pub low_quality_in: u32,
    pub low_quality_out: u32,
    pub high_quality_in: u32,
    pub high_quality_out: u32,
}

impl RippleState {
    pub fn new(a: AccountId, b: AccountId, currency: Currency) -> Self {
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Self {
            low,
            high,
            currency,
            balance: IouAmount::zero(),
            low_limit: IouAmount::zero(),
            high_limit: IouAmount::zero(),
            flags: 0,
            low_quality_in: 0,
            low_quality_out: 0,
            high_quality_in: 0,
            high_quality_out: 0,
        }
    }

    pub fn is_low(&self, account: &AccountId) -> bool {
        &self.low == account
    }

    pub fn other(&self, account: &AccountId) -> AccountId {
        if self.is_low(account) {
            self.high
        } else {
            self.low
        }
    }

    /// Balance as seen by `account`.
    pub fn balance_for(&self, account: &AccountId) -> IouAmount {
        if self.is_low(account) {
            self.balance
        } else {
            -self.balance
        }
    }

    pub fn limit_for(&self, account: &AccountId) -> IouAmount {
        if self.is_low(account) {
            self.low_limit
        } else {
            self.high_limit
        }
    }

    pub fn set_limit_for(&mut self, account: &AccountId, limit: IouAmount) {
        if self.is_low(account) {
            self.low_limit = limit;
        } else {
            self.high_limit = limit;
        }
    }

    pub fn is_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    pub fn key(&self) -> Hash256 {
        keylet::line(&self.low, &self.high, &self.currency).key
    }

    pub fn issue_of(&self, issuer: &AccountId) -> Issue {
        Issue::new(self.currency, *issuer)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub account: AccountId,
    pub sequence: u32,
    #[serde(with = "amount_bytes")]
    pub taker_pays: Amount,
    #[serde(with = "amount_bytes")]
    pub taker_gets: Amount,
    pub flags: u32,
    pub expiration: Option<u32>,
}

/// Owner directory: the keys of every object an account owns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    pub owner: AccountId,
    pub indexes: Vec<Hash256>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerList {
    pub owner: AccountId,
    pub quorum: u32,
    pub entries: Vec<(AccountId, u16)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Majority {
    pub amendment: Hash256,
    pub close_time: NetTime,
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Amendments {
    pub enabled: Vec<Hash256>,
    pub majorities: Vec<Majority>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEntry {
    AccountRoot(AccountRoot),
    RippleState(RippleState),
    Offer(Offer),
    DirectoryNode(DirectoryNode),
    SignerList(SignerList),
    Amendments(Amendments),
}

impl LedgerEntry {
    pub fn entry_type(&self) -> EntryType {
        match self {
            LedgerEntry::AccountRoot(_) => EntryType::AccountRoot,
            LedgerEntry::RippleState(_) => EntryType::RippleState,
            LedgerEntry::Offer(_) => EntryType::Offer,
            LedgerEntry::DirectoryNode(_) => EntryType::DirectoryNode,
            LedgerEntry::SignerList(_) => EntryType::SignerList,
            LedgerEntry::Amendments(_) => EntryType::Amendments,
        }
    }

    pub fn keylet(&self) -> Keylet {
        match self {
            LedgerEntry::AccountRoot(e) => keylet::account(&e.account),
            LedgerEntry::RippleState(e) => keylet::line(&e.low, &e.high, &e.currency),
            LedgerEntry::Offer(e) => keylet::offer(&e.account, e.sequence),
            LedgerEntry::DirectoryNode(e) => keylet::owner_dir(&e.owner),
            LedgerEntry::SignerList(e) => keylet::signers(&e.owner),
            LedgerEntry::Amendments(_) => keylet::amendments(),
        }
    }

    pub fn key(&self) -> Hash256 {
        self.keylet().key
    }

    pub fn as_account_root(&self) -> Option<&AccountRoot> {
        match self {
            LedgerEntry::AccountRoot(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_ripple_state(&self) -> Option<&RippleState> {
        match self {
            LedgerEntry::RippleState(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_offer(&self) -> Option<&Offer> {
        match self {
            LedgerEntry::Offer(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryNode> {
        match self {
            LedgerEntry::DirectoryNode(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_signer_list(&self) -> Option<&SignerList> {
        match self {
            LedgerEntry::SignerList(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_amendments(&self) -> Option<&Amendments> {
        match self {
            LedgerEntry::Amendments(e) => Some(e),
            _ => None,
        }
    }

    pub fn flags(&self) -> u32 {
        match self {
            LedgerEntry::AccountRoot(e) => e.flags,
            LedgerEntry::RippleState(e) => e.flags,
            LedgerEntry::Offer(e) => e.flags,
            _ => 0,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("LedgerEntryType".into(), json!(self.entry_type().name()));
        obj.insert("index".into(), json!(self.key().to_hex()));
        obj.insert("Flags".into(), json!(self.flags()));
        match self {
            LedgerEntry::AccountRoot(e) => {
                obj.insert("Account".into(), json!(e.account.to_base58()));
                obj.insert("Balance".into(), json!(e.balance.to_string()));
                obj.insert("Sequence".into(), json!(e.sequence));
                obj.insert("OwnerCount".into(), json!(e.owner_count));
                if let Some(key) = &e.regular_key {
                    obj.insert("RegularKey".into(), json!(key.to_base58()));
                }
                if let Some(domain) = &e.domain {
                    obj.insert("Domain".into(), json!(hex::encode_upper(domain)));
                }
                if let Some(key) = &e.message_key {
                    obj.insert("MessageKey".into(), json!(hex::encode_upper(key)));
                }
                if let Some(hash) = &e.email_hash {
                    obj.insert("EmailHash".into(), json!(hex::encode_upper(hash)));
                }
                if let Some(locator) = &e.wallet_locator {
                    obj.insert("WalletLocator".into(), json!(locator.to_hex()));
                }
                if let Some(rate) = e.transfer_rate {
                    obj.insert("TransferRate".into(), json!(rate));
                }
                if let Some(id) = &e.account_txn_id {
                    obj.insert("AccountTxnID".into(), json!(id.to_hex()));
                }
            }
            LedgerEntry::RippleState(e) => {
                let balance = Amount::iou(e.balance, Issue::new(e.currency, AccountId::no_account()));
                obj.insert("Balance".into(), balance.to_json());
                let low = Amount::iou(e.low_limit, Issue::new(e.currency, e.low));
                let high = Amount::iou(e.high_limit, Issue::new(e.currency, e.high));
                obj.insert("LowLimit".into(), low.to_json());
                obj.insert("HighLimit".into(), high.to_json());
            }
            LedgerEntry::Offer(e) => {
                obj.insert("Account".into(), json!(e.account.to_base58()));
                obj.insert("Sequence".into(), json!(e.sequence));
                obj.insert("TakerPays".into(), e.taker_pays.to_json());
                obj.insert("TakerGets".into(), e.taker_gets.to_json());
                if let Some(expiration) = e.expiration {
                    obj.insert("Expiration".into(), json!(expiration));
                }
            }
            LedgerEntry::DirectoryNode(e) => {
                obj.insert("Owner".into(), json!(e.owner.to_base58()));
                let indexes: Vec<Value> = e.indexes.iter().map(|h| json!(h.to_hex())).collect();
                obj.insert("Indexes".into(), Value::Array(indexes));
            }
            LedgerEntry::SignerList(e) => {
                obj.insert("SignerQuorum".into(), json!(e.quorum));
                let entries: Vec<Value> = e
                    .entries
                    .iter()
                    .map(|(account, weight)| {
                        json!({"SignerEntry": {"Account": account.to_base58(), "SignerWeight": weight}})
                    })
                    .collect();
                obj.insert("SignerEntries".into(), Value::Array(entries));
            }
            LedgerEntry::Amendments(e) => {
                let enabled: Vec<Value> = e.enabled.iter().map(|h| json!(h.to_hex())).collect();
                obj.insert("Amendments".into(), Value::Array(enabled));
                let majorities: Vec<Value> = e
                    .majorities
                    .iter()
                    .map(|m| {
                        json!({"Majority": {"Amendment": m.amendment.to_hex(), "CloseTime": m.close_time.as_secs()}})
                    })
                    .collect();
                obj.insert("Majorities".into(), Value::Array(majorities));
            }
        }
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackable_common::crypto::KeyPair;

    fn id(name: &str) -> AccountId {
        KeyPair::from_passphrase(name).public_key().account_id()
    }

    #[test]
    fn test_ripple_state_sides() {
        let (a, b) = (id("alice"), id("gw"));
        let mut line = RippleState::new(a, b, "USD".parse().unwrap());
        line.balance = IouAmount::from_integer(if line.is_low(&a) { 5 } else { -5 });
        assert_eq!(line.balance_for(&a), IouAmount::from_integer(5));
        assert_eq!(line.balance_for(&b), IouAmount::from_integer(-5));
        assert_eq!(line.other(&a), b);
    }

    #[test]
    fn test_bincode_round_trip() {
        let entry = LedgerEntry::Offer(Offer {
            account: id("alice"),
            sequence: 3,
            taker_pays: Amount::native(100),
            taker_gets: Amount::iou(
                IouAmount::from_integer(2),
                Issue::new("USD".parse().unwrap(), id("gw")),
            ),
            flags: 0,
            expiration: None,
        });
        let bytes = bincode::serialize(&entry).unwrap();
        let decoded: LedgerEntry = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, entry);
        assert_eq!(decoded.key(), keylet::offer(&id("alice"), 3).key);
    }

    #[test]
    fn test_account_root_json() {
        let mut root = AccountRoot::new(id("alice"), Drops::new(1_000));
        root.transfer_rate = Some(1_100_000_000);
        let json = LedgerEntry::AccountRoot(root).to_json();
        assert_eq!(json["LedgerEntryType"], "AccountRoot");
        assert_eq!(json["Balance"], "1000");
        assert_eq!(json["Sequence"], 1);
        assert_eq!(json["TransferRate"], 1_100_000_000u32);
    }
}
