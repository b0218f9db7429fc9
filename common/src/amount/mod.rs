mod currency;
mod drops;
mod iou;

pub use currency::*;
pub use drops::*;
pub use iou::*;

use serde_json::{json, Value};
use std::{fmt, str::FromStr};
use thiserror::Error;

use crate::{
    crypto::AccountId,
    serializer::{Reader, ReaderError, Serializer, Writer},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Invalid native amount: {0}")]
    BadNative(String),
    #[error("Invalid amount value: {0}")]
    BadValue(String),
    #[error("Invalid currency: {0}")]
    BadCurrency(String),
    #[error("Invalid issuer: {0}")]
    BadIssuer(String),
    #[error("Amount JSON must be a string or an object")]
    BadJson,
    #[error("Amounts of different issues cannot be combined")]
    IssueMismatch,
    #[error("Division by zero")]
    DivisionByZero,
}

/// A currency together with the account that issues it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Issue {
    pub currency: Currency,
    pub account: AccountId,
}

impl Issue {
    pub fn new(currency: Currency, account: AccountId) -> Self {
        Self { currency, account }
    }

    pub fn native() -> Self {
        Self {
            currency: Currency::native(),
            account: AccountId::xrp_account(),
        }
    }

    pub fn is_native(&self) -> bool {
        self.currency.is_native()
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            f.write_str("XRP")
        } else {
            write!(f, "{}/{}", self.currency, self.account)
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Amount {
    Native(Drops),
    Iou { value: IouAmount, issue: Issue },
}

impl Amount {
    pub fn native(drops: i64) -> Self {
        Amount::Native(Drops::new(drops))
    }

    pub fn iou(value: IouAmount, issue: Issue) -> Self {
        Amount::Iou { value, issue }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Amount::Native(_))
    }

    pub fn issue(&self) -> Issue {
        match self {
            Amount::Native(_) => Issue::native(),
            Amount::Iou { issue, .. } => *issue,
        }
    }

    pub fn issuer(&self) -> AccountId {
        self.issue().account
    }

    pub fn currency(&self) -> Currency {
        self.issue().currency
    }

    pub fn drops(&self) -> Option<Drops> {
        match self {
            Amount::Native(d) => Some(*d),
            Amount::Iou { .. } => None,
        }
    }

    pub fn iou_value(&self) -> Option<IouAmount> {
        match self {
            Amount::Native(_) => None,
            Amount::Iou { value, .. } => Some(*value),
        }
    }

    pub fn zeroed(&self) -> Self {
        match self {
            Amount::Native(_) => Amount::Native(Drops::zero()),
            Amount::Iou { issue, .. } => Amount::Iou {
                value: IouAmount::zero(),
                issue: *issue,
            },
        }
    }

    pub fn signum(&self) -> i32 {
        match self {
            Amount::Native(d) => d.drops().signum() as i32,
            Amount::Iou { value, .. } => value.signum(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.signum() == 0
    }

    pub fn is_negative(&self) -> bool {
        self.signum() < 0
    }

    pub fn negate(&self) -> Self {
        match self {
            Amount::Native(d) => Amount::Native(-*d),
            Amount::Iou { value, issue } => Amount::Iou {
                value: -*value,
                issue: *issue,
            },
        }
    }

    pub fn with_issuer(&self, account: AccountId) -> Self {
        match self {
            Amount::Native(_) => *self,
            Amount::Iou { value, issue } => Amount::Iou {
                value: *value,
                issue: Issue::new(issue.currency, account),
            },
        }
    }

    pub fn checked_add(&self, other: &Amount) -> Result<Amount, AmountError> {
        match (self, other) {
            (Amount::Native(a), Amount::Native(b)) => a
                .checked_add(*b)
                .map(Amount::Native)
                .ok_or_else(|| AmountError::BadNative("overflow".into())),
            (Amount::Iou { value: a, issue }, Amount::Iou { value: b, issue: other_issue })
                if issue.currency == other_issue.currency =>
            {
                Ok(Amount::Iou {
                    value: *a + *b,
                    issue: *issue,
                })
            }
            _ => Err(AmountError::IssueMismatch),
        }
    }

    pub fn checked_sub(&self, other: &Amount) -> Result<Amount, AmountError> {
        self.checked_add(&other.negate())
    }

    /// Compare two amounts of the same currency. Issuers are ignored since
    /// trust line balances carry the counterparty as issuer.
    pub fn compare(&self, other: &Amount) -> Result<std::cmp::Ordering, AmountError> {
        match (self, other) {
            (Amount::Native(a), Amount::Native(b)) => Ok(a.cmp(b)),
            (Amount::Iou { value: a, issue: ia }, Amount::Iou { value: b, issue: ib })
                if ia.currency == ib.currency =>
            {
                Ok(a.cmp(b))
            }
            _ => Err(AmountError::IssueMismatch),
        }
    }

    pub fn from_json(value: &Value) -> Result<Self, AmountError> {
        match value {
            Value::String(s) => Ok(Amount::Native(Drops::from_str(s)?)),
            Value::Number(n) => n
                .as_i64()
                .map(Amount::native)
                .ok_or_else(|| AmountError::BadNative(n.to_string())),
            Value::Object(obj) => {
                let currency = obj
                    .get("currency")
                    .and_then(Value::as_str)
                    .ok_or_else(|| AmountError::BadCurrency("missing".into()))?;
                let currency = Currency::from_str(currency)?;
                let amount = match obj.get("value") {
                    Some(Value::String(s)) => IouAmount::from_str(s)?,
                    Some(Value::Number(n)) => IouAmount::from_str(&n.to_string())?,
                    _ => return Err(AmountError::BadValue("missing".into())),
                };
                if currency.is_native() {
                    return Err(AmountError::BadCurrency("XRP".into()));
                }
                let issuer = match obj.get("issuer").and_then(Value::as_str) {
                    Some(s) => AccountId::from_base58(s)
                        .map_err(|_| AmountError::BadIssuer(s.to_owned()))?,
                    None => AccountId::xrp_account(),
                };
                Ok(Amount::Iou {
                    value: amount,
                    issue: Issue::new(currency, issuer),
                })
            }
            _ => Err(AmountError::BadJson),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Amount::Native(d) => Value::String(d.to_string()),
            Amount::Iou { value, issue } => json!({
                "currency": issue.currency.to_string(),
                "issuer": issue.account.to_base58(),
                "value": value.to_string(),
            }),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Native(d) => write!(f, "{}", d),
            Amount::Iou { value, issue } => write!(f, "{}/{}", value, issue),
        }
    }
}

const NOT_NATIVE: u64 = 0x8000_0000_0000_0000;
const POSITIVE: u64 = 0x4000_0000_0000_0000;

impl Serializer for Amount {
    fn write(&self, writer: &mut Writer) {
        match self {
            Amount::Native(d) => {
                let drops = d.drops();
                let mut bits = drops.unsigned_abs();
                if drops >= 0 {
                    bits |= POSITIVE;
                }
                writer.write_u64(bits);
            }
            Amount::Iou { value, issue } => {
                let bits = if value.is_zero() {
                    NOT_NATIVE
                } else {
                    let mut bits = NOT_NATIVE
                        | ((value.exponent() + 97) as u64) << 54
                        | value.mantissa().unsigned_abs();
                    if !value.is_negative() {
                        bits |= POSITIVE;
                    }
                    bits
                };
                writer.write_u64(bits);
                writer.write_bytes(issue.currency.as_bytes());
                writer.write_account(&issue.account);
            }
        }
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let bits = reader.read_u64()?;
        let positive = bits & POSITIVE != 0;
        if bits & NOT_NATIVE == 0 {
            let magnitude = (bits & !POSITIVE) as i64;
            return Ok(Amount::native(if positive { magnitude } else { -magnitude }));
        }
        let currency = Currency::from_bytes(reader.read_bytes(CURRENCY_SIZE)?);
        let account = reader.read_account()?;
        let value = if bits == NOT_NATIVE {
            IouAmount::zero()
        } else {
            let exponent = ((bits >> 54) & 0xff) as i32 - 97;
            let mantissa = (bits & ((1 << 54) - 1)) as i64;
            IouAmount::new(if positive { mantissa } else { -mantissa }, exponent)
        };
        Ok(Amount::Iou {
            value,
            issue: Issue::new(currency, account),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(value: &str) -> Amount {
        let issuer = AccountId::from_public_key_bytes(b"gw");
        Amount::iou(
            IouAmount::from_str(value).unwrap(),
            Issue::new(Currency::from_str("USD").unwrap(), issuer),
        )
    }

    #[test]
    fn test_json_forms() {
        assert_eq!(Amount::native(10).to_json(), json!("10"));
        let parsed = Amount::from_json(&usd("1.5").to_json()).unwrap();
        assert_eq!(parsed, usd("1.5"));
        assert!(Amount::from_json(&json!("1.5")).is_err());
        assert!(Amount::from_json(&json!([1])).is_err());
    }

    #[test]
    fn test_binary_forms() {
        for amount in [Amount::native(0), Amount::native(-25), usd("-3.25"), usd("0")] {
            assert_eq!(Amount::from_bytes(&amount.to_bytes()).unwrap(), amount);
        }
    }

    #[test]
    fn test_mixed_arithmetic_is_rejected() {
        assert_eq!(
            Amount::native(1).checked_add(&usd("1")),
            Err(AmountError::IssueMismatch)
        );
        assert_eq!(usd("3").checked_sub(&usd("1")).unwrap(), usd("2"));
    }
}
