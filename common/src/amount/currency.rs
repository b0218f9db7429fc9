use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::AmountError;

pub const CURRENCY_SIZE: usize = 20;

/// 160-bit currency code. Three letter ISO style codes live in bytes 12..15,
/// the all-zero code is the native currency.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Currency([u8; CURRENCY_SIZE]);

impl Currency {
    pub const fn native() -> Self {
        Currency([0; CURRENCY_SIZE])
    }

    pub const fn from_bytes(bytes: [u8; CURRENCY_SIZE]) -> Self {
        Currency(bytes)
    }

    pub fn is_native(&self) -> bool {
        *self == Self::native()
    }

    pub fn as_bytes(&self) -> &[u8; CURRENCY_SIZE] {
        &self.0
    }

    fn iso_code(&self) -> Option<&str> {
        let is_iso = self.0[..12].iter().all(|b| *b == 0) && self.0[15..].iter().all(|b| *b == 0);
        if !is_iso {
            return None;
        }
        std::str::from_utf8(&self.0[12..15]).ok()
    }
}

impl FromStr for Currency {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 3 {
            if s == "XRP" {
                return Ok(Self::native());
            }
            if !s.bytes().all(|b| b.is_ascii_alphanumeric() || b"?!@#$%^&*<>(){}[]|".contains(&b)) {
                return Err(AmountError::BadCurrency(s.to_owned()));
            }
            let mut bytes = [0u8; CURRENCY_SIZE];
            bytes[12..15].copy_from_slice(s.as_bytes());
            return Ok(Currency(bytes));
        }
        if s.len() == CURRENCY_SIZE * 2 {
            let decoded = hex::decode(s).map_err(|_| AmountError::BadCurrency(s.to_owned()))?;
            let mut bytes = [0u8; CURRENCY_SIZE];
            bytes.copy_from_slice(&decoded);
            return Ok(Currency(bytes));
        }
        Err(AmountError::BadCurrency(s.to_owned()))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            return f.write_str("XRP");
        }
        match self.iso_code() {
            Some(code) => f.write_str(code),
            None => f.write_str(&hex::encode_upper(self.0)),
        }
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency({})", self)
    }
}

impl Serialize for Currency {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'a> Deserialize<'a> for Currency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let s = String::deserialize(deserializer)?;
        Currency::from_str(&s).map_err(SerdeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_codes() {
        let usd = Currency::from_str("USD").unwrap();
        assert_eq!(usd.to_string(), "USD");
        assert!(!usd.is_native());
        assert!(Currency::from_str("XRP").unwrap().is_native());
        assert!(Currency::from_str("US").is_err());
        let hex = hex::encode_upper(usd.as_bytes());
        assert_eq!(Currency::from_str(&hex).unwrap(), usd);
    }
}
