use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use super::{decode_token, encode_token, CryptoError, TokenType};

pub const ACCOUNT_ID_SIZE: usize = 20;

/// 160-bit account identifier, rendered as a base58 token starting with `r`.
#[derive(Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Hash, Default)]
pub struct AccountId([u8; ACCOUNT_ID_SIZE]);

impl AccountId {
    pub const fn new(bytes: [u8; ACCOUNT_ID_SIZE]) -> Self {
        AccountId(bytes)
    }

    /// The account standing in as issuer of the native currency.
    pub const fn xrp_account() -> Self {
        AccountId([0; ACCOUNT_ID_SIZE])
    }

    /// Placeholder account that can never sign.
    pub const fn no_account() -> Self {
        let mut bytes = [0; ACCOUNT_ID_SIZE];
        bytes[ACCOUNT_ID_SIZE - 1] = 1;
        AccountId(bytes)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::xrp_account()
    }

    pub fn from_public_key_bytes(public_key: &[u8]) -> Self {
        let digest = Sha256::digest(public_key);
        let mut bytes = [0u8; ACCOUNT_ID_SIZE];
        bytes.copy_from_slice(&digest[..ACCOUNT_ID_SIZE]);
        AccountId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_SIZE] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        encode_token(TokenType::AccountId, &self.0)
    }

    pub fn from_base58(s: &str) -> Result<Self, CryptoError> {
        let payload = decode_token(TokenType::AccountId, s)?;
        let bytes: [u8; ACCOUNT_ID_SIZE] = payload
            .try_into()
            .map_err(|_| CryptoError::InvalidAddress(s.to_owned()))?;
        Ok(AccountId(bytes))
    }
}

impl FromStr for AccountId {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_base58())
    }
}

impl Serialize for AccountId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'a> Deserialize<'a> for AccountId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let s = String::deserialize(deserializer)?;
        AccountId::from_base58(&s).map_err(SerdeError::custom)
    }
}
