use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::{
    convert::TryInto,
    fmt::{Display, Error, Formatter},
    str::FromStr,
};

use super::CryptoError;

pub const HASH_SIZE: usize = 32; // 32 bytes / 256 bits

// Prefixes mixed into hashes so that objects of different kinds never collide
pub mod prefix {
    pub const TRANSACTION_ID: [u8; 4] = *b"TXN\0";
    pub const TX_SIGN: [u8; 4] = *b"STX\0";
    pub const LEDGER_MASTER: [u8; 4] = *b"LWR\0";
    pub const LEAF_NODE: [u8; 4] = *b"MLN\0";
    pub const MANIFEST: [u8; 4] = *b"MAN\0";
}

#[derive(Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Debug, Hash, Default)]
pub struct Hash256([u8; HASH_SIZE]);

impl Hash256 {
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Hash256(bytes)
    }

    pub const fn zero() -> Self {
        Hash256::new([0; HASH_SIZE])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; HASH_SIZE] {
        self.0
    }

    // Upper case hex, the form used on the wire
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; HASH_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidHashLength {
                    len: bytes.len(),
                    expected: HASH_SIZE,
                })?;
        Ok(Hash256(bytes))
    }
}

impl FromStr for Hash256 {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Hash256::from_slice(&bytes)
    }
}

// First half of SHA-512 over the concatenation of all parts
pub fn sha512_half(parts: &[&[u8]]) -> Hash256 {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&digest[..HASH_SIZE]);
    Hash256(out)
}

#[inline(always)]
pub fn hash(value: &[u8]) -> Hash256 {
    sha512_half(&[value])
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Hash256 {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", &self.to_hex())
    }
}

impl Serialize for Hash256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'a> Deserialize<'a> for Hash256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let hex = String::deserialize(deserializer)?;
        if hex.len() != HASH_SIZE * 2 {
            return Err(SerdeError::custom("Invalid hex length"));
        }
        Hash256::from_str(&hex).map_err(SerdeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha512_half_parts_concatenate() {
        assert_eq!(sha512_half(&[b"ab", b"cd"]), hash(b"abcd"));
        assert_ne!(hash(b"abcd"), Hash256::zero());
    }

    #[test]
    fn test_hex_round_trip_is_case_insensitive() {
        let h = hash(b"trackable");
        let lower = h.to_hex().to_lowercase();
        assert_eq!(Hash256::from_str(&lower).unwrap(), h);
        assert!(Hash256::from_str("DEADBEEF").is_err());
    }
}
