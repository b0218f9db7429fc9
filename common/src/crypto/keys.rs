//! Ed25519 signing keys for accounts, validators and publishers.
//!
//! Public keys travel as 33 bytes: a `0xED` type prefix followed by the
//! 32 byte ed25519 point. Secrets are derived from a 16 byte seed, and test
//! seeds are derived from a passphrase.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::{rngs::OsRng, RngCore};
use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{decode_token, encode_token, sha512_half, AccountId, CryptoError, TokenType};

pub const SEED_SIZE: usize = 16;
pub const PUBLIC_KEY_SIZE: usize = 33;
pub const SECRET_KEY_SIZE: usize = 32;
pub const SIGNATURE_SIZE: usize = 64;

const ED25519_PREFIX: u8 = 0xED;

/// Kind of a serialized public key, decided by its length and prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicKeyType {
    Ed25519,
    Secp256k1,
}

pub fn public_key_type(bytes: &[u8]) -> Option<PublicKeyType> {
    if bytes.len() != PUBLIC_KEY_SIZE {
        return None;
    }
    match bytes[0] {
        ED25519_PREFIX => Some(PublicKeyType::Ed25519),
        0x02 | 0x03 => Some(PublicKeyType::Secp256k1),
        _ => None,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Seed([u8; SEED_SIZE]);

impl Seed {
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = sha512_half(&[passphrase.as_bytes()]);
        let mut bytes = [0u8; SEED_SIZE];
        bytes.copy_from_slice(&digest.as_bytes()[..SEED_SIZE]);
        Seed(bytes)
    }

    pub fn random() -> Self {
        let mut bytes = [0u8; SEED_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Seed(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; SEED_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSecretKey)?;
        Ok(Seed(bytes))
    }

    /// Parse a family seed token, falling back to treating `s` as a
    /// passphrase.
    pub fn parse_generic(s: &str) -> Self {
        decode_token(TokenType::FamilySeed, s)
            .and_then(|bytes| Self::from_slice(&bytes))
            .unwrap_or_else(|_| Self::from_passphrase(s))
    }

    pub fn as_bytes(&self) -> &[u8; SEED_SIZE] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        encode_token(TokenType::FamilySeed, &self.0)
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed([REDACTED])")
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        match public_key_type(bytes) {
            Some(PublicKeyType::Ed25519) => {}
            Some(PublicKeyType::Secp256k1) => return Err(CryptoError::UnsupportedKeyType),
            None => return Err(CryptoError::InvalidPublicKey),
        }
        let mut out = [0u8; PUBLIC_KEY_SIZE];
        out.copy_from_slice(bytes);
        VerifyingKey::from_bytes(&point(&out)).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(PublicKey(out))
    }

    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn account_id(&self) -> AccountId {
        AccountId::from_public_key_bytes(&self.0)
    }

    pub fn to_node_public(&self) -> String {
        encode_token(TokenType::NodePublic, &self.0)
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let key = VerifyingKey::from_bytes(&point(&self.0)).map_err(|_| CryptoError::InvalidPublicKey)?;
        let signature =
            DalekSignature::from_slice(signature).map_err(|_| CryptoError::InvalidSignature)?;
        key.verify(message, &signature)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

fn point(bytes: &[u8; PUBLIC_KEY_SIZE]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes[1..]);
    out
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'a> Deserialize<'a> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let hex = String::deserialize(deserializer)?;
        PublicKey::from_hex(&hex).map_err(SerdeError::custom)
    }
}

/// Secret key, never printed.
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl SecretKey {
    pub fn from_seed(seed: &Seed) -> Self {
        let digest = sha512_half(&[seed.as_bytes()]);
        SecretKey(SigningKey::from_bytes(digest.as_bytes()))
    }

    pub fn to_bytes(&self) -> [u8; SECRET_KEY_SIZE] {
        self.0.to_bytes()
    }

    pub fn to_node_private(&self) -> String {
        encode_token(TokenType::NodePrivate, &self.to_bytes())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct KeyPair {
    public: PublicKey,
    secret: SecretKey,
}

impl KeyPair {
    pub fn from_seed(seed: &Seed) -> Self {
        let secret = SecretKey::from_seed(seed);
        let verifying = secret.0.verifying_key();
        let mut public = [0u8; PUBLIC_KEY_SIZE];
        public[0] = ED25519_PREFIX;
        public[1..].copy_from_slice(verifying.as_bytes());
        Self {
            public: PublicKey(public),
            secret,
        }
    }

    pub fn from_passphrase(passphrase: &str) -> Self {
        Self::from_seed(&Seed::from_passphrase(passphrase))
    }

    pub fn random() -> Self {
        Self::from_seed(&Seed::random())
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.secret.0.sign(message).to_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passphrase_keys_are_deterministic() {
        let a = KeyPair::from_passphrase("alice");
        let b = KeyPair::from_passphrase("alice");
        assert_eq!(a.public_key(), b.public_key());
        assert_ne!(a.public_key(), KeyPair::from_passphrase("bob").public_key());
        assert_eq!(public_key_type(a.public_key().as_bytes()), Some(PublicKeyType::Ed25519));
    }

    #[test]
    fn test_seed_token_or_passphrase() {
        let seed = Seed::from_passphrase("alice");
        assert_eq!(Seed::parse_generic(&seed.to_base58()), seed);
        assert_eq!(Seed::parse_generic("alice"), seed);
        assert!(Seed::from_slice(&[0u8; 3]).is_err());
    }

    #[test]
    fn test_sign_and_verify() {
        let keys = KeyPair::random();
        let sig = keys.sign(b"payload");
        assert_eq!(sig.len(), SIGNATURE_SIZE);
        assert!(keys.public_key().verify(b"payload", &sig).is_ok());
        assert_eq!(
            keys.public_key().verify(b"other", &sig),
            Err(CryptoError::VerificationFailed)
        );
    }

    #[test]
    fn test_foreign_key_types() {
        let mut secp = [0u8; PUBLIC_KEY_SIZE];
        secp[0] = 0x02;
        assert_eq!(public_key_type(&secp), Some(PublicKeyType::Secp256k1));
        assert_eq!(PublicKey::from_slice(&secp), Err(CryptoError::UnsupportedKeyType));
        assert_eq!(public_key_type(&[0x04; 65]), None);
        assert_eq!(public_key_type(b"NOT_REALLY_A_PUBKEY"), None);
    }
}
