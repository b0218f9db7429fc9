use thiserror::Error;

/// Errors that can occur during cryptographic and encoding operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid hexadecimal string format
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    /// Hash has invalid length
    #[error("Invalid hash length: {len} bytes, expected: {expected} bytes")]
    InvalidHashLength { len: usize, expected: usize },

    /// Invalid checksum in a base58 token
    #[error("Invalid checksum")]
    InvalidChecksum,

    /// Address string is malformed or invalid
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    /// Token decoded fine but carries another token type
    #[error("Unexpected token type: {0}")]
    WrongTokenType(u8),

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Unsupported key type")]
    UnsupportedKeyType,

    #[error("Invalid secret key")]
    InvalidSecretKey,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Signature verification failed")]
    VerificationFailed,
}
