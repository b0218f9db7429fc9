use thiserror::Error;

use crate::{amount::AmountError, crypto::CryptoError, serializer::ReaderError};

/// Failure turning JSON or bytes into a transaction object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Transaction JSON must be an object")]
    NotAnObject,
    #[error("Unknown field '{0}'")]
    UnknownField(String),
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("Unknown transaction type '{0}'")]
    UnknownTxType(String),
    #[error("Unknown field codes {0}/{1}")]
    UnknownFieldCode(u8, u8),
    #[error("Fields out of canonical order")]
    NonCanonical,
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

impl ParseError {
    pub(crate) fn invalid(field: &'static str, reason: impl ToString) -> Self {
        ParseError::InvalidValue {
            field,
            reason: reason.to_string(),
        }
    }
}

impl From<AmountError> for ParseError {
    fn from(e: AmountError) -> Self {
        ParseError::InvalidValue {
            field: "Amount",
            reason: e.to_string(),
        }
    }
}

/// A well formed object that is not a valid transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),
    #[error("Field '{0}' is not allowed for this transaction type")]
    UnexpectedField(&'static str),
    #[error("Fee must be in native currency")]
    NonNativeFee,
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
