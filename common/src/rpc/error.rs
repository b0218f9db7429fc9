use serde_json::{Map, Value};
use std::fmt;

macro_rules! rpc_error_codes {
    ($($name:ident = $code:literal, $token:literal, $message:literal;)*) => {
        /// Error codes a command can report in its result object.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum RpcErrorCode {
            $($name,)*
        }

        impl RpcErrorCode {
            pub const ALL: &'static [RpcErrorCode] = &[$(RpcErrorCode::$name,)*];

            pub fn code(&self) -> i32 {
                match self {
                    $(RpcErrorCode::$name => $code,)*
                }
            }

            pub fn token(&self) -> &'static str {
                match self {
                    $(RpcErrorCode::$name => $token,)*
                }
            }

            pub fn message(&self) -> &'static str {
                match self {
                    $(RpcErrorCode::$name => $message,)*
                }
            }
        }
    };
}

rpc_error_codes! {
    Success = 0, "success", "Success.";
    BadSyntax = 1, "badSyntax", "Syntax error.";
    JsonRpc = 2, "json_rpc", "JSON-RPC transport error.";
    Forbidden = 3, "forbidden", "Bad credentials.";
    NoPermission = 6, "noPermission", "You don't have permission for this command.";
    NoEvents = 7, "noEvents", "Current transport does not support events.";
    TooBusy = 9, "tooBusy", "The server is too busy to help you now.";
    SlowDown = 10, "slowDown", "You are placing too much load on the server.";
    HighFee = 11, "highFee", "Current transaction fee exceeds your limit.";
    NotEnabled = 12, "notEnabled", "Not enabled in configuration.";
    NotReady = 13, "notReady", "Not ready to handle this request.";
    NoClosed = 15, "noClosed", "Closed ledger is unavailable.";
    NoCurrent = 16, "noCurrent", "Current ledger is unavailable.";
    NotStandalone = 18, "notStandAlone", "Operation valid in debug mode only.";
    UnknownCommand = 32, "unknownCmd", "Unknown method.";
    InvalidParams = 31, "invalidParams", "Invalid parameters.";
    ActMalformed = 35, "actMalformed", "Account malformed.";
    ActNotFound = 19, "actNotFound", "Account not found.";
    BadFeature = 36, "badFeature", "Feature unknown or invalid.";
    BadSecret = 41, "badSecret", "Secret does not match account.";
    BadSeed = 42, "badSeed", "Disallowed seed.";
    StreamMalformed = 45, "streamMalformed", "Stream malformed.";
    LgrIdxMalformed = 56, "lgrIdxMalformed", "Ledger index malformed.";
    LgrNotFound = 21, "lgrNotFound", "ledgerNotFound";
    LedgerIndexMalformed = 57, "ledgerIndexMalformed", "Ledger index is malformed.";
    NotYetImplemented = 68, "notYetImplemented", "Not yet implemented.";
    SrcActMissing = 80, "srcActMissing", "Source account not provided.";
    SrcActNotFound = 81, "srcActNotFound", "Source account not found.";
    TxnNotFound = 29, "txnNotFound", "Transaction not found.";
    TransactionNotFound = 85, "transactionNotFound", "Transaction not found.";
    FieldNotFoundTransaction = 87, "fieldNotFoundTransaction", "Missing field 'tx_hash'.";
    InvalidTransaction = 88, "invalidTransaction", "Invalid transaction.";
    Internal = 73, "internal", "Internal error.";
    MalformedRequest = 63, "malformedRequest", "Malformed request.";
}

impl RpcErrorCode {
    pub fn from_token(token: &str) -> Option<RpcErrorCode> {
        Self::ALL.iter().copied().find(|c| c.token() == token)
    }
}

impl fmt::Display for RpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// A command failure: a code plus an optional message overriding the
/// table's default text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub code: RpcErrorCode,
    pub message: Option<String>,
}

impl RpcError {
    pub fn new(code: RpcErrorCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    pub fn with_message(code: RpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn invalid_field(field: &str) -> Self {
        Self::with_message(
            RpcErrorCode::InvalidParams,
            format!("Invalid field '{field}'."),
        )
    }

    pub fn missing_field(field: &str) -> Self {
        Self::with_message(
            RpcErrorCode::InvalidParams,
            format!("Missing field '{field}'."),
        )
    }

    pub fn expected_field(field: &str, kind: &str) -> Self {
        Self::with_message(
            RpcErrorCode::InvalidParams,
            format!("Invalid field '{field}', not {kind}."),
        )
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or(self.code.message())
    }

    /// Write `error`, `error_code`, `error_message` and `status` into a
    /// result object.
    pub fn inject(&self, target: &mut Map<String, Value>) {
        target.insert("error".into(), Value::String(self.code.token().into()));
        target.insert("error_code".into(), Value::from(self.code.code()));
        target.insert("error_message".into(), Value::String(self.message().into()));
        target.insert("status".into(), Value::String("error".into()));
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        self.inject(&mut obj);
        Value::Object(obj)
    }
}

impl From<RpcErrorCode> for RpcError {
    fn from(code: RpcErrorCode) -> Self {
        RpcError::new(code)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.token(), self.message())
    }
}

impl std::error::Error for RpcError {}

pub fn contains_error(json: &Value) -> bool {
    json.get("error").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_and_tokens_are_unique() {
        let codes: HashSet<_> = RpcErrorCode::ALL.iter().map(|c| c.code()).collect();
        let tokens: HashSet<_> = RpcErrorCode::ALL.iter().map(|c| c.token()).collect();
        assert_eq!(codes.len(), RpcErrorCode::ALL.len());
        assert_eq!(tokens.len(), RpcErrorCode::ALL.len());
    }

    #[test]
    fn test_inject() {
        let json = RpcError::from(RpcErrorCode::BadFeature).to_json();
        assert_eq!(json["error"], "badFeature");
        assert_eq!(json["error_message"], "Feature unknown or invalid.");
        assert_eq!(json["status"], "error");
        assert!(contains_error(&json));
        assert_eq!(
            RpcError::invalid_field("account").message(),
            "Invalid field 'account'."
        );
    }
}
