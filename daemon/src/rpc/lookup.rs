use serde_json::{json, Map, Value};
use std::sync::Arc;
use trackable_common::{
    crypto::Hash256,
    rpc::{RpcError, RpcErrorCode},
};

use crate::{
    app::Application,
    ledger::{Ledger, OpenView, ReadView},
};

/// A ledger picked by the `ledger_hash`, `ledger_index` or `ledger` request
/// fields.
#[derive(Clone)]
pub enum LedgerRef {
    Open(OpenView<'static>),
    Closed { ledger: Arc<Ledger>, validated: bool },
}

impl LedgerRef {
    pub fn view(&self) -> &dyn ReadView {
        match self {
            LedgerRef::Open(view) => view,
            LedgerRef::Closed { ledger, .. } => ledger.as_ref(),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, LedgerRef::Open(_))
    }

    /// Describe the ledger in a result object.
    pub fn inject(&self, result: &mut Map<String, Value>) {
        match self {
            LedgerRef::Open(view) => {
                result.insert("ledger_current_index".into(), json!(view.seq()));
                result.insert("validated".into(), json!(false));
            }
            LedgerRef::Closed { ledger, validated } => {
                result.insert("ledger_hash".into(), json!(ledger.info().hash.to_hex()));
                result.insert("ledger_index".into(), json!(ledger.seq()));
                result.insert("validated".into(), json!(validated));
            }
        }
    }
}

fn malformed(message: &str) -> RpcError {
    RpcError::with_message(RpcErrorCode::InvalidParams, message)
}

fn by_shortcut(app: &Application, name: &str) -> Result<LedgerRef, RpcError> {
    match name {
        "current" => Ok(LedgerRef::Open(app.current())),
        // Standalone: every closed ledger counts as validated
        "closed" | "validated" => Ok(LedgerRef::Closed {
            ledger: app.closed(),
            validated: true,
        }),
        _ => Err(malformed("ledgerIndexMalformed")),
    }
}

fn by_index(app: &Application, seq: u32) -> Result<LedgerRef, RpcError> {
    let current = app.current();
    if seq == current.seq() {
        return Ok(LedgerRef::Open(current));
    }
    app.ledger_by_seq(seq)
        .map(|ledger| LedgerRef::Closed {
            ledger,
            validated: true,
        })
        .ok_or_else(|| RpcErrorCode::LgrNotFound.into())
}

fn by_hash(app: &Application, hash: &Value) -> Result<LedgerRef, RpcError> {
    let hash = hash
        .as_str()
        .ok_or_else(|| malformed("ledgerHashNotString"))?;
    let hash: Hash256 = hash.parse().map_err(|_| malformed("ledgerHashMalformed"))?;
    app.ledger_by_hash(&hash)
        .map(|ledger| LedgerRef::Closed {
            ledger,
            validated: true,
        })
        .ok_or_else(|| RpcErrorCode::LgrNotFound.into())
}

fn by_index_value(app: &Application, index: &Value) -> Result<LedgerRef, RpcError> {
    match index {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| malformed("ledgerIndexMalformed"))
            .and_then(|seq| by_index(app, seq)),
        Value::String(s) => match s.parse::<u32>() {
            Ok(seq) => by_index(app, seq),
            Err(_) => by_shortcut(app, s),
        },
        _ => Err(malformed("ledgerIndexMalformed")),
    }
}

/// Resolve the ledger a request refers to. Without any ledger field the
/// open ledger is used.
pub fn lookup_ledger(app: &Application, params: &Value) -> Result<LedgerRef, RpcError> {
    if let Some(hash) = params.get("ledger_hash") {
        return by_hash(app, hash);
    }
    if let Some(index) = params.get("ledger_index") {
        return by_index_value(app, index);
    }
    // Legacy field: a sequence, a shortcut or a hash
    match params.get("ledger") {
        None | Some(Value::Null) => Ok(LedgerRef::Open(app.current())),
        Some(Value::String(s)) if s.len() == 64 => by_hash(app, &Value::String(s.clone())),
        Some(other) => by_index_value(app, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, time_keeper::SystemTimeKeeper};

    fn app(runtime: &tokio::runtime::Runtime) -> Arc<Application> {
        Application::new(Config::default(), Arc::new(SystemTimeKeeper), runtime.handle().clone()).unwrap()
    }

    #[test]
    fn test_default_is_open() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let app = app(&runtime);
        let found = lookup_ledger(&app, &json!({})).unwrap();
        assert!(found.is_open());
        let mut result = Map::new();
        found.inject(&mut result);
        assert_eq!(result["ledger_current_index"], 3);
        assert_eq!(result["validated"], false);
    }

    #[test]
    fn test_lookup_errors() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let app = app(&runtime);
        let error = |params: Value| lookup_ledger(&app, &params).err().unwrap();
        assert_eq!(error(json!({"ledger_hash": 1})).message(), "ledgerHashNotString");
        assert_eq!(error(json!({"ledger_hash": "zz"})).message(), "ledgerHashMalformed");
        assert_eq!(error(json!({"ledger_index": "soon"})).message(), "ledgerIndexMalformed");
        assert_eq!(error(json!({"ledger": 20})).code, RpcErrorCode::LgrNotFound);
    }

    #[test]
    fn test_index_and_hash_agree() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let app = app(&runtime);
        let closed = app.closed();
        let by_seq = lookup_ledger(&app, &json!({"ledger_index": closed.seq()})).unwrap();
        let by_hash = lookup_ledger(&app, &json!({"ledger_hash": closed.info().hash.to_hex()})).unwrap();
        let (mut a, mut b) = (Map::new(), Map::new());
        by_seq.inject(&mut a);
        by_hash.inject(&mut b);
        assert_eq!(a, b);
        assert_eq!(a["ledger_index"], 2);
    }
}
