use serde_json::{json, Map, Value};
use trackable_common::{
    crypto::Hash256,
    rpc::{RpcError, RpcErrorCode},
};

use super::{application, context::Context, lookup::lookup_ledger};
use crate::ledger::ReadView;

/// `tx`: find a transaction by id in the open ledger or the history.
pub async fn tx(context: &Context, body: Value) -> Result<Value, RpcError> {
    let app = application(context)?;
    let id = body
        .get("transaction")
        .ok_or_else(|| RpcError::missing_field("transaction"))?;
    let id: Hash256 = id
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| RpcError::from(RpcErrorCode::TxnNotFound))?;
    let (entry, ledger) = app
        .find_transaction(&id)
        .ok_or_else(|| RpcError::from(RpcErrorCode::TxnNotFound))?;

    let mut result = match entry.tx.to_json() {
        Value::Object(obj) => obj,
        _ => Map::new(),
    };
    if let Some(meta) = &entry.meta {
        result.insert("meta".into(), meta.to_json());
    }
    match ledger {
        Some(ledger) => {
            result.insert("ledger_index".into(), json!(ledger.seq()));
            result.insert("validated".into(), json!(true));
        }
        None => {
            result.insert("validated".into(), json!(false));
        }
    }
    Ok(Value::Object(result))
}

/// `transaction_entry`: a transaction with its metadata from one closed
/// ledger.
pub async fn transaction_entry(context: &Context, body: Value) -> Result<Value, RpcError> {
    let app = application(context)?;
    let ledger = lookup_ledger(app, &body)?;
    let tx_hash = body
        .get("tx_hash")
        .ok_or_else(|| RpcError::from(RpcErrorCode::FieldNotFoundTransaction))?;
    if ledger.is_open() {
        return Err(RpcErrorCode::NotYetImplemented.into());
    }

    let mut result = Map::new();
    ledger.inject(&mut result);
    let found = tx_hash
        .as_str()
        .and_then(|s| s.parse::<Hash256>().ok())
        .and_then(|id| ledger.view().tx_read(&id));
    let Some(entry) = found else {
        // Keeps the ledger fields next to the error
        RpcError::from(RpcErrorCode::TransactionNotFound).inject(&mut result);
        return Ok(Value::Object(result));
    };
    result.insert("tx_json".into(), entry.tx.to_json());
    if let Some(meta) = &entry.meta {
        result.insert("metadata".into(), meta.to_json());
    }
    Ok(Value::Object(result))
}
