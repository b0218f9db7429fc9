use log::debug;
use serde_json::{json, Value};
use std::sync::Arc;
use trackable_common::{
    crypto::{AccountId, KeyPair, Seed},
    rpc::{RpcError, RpcErrorCode},
    ter::Ter,
    transaction::{sign_json, Field, Transaction},
};

use super::{application, context::Context};
use crate::ledger::{helpers::peek_account, ReadView};

/// Default limit on an autofilled fee, in multiples of the base fee.
pub const DEFAULT_FEE_MULT_MAX: u64 = 10;

fn engine_result(ter: Ter, tx: &Transaction) -> Value {
    json!({
        "engine_result": ter.token(),
        "engine_result_code": ter.code(),
        "engine_result_message": ter.human(),
        "tx_blob": hex::encode_upper(tx.to_blob()),
        "tx_json": tx.to_json(),
    })
}

fn submit_blob(context: &Context, blob: &Value) -> Result<Value, RpcError> {
    let app = application(context)?;
    let blob = blob
        .as_str()
        .ok_or_else(|| RpcError::expected_field("tx_blob", "string"))?;
    let bytes = hex::decode(blob).map_err(|_| RpcError::invalid_field("tx_blob"))?;
    let tx = Transaction::from_blob(&bytes).map_err(|e| {
        RpcError::with_message(RpcErrorCode::InvalidTransaction, format!("fails local checks: {}", e))
    })?;
    let tx = Arc::new(tx);
    let (ter, _) = app.submit(&tx);
    Ok(engine_result(ter, &tx))
}

// Fills in Fee and Sequence, then signs with the key derived from `secret`
fn sign_for(context: &Context, params: &Value, tx_json: &mut Value) -> Result<(), RpcError> {
    let app = application(context)?;
    let secret = params
        .get("secret")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::missing_field("secret"))?;
    let keys = KeyPair::from_seed(&Seed::parse_generic(secret));

    let account = tx_json
        .get("Account")
        .ok_or_else(|| RpcError::from(RpcErrorCode::SrcActMissing))?;
    let account = account
        .as_str()
        .and_then(|s| AccountId::from_base58(s).ok())
        .ok_or_else(|| RpcError::from(RpcErrorCode::SrcActNotFound))?;

    let view = app.current();
    let root = peek_account(&view, &account).ok_or_else(|| RpcError::from(RpcErrorCode::SrcActNotFound))?;
    let signer = keys.public_key().account_id();
    if signer != account && root.regular_key != Some(signer) {
        return Err(RpcErrorCode::BadSecret.into());
    }

    if tx_json.get("Fee").is_none() {
        let mult_max = params
            .get("fee_mult_max")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_FEE_MULT_MAX);
        let base = view.fees().base;
        let fee = app.txq().open_ledger_fee(&view);
        let limit = base.drops().saturating_mul(mult_max as i64);
        if fee.drops() > limit {
            debug!("Autofilled fee {} exceeds the limit {}", fee, limit);
            return Err(RpcErrorCode::HighFee.into());
        }
        tx_json["Fee"] = json!(fee.drops().to_string());
    }
    if tx_json.get("Sequence").is_none() {
        tx_json["Sequence"] = json!(root.sequence);
    }
    sign_json(tx_json, &keys).map_err(|e| {
        RpcError::with_message(RpcErrorCode::InvalidTransaction, e.to_string())
    })
}

/// `submit`: a signed `tx_blob`, or a `tx_json` the server completes and
/// signs with `secret`.
pub async fn submit(context: &Context, body: Value) -> Result<Value, RpcError> {
    if let Some(blob) = body.get("tx_blob") {
        return submit_blob(context, blob);
    }
    let mut tx_json = match body.get("tx_json") {
        Some(Value::Object(obj)) => Value::Object(obj.clone()),
        Some(_) => return Err(RpcError::expected_field("tx_json", "object")),
        None => return Err(RpcError::missing_field("tx_json")),
    };
    if tx_json.get(Field::TransactionType.json_name()).is_none() {
        return Err(RpcError::missing_field("tx_json.TransactionType"));
    }
    sign_for(context, &body, &mut tx_json)?;
    let tx = Transaction::from_json(&tx_json)
        .map_err(|e| RpcError::with_message(RpcErrorCode::InvalidTransaction, e.to_string()))?;
    let tx = Arc::new(tx);
    let app = application(context)?;
    let (ter, _) = app.submit(&tx);
    Ok(engine_result(ter, &tx))
}
