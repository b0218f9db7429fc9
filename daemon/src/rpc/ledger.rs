use log::error;
use serde_json::{json, Value};
use trackable_common::{
    config::VERSION,
    rpc::{RpcError, RpcErrorCode},
};

use super::{application, context::Context};
use crate::ledger::ReadView;

/// `ledger_accept`: close the open ledger now. Standalone only.
pub async fn ledger_accept(context: &Context, _: Value) -> Result<Value, RpcError> {
    let app = application(context)?;
    if !app.is_standalone() {
        return Err(RpcErrorCode::NotStandalone.into());
    }
    app.accept_ledger(None).map_err(|e| {
        error!("Unable to accept ledger: {}", e);
        RpcError::with_message(RpcErrorCode::Internal, e.to_string())
    })?;
    Ok(json!({ "ledger_current_index": app.current().seq() }))
}

pub async fn ledger_current(context: &Context, _: Value) -> Result<Value, RpcError> {
    let app = application(context)?;
    Ok(json!({ "ledger_current_index": app.current().seq() }))
}

pub async fn ledger_closed(context: &Context, _: Value) -> Result<Value, RpcError> {
    let closed = application(context)?.closed();
    Ok(json!({
        "ledger_hash": closed.info().hash.to_hex(),
        "ledger_index": closed.seq(),
    }))
}

pub async fn server_info(context: &Context, _: Value) -> Result<Value, RpcError> {
    let app = application(context)?;
    let closed = app.closed();
    let fees = closed.fees();
    let metrics = app.with_current(|view| app.txq().metrics(view));
    let state = if app.is_standalone() { "full" } else { "connected" };
    Ok(json!({
        "info": {
            "build_version": VERSION,
            "complete_ledgers": app.complete_ledgers(),
            "server_state": state,
            "standalone": app.is_standalone(),
            "validator": app.is_validator(),
            "node_store": app.node_store_name(),
            "trusted_validators": app.validators().trusted_count(),
            "validated_ledger": {
                "seq": closed.seq(),
                "hash": closed.info().hash.to_hex(),
                "close_time": closed.info().close_time.as_secs(),
                "base_fee": fees.base.drops(),
                "reserve_base": fees.reserve.drops(),
                "reserve_inc": fees.increment.drops(),
            },
            "open_ledger": metrics.to_json(),
        }
    }))
}
