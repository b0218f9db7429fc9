use serde_json::{json, Map, Value};
use trackable_common::{
    crypto::AccountId,
    rpc::{RpcError, RpcErrorCode},
};

use super::{
    application,
    context::Context,
    subscriptions::{ledger_stream_json, Stream},
    Connection,
};

fn connection(context: &Context) -> Result<Connection, RpcError> {
    context
        .get_copy::<Connection>()
        .map_err(|_| RpcErrorCode::NoEvents.into())
}

fn parse_streams(body: &Value) -> Result<Vec<Stream>, RpcError> {
    let Some(streams) = body.get("streams") else {
        return Ok(Vec::new());
    };
    let streams = streams
        .as_array()
        .ok_or_else(|| RpcError::from(RpcErrorCode::InvalidParams))?;
    streams
        .iter()
        .map(|s| {
            s.as_str()
                .and_then(Stream::from_name)
                .ok_or_else(|| RpcErrorCode::StreamMalformed.into())
        })
        .collect()
}

fn parse_accounts(body: &Value) -> Result<Vec<AccountId>, RpcError> {
    let Some(accounts) = body.get("accounts") else {
        return Ok(Vec::new());
    };
    let accounts = accounts
        .as_array()
        .ok_or_else(|| RpcError::from(RpcErrorCode::InvalidParams))?;
    accounts
        .iter()
        .map(|a| {
            a.as_str()
                .and_then(|s| AccountId::from_base58(s).ok())
                .ok_or_else(|| RpcErrorCode::ActMalformed.into())
        })
        .collect()
}

/// `subscribe`: register the calling websocket for streams and accounts.
pub async fn subscribe(context: &Context, body: Value) -> Result<Value, RpcError> {
    let app = application(context)?;
    let Connection(id) = connection(context)?;
    let streams = parse_streams(&body)?;
    let accounts = parse_accounts(&body)?;
    if !app.subscriptions().subscribe(id, &streams, &accounts) {
        return Err(RpcErrorCode::NoEvents.into());
    }

    let mut result = Map::new();
    if streams.contains(&Stream::Ledger) {
        if let Value::Object(ledger) = ledger_stream_json(&app.closed()) {
            result.extend(ledger);
        }
        result.insert("validated_ledgers".into(), json!(app.complete_ledgers()));
    }
    Ok(Value::Object(result))
}

pub async fn unsubscribe(context: &Context, body: Value) -> Result<Value, RpcError> {
    let app = application(context)?;
    let Connection(id) = connection(context)?;
    let streams = parse_streams(&body)?;
    let accounts = parse_accounts(&body)?;
    if !app.subscriptions().unsubscribe(id, &streams, &accounts) {
        return Err(RpcErrorCode::NoEvents.into());
    }
    Ok(json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_streams() {
        assert_eq!(
            parse_streams(&json!({"streams": ["ledger", "transactions"]})).unwrap(),
            vec![Stream::Ledger, Stream::Transactions]
        );
        assert_eq!(
            parse_streams(&json!({"streams": ["gossip"]})).unwrap_err().code,
            RpcErrorCode::StreamMalformed
        );
        assert!(parse_streams(&json!({})).unwrap().is_empty());
        assert_eq!(
            parse_accounts(&json!({"accounts": ["nope"]})).unwrap_err().code,
            RpcErrorCode::ActMalformed
        );
    }

    #[tokio::test]
    async fn test_http_has_no_events() {
        let context = Context::new();
        assert_eq!(connection(&context).unwrap_err().code, RpcErrorCode::NoEvents);
    }
}
