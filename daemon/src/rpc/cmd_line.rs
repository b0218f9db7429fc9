//! Mapping of command line words onto JSON-RPC requests.

use serde_json::{json, Map, Value};
use trackable_common::rpc::{RpcError, RpcErrorCode};

fn error_params(error: RpcError) -> Value {
    error.to_json().as_object().map_or_else(
        || json!({}),
        |obj| {
            let mut obj = obj.clone();
            obj.remove("status");
            Value::Object(obj)
        },
    )
}

fn invalid_params() -> Value {
    error_params(RpcError::with_message(RpcErrorCode::InvalidParams, "Invalid parameters."))
}

fn parse_json_object(text: &str) -> Result<Map<String, Value>, RpcError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(obj)) => Ok(obj),
        _ => Err(RpcErrorCode::InvalidParams.into()),
    }
}

// Ledger selector: an index, a shortcut or a hash
fn ledger_selector(text: &str) -> (&'static str, Value) {
    if let Ok(seq) = text.parse::<u32>() {
        return ("ledger_index", json!(seq));
    }
    if text.len() == 64 {
        return ("ledger_hash", json!(text));
    }
    ("ledger_index", json!(text))
}

fn params_for(method: &str, args: &[&str]) -> Result<Value, RpcError> {
    let arity = |min: usize, max: usize| {
        if args.len() < min || args.len() > max {
            Err(RpcError::from(RpcErrorCode::BadSyntax))
        } else {
            Ok(())
        }
    };
    match method {
        "ledger_accept" | "ledger_closed" | "ledger_current" | "server_info" => {
            arity(0, 0)?;
            Ok(json!({}))
        }
        "feature" => {
            arity(0, 2)?;
            let mut params = Map::new();
            if let Some(name) = args.first() {
                params.insert("feature".into(), json!(name));
            }
            match args.get(1).copied() {
                None => {}
                Some("accept") => {
                    params.insert("vetoed".into(), json!(false));
                }
                Some("reject") => {
                    params.insert("vetoed".into(), json!(true));
                }
                Some(_) => return Err(RpcError::with_message(RpcErrorCode::InvalidParams, "Invalid parameters.")),
            }
            Ok(Value::Object(params))
        }
        "submit" => match args {
            [blob] => Ok(json!({ "tx_blob": blob })),
            [secret, tx_json] => {
                let tx_json = parse_json_object(tx_json)?;
                Ok(json!({ "secret": secret, "tx_json": tx_json }))
            }
            _ => Err(RpcErrorCode::BadSyntax.into()),
        },
        "tx" => {
            arity(1, 1)?;
            Ok(json!({ "transaction": args[0] }))
        }
        "account_info" => {
            arity(1, 2)?;
            let mut params = Map::new();
            params.insert("account".into(), json!(args[0]));
            if let Some(ledger) = args.get(1) {
                let (field, value) = ledger_selector(ledger);
                params.insert(field.into(), value);
            }
            Ok(Value::Object(params))
        }
        "transaction_entry" => {
            arity(2, 2)?;
            let (field, value) = ledger_selector(args[1]);
            let mut params = Map::new();
            params.insert("tx_hash".into(), json!(args[0]));
            params.insert(field.into(), value);
            Ok(Value::Object(params))
        }
        _ => Err(RpcErrorCode::UnknownCommand.into()),
    }
}

/// Turn `args` (method first) into `{"method": .., "params": [..]}`. Errors
/// are reported inside `params[0]` so the request can still be sent.
pub fn cmd_line_to_json_rpc(args: &[&str]) -> Value {
    let Some((method, rest)) = args.split_first() else {
        return json!({ "method": "", "params": [invalid_params()] });
    };

    // `json <method> <params>` passes the object through untouched
    if *method == "json" {
        return match rest {
            [method, params] => match parse_json_object(params) {
                Ok(params) => json!({ "method": method, "params": [params] }),
                Err(e) => json!({ "method": method, "params": [error_params(e)] }),
            },
            _ => json!({ "method": "json", "params": [invalid_params()] }),
        };
    }

    let params = match params_for(method, rest) {
        Ok(params) => params,
        Err(e) if e.code == RpcErrorCode::BadSyntax => invalid_params(),
        Err(e) => error_params(e),
    };
    json!({ "method": method, "params": [params] })
}
