use serde_json::{Map, Value};
use trackable_common::{
    crypto::{decode_any_token, AccountId},
    rpc::{RpcError, RpcErrorCode},
};

use super::{application, context::Context, lookup::lookup_ledger};
use crate::ledger::{keylet, ReadView};

/// Parse an account field. Other base58 tokens, such as secrets, are
/// refused as seeds.
pub fn parse_account(value: &Value, field: &str) -> Result<AccountId, RpcError> {
    let text = value
        .as_str()
        .ok_or_else(|| RpcError::expected_field(field, "string"))?;
    if let Ok(account) = AccountId::from_base58(text) {
        return Ok(account);
    }
    if decode_any_token(text).is_ok() {
        return Err(RpcErrorCode::BadSeed.into());
    }
    Err(RpcErrorCode::ActMalformed.into())
}

/// `account_info`: the account root of `account` in the requested ledger.
pub async fn account_info(context: &Context, body: Value) -> Result<Value, RpcError> {
    let app = application(context)?;
    let account = body
        .get("account")
        .or_else(|| body.get("ident"))
        .ok_or_else(|| RpcError::missing_field("account"))?;
    let account = parse_account(account, "account")?;
    let ledger = lookup_ledger(app, &body)?;
    let root = ledger
        .view()
        .read_keylet(&keylet::account(&account))
        .ok_or_else(|| RpcError::from(RpcErrorCode::ActNotFound))?;

    let mut result = Map::new();
    result.insert("account_data".into(), root.to_json());
    ledger.inject(&mut result);
    Ok(Value::Object(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trackable_common::crypto::KeyPair;

    #[test]
    fn test_parse_account() {
        let keys = KeyPair::from_passphrase("alice");
        let id = keys.public_key().account_id();
        assert_eq!(parse_account(&json!(id.to_base58()), "account").unwrap(), id);
        assert_eq!(
            parse_account(&json!(keys.secret_key().to_node_private()), "account")
                .unwrap_err()
                .code,
            RpcErrorCode::BadSeed
        );
        assert_eq!(
            parse_account(&json!("not an account"), "account").unwrap_err().code,
            RpcErrorCode::ActMalformed
        );
        assert!(parse_account(&json!(7), "account").is_err());
    }
}
