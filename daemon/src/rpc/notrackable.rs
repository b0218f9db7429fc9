use serde_json::{json, Map, Value};
use trackable_common::{
    amount::{Amount, Issue},
    flags::{asf, lsf, tf},
    rpc::{RpcError, RpcErrorCode},
};

use super::{account::parse_account, application, context::Context, lookup::lookup_ledger, Role};
use crate::ledger::helpers::{owner_entries, peek_account, side_flag};

pub const DEFAULT_LIMIT: u64 = 300;
pub const MIN_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 400;

fn effective_limit(params: &Value, role: Role) -> Result<u64, RpcError> {
    let Some(limit) = params.get("limit") else {
        return Ok(DEFAULT_LIMIT);
    };
    let limit = limit
        .as_u64()
        .ok_or_else(|| RpcError::expected_field("limit", "unsigned integer"))?;
    Ok(match role {
        Role::Admin => limit,
        Role::User => limit.clamp(MIN_LIMIT, MAX_LIMIT),
    })
}

/// `notrackable_check`: compare an account's default trackable flag and the
/// no trackable flags of its trust lines with what its role should use, and
/// optionally propose the transactions fixing them.
pub async fn notrackable_check(context: &Context, body: Value) -> Result<Value, RpcError> {
    let app = application(context)?;
    let account = body
        .get("account")
        .ok_or_else(|| RpcError::missing_field("account"))?;
    let role = body
        .get("role")
        .ok_or_else(|| RpcError::missing_field("role"))?;
    let gateway = match role.as_str() {
        Some("gateway") => true,
        Some("user") => false,
        _ => return Err(RpcError::invalid_field("role")),
    };
    let limit = effective_limit(&body, context.get_copy::<Role>().unwrap_or(Role::User))?;
    let want_transactions = body
        .get("transactions")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let ledger = lookup_ledger(app, &body)?;
    let account = parse_account(account, "account")?;
    let view = ledger.view();
    let root = peek_account(view, &account).ok_or_else(|| RpcError::from(RpcErrorCode::ActNotFound))?;

    let fee = view.fees().base.drops().to_string();
    let mut sequence = root.sequence;
    let mut problems = Vec::new();
    let mut transactions = Vec::new();

    let default_trackable = root.is_flag(lsf::DEFAULT_TRACKABLE);
    if default_trackable && !gateway {
        problems.push(json!("You appear to have set your default trackable flag even though you are not a gateway. This is not recommended unless you are experimenting"));
    } else if gateway && !default_trackable {
        problems.push(json!("You should immediately set your default trackable flag"));
        transactions.push(json!({
            "TransactionType": "AccountSet",
            "Account": account.to_base58(),
            "Fee": fee,
            "Sequence": sequence,
            "SetFlag": asf::DEFAULT_TRACKABLE,
        }));
        sequence += 1;
    }

    let entries = owner_entries(view, &account);
    for line in entries.iter().take(limit as usize).filter_map(|e| e.as_ripple_state()) {
        let is_low = line.is_low(&account);
        let no_trackable = line.is_flag(side_flag(is_low, lsf::LOW_NO_TRACKABLE, lsf::HIGH_NO_TRACKABLE));
        let problem = if no_trackable && gateway {
            "You should clear the no trackable flag"
        } else if !no_trackable && !gateway {
            "You should probably set the no trackable flag"
        } else {
            continue;
        };
        let peer = line.other(&account);
        problems.push(json!(format!("{} on your {} line to {}", problem, line.currency, peer.to_base58())));

        let limit_amount = Amount::iou(line.limit_for(&account), Issue::new(line.currency, peer));
        transactions.push(json!({
            "TransactionType": "TrustSet",
            "Account": account.to_base58(),
            "LimitAmount": limit_amount.to_json(),
            "Flags": if no_trackable { tf::CLEAR_NO_TRACKABLE } else { tf::SET_NO_TRACKABLE },
            "Fee": fee,
            "Sequence": sequence,
        }));
        sequence += 1;
    }

    let mut result = Map::new();
    result.insert("problems".into(), Value::Array(problems));
    if want_transactions {
        result.insert("transactions".into(), Value::Array(transactions));
    }
    ledger.inject(&mut result);
    Ok(Value::Object(result))
}
