#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! `notrackable_check` RPC Tests
//!
//! - Parameter validation and account lookup errors
//! - Problems and proposed fixes for user and gateway roles
//! - Limits on the number of trust lines reported, per caller role

use serde_json::{json, Value};
use trackable_common::flags::{asf, tf};
use trackable_testing_framework::{
    jtx::{envconfig, fclear, fset, no_admin, trust, trust_with_flags, xrp, Account, Env},
    utilities::init_test_logging,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn notrackable_check(env: &Env, params: &Value) -> Value {
    env.rpc(&["json", "notrackable_check", &params.to_string()])["result"].clone()
}

fn problems(result: &Value) -> &Vec<Value> {
    result["problems"].as_array().expect("problems array")
}

fn starts_with(value: &Value, prefix: &str) -> bool {
    value.as_str().is_some_and(|s| s.starts_with(prefix))
}

// ============================================================================
// Bad Input
// ============================================================================

#[test]
fn test_bad_input() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    env.fund(xrp(10_000), &alice);
    env.close();

    // Missing account field
    let result = notrackable_check(&env, &json!({}));
    assert_eq!(result["error"], "invalidParams");
    assert_eq!(result["error_message"], "Missing field 'account'.");

    // Missing role field
    let result = notrackable_check(&env, &json!({ "account": alice.human() }));
    assert_eq!(result["error"], "invalidParams");
    assert_eq!(result["error_message"], "Missing field 'role'.");

    // Invalid role field
    let result = notrackable_check(
        &env,
        &json!({ "account": alice.human(), "role": "not_a_role" }),
    );
    assert_eq!(result["error"], "invalidParams");
    assert_eq!(result["error_message"], "Invalid field 'role'.");

    // Invalid limit
    let result = notrackable_check(
        &env,
        &json!({ "account": alice.human(), "role": "user", "limit": -1 }),
    );
    assert_eq!(result["error"], "invalidParams");
    assert_eq!(
        result["error_message"],
        "Invalid field 'limit', not unsigned integer."
    );

    // Invalid ledger hash
    let result = notrackable_check(
        &env,
        &json!({ "account": alice.human(), "role": "user", "ledger_hash": 1 }),
    );
    assert_eq!(result["error"], "invalidParams");
    assert_eq!(result["error_message"], "ledgerHashNotString");

    // Account not found
    let result = notrackable_check(
        &env,
        &json!({
            "account": Account::new("nobody").human(),
            "role": "user",
            "ledger": "current",
        }),
    );
    assert_eq!(result["error"], "actNotFound");
    assert_eq!(result["error_message"], "Account not found.");

    // A private key does not parse as an account and is refused as a seed
    let result = notrackable_check(
        &env,
        &json!({
            "account": alice.keys().secret_key().to_node_private(),
            "role": "user",
            "ledger": "current",
        }),
    );
    assert_eq!(result["error"], "badSeed");
    assert_eq!(result["error_message"], "Disallowed seed.");
}

// ============================================================================
// Basic Problems and Transactions
// ============================================================================

fn check_basic(user: bool, expect_problems: bool) {
    init_test_logging();
    let mut env = Env::new();
    let gw = Account::new("gw");
    let alice = Account::new("alice");
    let usd = gw.iou("USD");

    env.fund(xrp(10_000), [&gw, &alice]);
    if user == expect_problems {
        env.apply(fset(&alice, asf::DEFAULT_TRACKABLE), &[]);
        env.apply(trust(&alice, usd.amount(100)), &[]);
    } else {
        env.apply(fclear(&alice, asf::DEFAULT_TRACKABLE), &[]);
        env.apply(trust_with_flags(&alice, usd.amount(100), tf::SET_NO_TRACKABLE), &[]);
    }
    env.close();

    let mut params = json!({
        "account": alice.human(),
        "role": if user { "user" } else { "gateway" },
        "ledger": "current",
    });
    let result = notrackable_check(&env, &params);
    let pa = problems(&result);

    if expect_problems {
        assert_eq!(pa.len(), 2, "problems: {:?}", pa);
        if user {
            assert!(starts_with(&pa[0], "You appear to have set"));
            assert!(starts_with(&pa[1], "You should probably set"));
        } else {
            assert!(starts_with(&pa[0], "You should immediately set"));
            assert!(starts_with(&pa[1], "You should clear"));
        }
    } else {
        assert!(pa.is_empty(), "problems: {:?}", pa);
    }

    // Ask for the transactions fixing the problems this time
    params["transactions"] = json!(true);
    let result = notrackable_check(&env, &params);
    let txs = result["transactions"].as_array().expect("transactions array");

    if expect_problems {
        assert_eq!(txs.len(), if user { 1 } else { 2 });
        if !user {
            assert_eq!(txs[0]["Account"], alice.human());
            assert_eq!(txs[0]["TransactionType"], "AccountSet");
        }
        let last = &txs[txs.len() - 1];
        assert_eq!(last["Account"], alice.human());
        assert_eq!(last["TransactionType"], "TrustSet");
        assert_eq!(last["LimitAmount"], usd.amount(100).to_json());
    } else {
        assert!(txs.is_empty());
    }
}

#[test]
fn test_basic_user_with_problems() {
    check_basic(true, true);
}

#[test]
fn test_basic_user_without_problems() {
    check_basic(true, false);
}

#[test]
fn test_basic_gateway_with_problems() {
    check_basic(false, true);
}

#[test]
fn test_basic_gateway_without_problems() {
    check_basic(false, false);
}

// ============================================================================
// Limits (long running)
// ============================================================================

// Lines created beyond the largest limit a user may ask for
const MAX_LIMIT: usize = 400;

fn check_limits(admin: bool) {
    init_test_logging();
    let config = if admin { envconfig() } else { no_admin(envconfig()) };
    let mut env = Env::with_config(config);

    let alice = Account::new("alice");
    env.fund(xrp(100_000), &alice);
    env.apply(fset(&alice, asf::DEFAULT_TRACKABLE), &[]);
    env.close();

    for i in 0..MAX_LIMIT + 5 {
        let gw = Account::new(format!("gw{}", i));
        env.fund(xrp(1_000), &gw);
        env.apply(trust(&alice, gw.iou("USD").amount(10)), &[]);
        env.close();
    }

    let mut params = json!({
        "account": alice.human(),
        "role": "user",
        "ledger": "current",
    });
    let mut count = |env: &Env, limit: Option<i64>| {
        if let Some(limit) = limit {
            params["limit"] = json!(limit);
        }
        problems(&notrackable_check(env, &params)).len()
    };

    // One problem for the account flag, plus one per line up to the limit
    assert_eq!(count(&env, None), 301);
    assert_eq!(count(&env, Some(9)), if admin { 10 } else { 11 });
    assert_eq!(count(&env, Some(10)), 11);
    assert_eq!(count(&env, Some(400)), 401);
    assert_eq!(count(&env, Some(401)), if admin { 402 } else { 401 });
}

#[test]
#[ignore = "long running: creates hundreds of trust lines"]
fn test_limits_admin() {
    check_limits(true);
}

#[test]
#[ignore = "long running: creates hundreds of trust lines"]
fn test_limits_non_admin() {
    check_limits(false);
}
