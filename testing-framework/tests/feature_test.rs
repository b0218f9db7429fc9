#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! `feature` RPC Tests
//!
//! Amendment listing, lookup by name, admin gating, majorities reported by
//! a validating server and vetoes.

use serde_json::{Map, Value};
use trackable_common::features::{feature_id, FeatureId, FeatureSet, FEATURE_ESCROW};
use trackable_daemon::amendments::{get_majority_amendments, YES_VOTE};
use trackable_testing_framework::{
    jtx::{envconfig, no_admin, validator, Env},
    utilities::init_test_logging,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn features(jrr: &Value) -> &Map<String, Value> {
    jrr["features"].as_object().expect("features object")
}

// The single amendment object of a `feature <name>` result
fn single_feature(mut jrr: Value) -> Value {
    assert_eq!(jrr["status"], "success");
    let obj = jrr.as_object_mut().expect("result object");
    obj.remove("status");
    assert_eq!(obj.len(), 1, "result: {:?}", obj);
    obj.values().next().cloned().unwrap_or_default()
}

fn flag(feature: &Value, field: &str) -> bool {
    feature[field].as_bool().unwrap_or(false)
}

// ============================================================================
// Listing and Lookup
// ============================================================================

#[test]
fn test_internal_lookup() {
    let env = Env::new();
    let table = env.app().amendments();
    assert_eq!(table.find("CryptoConditions"), Some(feature_id("CryptoConditions")));
    assert_eq!(table.find("cryptoconditions"), None);
    assert!(table.is_supported(&feature_id("MultiSign")));
    assert!(!table.is_supported(&feature_id("AllTheThings")));
}

#[test]
fn test_no_params_none_enabled() {
    init_test_logging();
    let env = Env::new();

    let jrr = env.rpc(&["feature"])["result"].clone();
    let list = features(&jrr);
    assert!(!list.is_empty());
    for feature in list.values() {
        let name = feature["name"].as_str().expect("feature name");
        assert!(!flag(feature, "enabled"), "{} enabled", name);
        assert!(!flag(feature, "vetoed"), "{} vetoed", name);
        assert!(flag(feature, "supported"), "{} supported", name);
    }
}

#[test]
fn test_single_feature() {
    init_test_logging();
    let env = Env::new();

    let feature = single_feature(env.rpc(&["feature", "CryptoConditions"])["result"].clone());
    assert_eq!(feature["name"], "CryptoConditions");
    assert!(!flag(&feature, "enabled"));
    assert!(!flag(&feature, "vetoed"));
    assert!(flag(&feature, "supported"));

    // Names are case sensitive
    let jrr = env.rpc(&["feature", "cryptoconditions"])["result"].clone();
    assert_eq!(jrr["error"], "badFeature");
    assert_eq!(jrr["error_message"], "Feature unknown or invalid.");
}

#[test]
fn test_invalid_feature() {
    init_test_logging();
    let env = Env::new();

    let jrr = env.rpc(&["feature", "AllTheThings"])["result"].clone();
    assert_eq!(jrr["error"], "badFeature");
    assert_eq!(jrr["error_message"], "Feature unknown or invalid.");
}

#[test]
fn test_non_admin() {
    init_test_logging();
    let env = Env::with_config(no_admin(envconfig()));

    // Refused like an HTTP 403, which the client reports as a null result
    let jrr = env.rpc(&["feature"]);
    assert!(jrr["result"].is_null());
}

// ============================================================================
// Enabled Amendments and Majorities
// ============================================================================

#[test]
fn test_some_enabled() {
    init_test_logging();
    let crypto_conditions = feature_id("CryptoConditions");
    let features_enabled: FeatureSet = [*FEATURE_ESCROW, crypto_conditions].into_iter().collect();
    let env = Env::with_features(features_enabled);

    // The table is what the RPC reports on
    let table = env.app().amendments();
    table.enable(&FEATURE_ESCROW);
    table.enable(&crypto_conditions);

    let jrr = env.rpc(&["feature"])["result"].clone();
    for (key, feature) in features(&jrr) {
        let id: FeatureId = key.parse().expect("hex amendment id");
        let name = feature["name"].as_str().expect("feature name");
        assert_eq!(flag(feature, "enabled"), table.is_enabled(&id), "{} enabled", name);
        assert!(!flag(feature, "vetoed"), "{} vetoed", name);
        assert_eq!(flag(feature, "supported"), table.is_supported(&id), "{} supported", name);
    }
    assert!(table.is_enabled(&FEATURE_ESCROW));
}

// Flag ledgers come every 256 ledgers
const FLAG_LEDGER_INTERVAL: usize = 256;

#[test]
fn test_with_majorities() {
    init_test_logging();
    let mut env = Env::with_config(validator(envconfig(), ""));

    // No vote yet, so no voting fields
    let jrr = env.rpc(&["feature"])["result"].clone();
    for feature in features(&jrr).values() {
        let name = feature["name"].as_str().expect("feature name");
        for field in ["majority", "count", "threshold", "validations", "vote"] {
            assert!(feature.get(field).is_none(), "{} {}", name, field);
        }
    }
    assert!(get_majority_amendments(env.closed().as_ref()).is_empty());

    // Close ledgers until the amendments get a majority
    let mut closes = 0;
    let majorities = loop {
        env.close();
        closes += 1;
        let majorities = get_majority_amendments(env.closed().as_ref());
        if !majorities.is_empty() || closes > FLAG_LEDGER_INTERVAL {
            break majorities;
        }
    };
    // Not an exact count, so new amendments need no test changes
    assert!(majorities.len() >= 5, "majorities: {}", majorities.len());

    let jrr = env.rpc(&["feature"])["result"].clone();
    for (key, feature) in features(&jrr) {
        let name = feature["name"].as_str().expect("feature name");
        for field in ["majority", "count", "threshold", "validations", "vote"] {
            assert!(feature.get(field).is_some(), "{} {}", name, field);
        }
        assert_eq!(feature["vote"], YES_VOTE);

        let id: FeatureId = key.parse().expect("hex amendment id");
        let since = majorities.get(&id).expect("majority time");
        assert_eq!(feature["majority"], since.as_secs());
    }
}

// ============================================================================
// Veto
// ============================================================================

#[test]
fn test_veto() {
    init_test_logging();
    let crypto_conditions = feature_id("CryptoConditions");
    let env = Env::with_features([crypto_conditions].into_iter().collect());
    env.app().amendments().enable(&crypto_conditions);

    let feature = single_feature(env.rpc(&["feature", "CryptoConditions"])["result"].clone());
    assert_eq!(feature["name"], "CryptoConditions");
    assert!(!flag(&feature, "vetoed"));

    let feature =
        single_feature(env.rpc(&["feature", "CryptoConditions", "reject"])["result"].clone());
    assert_eq!(feature["name"], "CryptoConditions");
    assert!(flag(&feature, "vetoed"));

    let feature =
        single_feature(env.rpc(&["feature", "CryptoConditions", "accept"])["result"].clone());
    assert_eq!(feature["name"], "CryptoConditions");
    assert!(!flag(&feature, "vetoed"));

    // Anything other than accept or reject fails in the command line mapping
    let jrr = env.rpc(&["feature", "CryptoConditions", "maybe"]);
    let client_error = jrr.get("client_error").expect("client_error");
    assert_eq!(client_error["error"], "invalidParams");
    assert_eq!(client_error["error_message"], "Invalid parameters.");
}
