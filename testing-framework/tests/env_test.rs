#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Env Tests
//!
//! The harness itself: account bookkeeping, funding and trust helpers,
//! autofill and signing, result parsing and postconditions, ledger closes
//! and the websocket client's streams.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use trackable_common::{
    amount::Amount,
    flags::{asf, lsf, tf},
    ter::Ter,
};
use trackable_daemon::ledger::{keylet, ReadView};
use trackable_testing_framework::{
    client::AbstractClient,
    jtx::{
        balance, dtag, envconfig, fee, fee_autofill, fee_none, flags, fset, fset_clear, inspect, json as merge,
        lines, nflags, no_admin, noop, offer_with_flags, offers, owners, pay, regkey, regkey_disabled,
        require, seq, seq_none, sig, sig_none, signers, signers_none, ter, ter_any, without, xrp,
        Account, Env, EnvError,
    },
    prelude::notrackable,
    utilities::init_test_logging,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn result_with_code(code: i32) -> Value {
    json!({ "result": { "engine_result_code": code } })
}

// ============================================================================
// Accounts
// ============================================================================

#[test]
fn test_memoize_and_lookup() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");

    assert!(matches!(env.lookup(&alice.id()), Err(EnvError::UnknownAccount(_))));
    env.memoize(&alice);
    assert_eq!(env.lookup(&alice.id()).unwrap(), &alice);
    assert_eq!(env.lookup_base58(&alice.human()).unwrap(), &alice);

    assert!(matches!(
        env.lookup_base58("not an account"),
        Err(EnvError::InvalidAccountId(_))
    ));

    // The master is known from the start
    let master = env.master().clone();
    assert_eq!(env.lookup(&master.id()).unwrap(), &master);
}

// ============================================================================
// Funding and Trust
// ============================================================================

#[test]
fn test_fund_sets_default_trackable() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    let bob = Account::new("bob");

    env.fund(xrp(10_000), &alice);
    env.fund(xrp(5_000), notrackable(&[&bob]));

    env.require([
        flags(&alice, &[asf::DEFAULT_TRACKABLE]),
        balance(&alice, xrp(10_000)),
        nflags(&bob, &[asf::DEFAULT_TRACKABLE]),
        balance(&bob, xrp(5_000)),
    ]);
    assert_eq!(env.seq(&alice).unwrap(), 2);
    assert_eq!(env.seq(&bob).unwrap(), 1);
    assert!(matches!(
        env.seq(&Account::new("carol")),
        Err(EnvError::MissingAccountRoot(_))
    ));
}

#[test]
fn test_trust_keeps_native_balance() {
    init_test_logging();
    let mut env = Env::new();
    let gw = Account::new("gw");
    let alice = Account::new("alice");
    let usd = gw.iou("USD");
    env.fund(xrp(10_000), [&gw, &alice]);

    env.trust(usd.amount(100), &[&alice]);
    env.require([balance(&alice, xrp(10_000)), lines(&alice, 1)]);
    assert_eq!(env.balance_of(&alice, &usd.issue()), usd.amount(0));
}

// ============================================================================
// Autofill and Signing
// ============================================================================

#[test]
fn test_autofill() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    env.fund(xrp(10_000), &alice);

    let jt = env.jt(noop(&alice), &[]);
    assert_eq!(jt.jv["Fee"], json!(env.base_fee().to_string()));
    assert_eq!(jt.jv["Sequence"], env.seq(&alice).unwrap());
    assert_eq!(jt.jv["SigningPubKey"], alice.public_key().to_hex());
    assert!(jt.jv["TxnSignature"].is_string());
    assert!(jt.stx.is_some());

    // Explicit values are kept
    let jt = env.jt(noop(&alice), &[fee(25), seq(40)]);
    assert_eq!(jt.jv["Fee"], "25");
    assert_eq!(jt.jv["Sequence"], 40);
}

#[test]
fn test_fee_and_seq_none() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    env.fund(xrp(10_000), &alice);

    let jv = env.json(noop(&alice), &[fee_none(), seq_none()]);
    assert!(jv.get("Fee").is_none());
    assert!(jv.get("Sequence").is_none());

    // Without them the JSON is no transaction, which submits as malformed
    env.apply(noop(&alice), &[fee_none(), ter(Ter::temMALFORMED)]);
    env.apply(noop(&alice), &[seq_none(), ter(Ter::temMALFORMED)]);
    env.apply(noop(&alice), &[without("Account"), ter(Ter::temMALFORMED)]);
    assert!(!env.applied());
}

#[test]
fn test_sig_none() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    env.fund(xrp(10_000), &alice);

    let jt = env.jt(noop(&alice), &[sig_none(), ter(Ter::temMALFORMED)]);
    assert!(jt.jv.get("SigningPubKey").is_none());
    assert!(jt.jv.get("TxnSignature").is_none());
    assert!(jt.stx.is_none());
    env.submit(&jt);
    assert_eq!(env.ter(), Ter::temMALFORMED);
    assert!(!env.applied());
}

#[test]
fn test_signs_with_regular_key() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    let eric = Account::new("eric");
    env.fund(xrp(10_000), &alice);
    env.memoize(&eric);
    env.apply(regkey(&alice, &eric), &[]);

    let jt = env.jt(noop(&alice), &[]);
    assert_eq!(jt.jv["SigningPubKey"], eric.public_key().to_hex());
    env.submit(&jt);
    assert_eq!(env.ter(), Ter::tesSUCCESS);

    // An explicit signer wins over the regular key
    let jt = env.jt(noop(&alice), &[sig(&alice)]);
    assert_eq!(jt.jv["SigningPubKey"], alice.public_key().to_hex());
    env.submit(&jt);
    assert_eq!(env.ter(), Ter::tesSUCCESS);
}

#[test]
fn test_disable_sigs() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    env.fund(xrp(10_000), &alice);

    env.disable_sigs();
    let jt = env.jt(noop(&alice), &[]);
    assert_eq!(jt.jv["SigningPubKey"], alice.public_key().to_hex());
    env.submit(&jt);
    assert_eq!(env.ter(), Ter::tesSUCCESS);
}

// ============================================================================
// Results and Postconditions
// ============================================================================

#[test]
fn test_parse_result() {
    assert_eq!(
        Env::parse_result(&result_with_code(Ter::tesSUCCESS.code())),
        (Ter::tesSUCCESS, true)
    );
    assert_eq!(
        Env::parse_result(&result_with_code(Ter::tecNO_DST.code())),
        (Ter::tecNO_DST, true)
    );
    assert_eq!(
        Env::parse_result(&result_with_code(Ter::temBAD_AMOUNT.code())),
        (Ter::temBAD_AMOUNT, false)
    );
    assert_eq!(Env::parse_result(&json!({})), (Ter::temINVALID, false));
    assert_eq!(Env::parse_result(&json!({ "result": {} })), (Ter::temINVALID, false));
    assert_eq!(Env::parse_result(&Value::Null), (Ter::temINVALID, false));

    // Codes missing from the table read as temINVALID, but a claimed fee
    // still counts as applied
    assert!(Ter::from_code(106).is_none());
    assert_eq!(Env::parse_result(&result_with_code(106)), (Ter::temINVALID, true));
    assert_eq!(Env::parse_result(&result_with_code(-1000)), (Ter::temINVALID, false));
}

proptest! {
    #[test]
    fn prop_parse_result_is_pure(code in -400i32..200) {
        let jr = result_with_code(code);
        let first = Env::parse_result(&jr);
        prop_assert_eq!(first, Env::parse_result(&jr));
        let (ter, applied) = first;
        prop_assert_eq!(applied, code == 0 || code >= 100);
        if Ter::from_code(code).is_some() {
            prop_assert_eq!(applied, ter.is_tes_success() || ter.is_tec_claim());
        }
    }
}

#[test]
fn test_code_mismatch_skips_requirements() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    let bob = Account::new("bob");
    env.fund(xrp(10_000), [&alice, &bob]);
    let passes = env.suite().passes();

    // Succeeds where tecNO_DST was expected. The wrong balance is not checked.
    env.apply(
        pay(&alice, &bob, xrp(10)),
        &[ter(Ter::tecNO_DST), require(balance(&bob, xrp(1)))],
    );
    assert_eq!(env.ter(), Ter::tesSUCCESS);
    let failures = env.suite().take_failures();
    assert_eq!(failures.len(), 1, "failures: {:?}", failures);
    assert!(failures[0].contains("tesSUCCESS"));
    assert!(failures[0].contains("tecNO_DST"));
    assert_eq!(env.suite().passes(), passes);
}

#[test]
fn test_requirement_failures_are_independent() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    env.fund(xrp(10_000), &alice);

    env.require([
        balance(&alice, xrp(1)),
        balance(&alice, xrp(10_000)),
        balance(&alice, xrp(2)),
    ]);
    assert_eq!(env.suite().take_failures().len(), 2);
}

#[test]
fn test_merged_fields_reach_the_transaction() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    env.fund(xrp(10_000), &alice);

    env.apply(noop(&alice), &[merge(json!({ "SourceTag": 7 }))]);
    let tx = env.tx().expect("last transaction");
    assert_eq!(tx.to_json()["SourceTag"], 7);
}

// ============================================================================
// Ledgers
// ============================================================================

#[test]
fn test_meta_closes_and_reads_metadata() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    env.fund(xrp(10_000), &alice);
    let open_seq = env.closed().seq() + 1;

    env.apply(pay(env.master(), &alice, xrp(100)), &[]);
    let meta = env.meta().expect("metadata of the last payment");
    assert_eq!(meta.result, Ter::tesSUCCESS);
    assert_eq!(meta.delivered, Some(xrp(100)));
    assert_eq!(env.closed().seq(), open_seq);
}

#[test]
fn test_close_advances_time() {
    init_test_logging();
    let mut env = Env::new();
    let start = env.now();
    let start_seq = env.closed().seq();

    assert!(env.close());
    assert!(env.now() > start);
    assert_eq!(env.now(), env.closed().info().close_time);
    assert_eq!(env.closed().seq(), start_seq + 1);

    // With a consensus delay the ledger is accepted directly
    let close_time = env.now() + Duration::from_secs(30);
    assert!(env.close_at(close_time, Some(Duration::from_millis(1))));
    assert_eq!(env.now(), env.closed().info().close_time);
    assert_eq!(env.closed().seq(), start_seq + 2);
}

#[test]
fn test_close_without_admin_is_refused() {
    init_test_logging();
    let mut env = Env::with_config(no_admin(envconfig()));
    let start_seq = env.closed().seq();

    // ledger_accept is an admin command
    assert!(!env.close());
    assert_eq!(env.closed().seq(), start_seq);
    assert_eq!(env.now(), env.closed().info().close_time);
}

#[test]
fn test_rpc_reports_client_errors() {
    init_test_logging();
    let env = Env::new();

    let jr = env.rpc(&["server_info"]);
    assert_eq!(jr["result"]["status"], "success");
    assert_eq!(jr["id"], 5);

    let jr = env.rpc(&["feature", "MultiSign", "perhaps"]);
    assert!(jr.get("client_error").is_some());
}

// ============================================================================
// Websocket Streams
// ============================================================================

#[test]
fn test_ws_client_receives_streams() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    env.fund(xrp(10_000), &alice);
    env.close();

    let ws = env.ws_client(2).expect("websocket connection");
    let jr = ws.invoke("subscribe", &json!({ "streams": ["ledger", "transactions"] }));
    assert_eq!(jr["status"], "success");
    assert!(jr["result"]["ledger_index"].is_u64());

    env.apply(pay(env.master(), &alice, xrp(100)), &[]);
    env.close();
    let closed_seq = env.closed().seq();

    let timeout = Duration::from_secs(5);
    let ledger = ws
        .find_msg(timeout, |msg| msg["type"] == "ledgerClosed")
        .expect("ledger closed message");
    assert_eq!(ledger["ledger_index"], closed_seq);
    assert_eq!(ledger["txn_count"], 1);

    let tx = ws
        .find_msg(timeout, |msg| msg["type"] == "transaction")
        .expect("transaction message");
    assert_eq!(tx["transaction"]["TransactionType"], "Payment");
    assert_eq!(tx["transaction"]["Destination"], alice.human());
    assert_eq!(tx["engine_result"], "tesSUCCESS");
    assert_eq!(tx["ledger_index"], closed_seq);

    // Nothing else was published
    assert!(ws.get_msg(Duration::from_millis(100)).is_none());
}

#[test]
fn test_ws_unsubscribe_stops_messages() {
    init_test_logging();
    let mut env = Env::new();
    let ws = env.ws_client(1).expect("websocket connection");
    let streams = json!({ "streams": ["ledger"] });

    ws.invoke("subscribe", &streams);
    env.close();
    assert!(ws.get_msg(Duration::from_secs(5)).is_some());

    let jr = ws.invoke("unsubscribe", &streams);
    assert_eq!(jr["status"], "success");
    env.close();
    assert!(ws.get_msg(Duration::from_millis(100)).is_none());
}

// ============================================================================
// Templates and Modifiers
// ============================================================================

#[test]
fn test_destination_tag_and_inspect() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    let bob = Account::new("bob");
    env.fund(xrp(10_000), [&alice, &bob]);
    env.apply(fset(&bob, asf::REQUIRE_DEST), &[]);
    // Bob paid for the AccountSet
    let fee = Amount::Native(env.base_fee());
    let expected = xrp(10_010).checked_sub(&fee).unwrap();

    env.apply(pay(&alice, &bob, xrp(10)), &[ter(Ter::tecDST_TAG_NEEDED)]);

    let seen = Arc::new(AtomicBool::new(false));
    let inspected = seen.clone();
    env.apply(
        pay(&alice, &bob, xrp(10)),
        &[
            dtag(7),
            fee_autofill(),
            inspect(move |_, jt| {
                assert_eq!(jt.jv["DestinationTag"], 7);
                assert!(jt.stx.is_some());
                inspected.store(true, Ordering::SeqCst);
            }),
            require(balance(&bob, expected)),
        ],
    );
    assert!(seen.load(Ordering::SeqCst));
}

#[test]
fn test_set_and_clear_in_one_transaction() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    env.fund(xrp(10_000), &alice);
    env.apply(fset(&alice, asf::REQUIRE_DEST), &[]);

    env.apply(
        fset_clear(&alice, asf::DISALLOW_XRP, asf::REQUIRE_DEST),
        &[require(flags(&alice, &[asf::DISALLOW_XRP])), require(nflags(&alice, &[asf::REQUIRE_DEST]))],
    );
}

#[test]
fn test_ter_any_accepts_failures() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    env.fund(xrp(10_000), &alice);

    env.apply(noop(&alice), &[fee_none(), ter_any()]);
    assert_eq!(env.ter(), Ter::temMALFORMED);
    assert!(!env.applied());
}

#[test]
fn test_regular_key_can_be_removed() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    let bob = Account::new("bob");
    env.fund(xrp(10_000), [&alice, &bob]);

    // Keys that are neither master nor regular are refused
    env.apply(noop(&alice), &[sig(&bob), ter(Ter::tefBAD_AUTH)]);

    env.apply(regkey(&alice, &bob), &[]);
    env.apply(noop(&alice), &[sig(&bob)]);

    env.apply(regkey_disabled(&alice), &[sig(&alice)]);
    env.apply(noop(&alice), &[sig(&bob), ter(Ter::tefBAD_AUTH)]);
}

#[test]
fn test_signer_list_owner_count() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    let bogie = Account::new("bogie");
    let demon = Account::new("demon");
    env.fund(xrp(10_000), [&alice, &bogie, &demon]);

    env.apply(
        signers(&alice, 2, &[(&bogie, 1), (&demon, 1)]),
        &[require(owners(&alice, 4))],
    );
    assert!(env.le_keylet(&keylet::signers(&alice.id())).is_some());

    env.apply(signers_none(&alice), &[require(owners(&alice, 0))]);
    assert!(env.le_keylet(&keylet::signers(&alice.id())).is_none());
}

#[test]
fn test_passive_offer_is_placed() {
    init_test_logging();
    let mut env = Env::new();
    let gw = Account::new("gw");
    let alice = Account::new("alice");
    env.fund(xrp(10_000), [&gw, &alice]);
    let usd = gw.iou("USD");

    let sequence = env.seq(&alice).unwrap();
    env.apply(
        offer_with_flags(&alice, usd.amount(10), xrp(10), tf::PASSIVE),
        &[require(offers(&alice, 1))],
    );

    let placed = env.le_keylet(&keylet::offer(&alice.id(), sequence)).unwrap();
    assert_eq!(placed.as_offer().unwrap().flags & lsf::PASSIVE, lsf::PASSIVE);
}

#[test]
fn test_trace_counts_down() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    env.fund(xrp(10_000), &alice);

    let fee = Amount::Native(env.base_fee());
    env.trace(1);
    env.apply(noop(&alice), &[]);
    env.notrace();
    env.apply(noop(&alice), &[]);

    let expected = xrp(10_000).checked_sub(&fee).unwrap().checked_sub(&fee).unwrap();
    env.require([balance(&alice, expected)]);
}

#[test]
fn test_json_rpc_client_versions() {
    init_test_logging();
    let env = Env::new();
    for version in [1, 2] {
        let client = env.json_rpc_client(version).unwrap();
        assert_eq!(client.version(), version);
        let jr = client.invoke("server_info", &Value::Null);
        assert_eq!(jr["status"], "success");
        assert!(jr["result"]["info"]["build_version"].is_string());
    }
}
