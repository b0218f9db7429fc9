#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Regression Tests
//!
//! Scenarios that once broke the transaction engine or the harness:
//! - OfferCreate replacing an earlier offer through OfferSequence
//! - A fee larger than the balance destroys exactly the balance
//! - A foreign signing key type is rejected, not crashed on
//! - Autofilled fees follow fee escalation
//! - Requests split across read buffers still parse

use serde_json::{json, Value};
use std::{io::Read, sync::Arc};
use trackable_common::{
    amount::Drops,
    config::{DROPS_PER_UNIT, SYSTEM_CURRENCY_START},
    features::{FeatureSet, FEATURE_FEE_ESCALATION},
    ter::Ter,
    transaction::{Transaction, TxType},
};
use trackable_daemon::{
    ledger::{keylet, ApplyFlags, Ledger, LedgerEntry, OpenView, ReadView},
    tx,
};
use trackable_testing_framework::{
    jtx::{
        drops, envconfig_with, fee, fee_none, json as merge, noop, offer, owners, pay, require,
        seq, seq_none, sig, ter, xrp, Account, Env, JTx,
    },
    utilities::init_test_logging,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn native_balance(ledger: &Ledger, account: &Account) -> Option<Drops> {
    ledger
        .read_keylet(&keylet::account(&account.id()))
        .as_deref()
        .and_then(LedgerEntry::as_account_root)
        .map(|root| root.balance)
}

// Apply `tx` to a fresh open view over `ledger` and fold the result back in
fn apply_to(ledger: &mut Ledger, tx: &Arc<Transaction>) -> (Ter, bool) {
    let (result, items, txs) = {
        let mut accum = OpenView::new(ledger);
        let result = tx::apply(&mut accum, tx, ApplyFlags::NONE);
        let (items, txs) = accum.into_delta();
        (result, items, txs)
    };
    ledger.apply_delta(&items, txs);
    result
}

// ============================================================================
// Offers
// ============================================================================

#[test]
fn test_offer_then_offer_with_cancel() {
    init_test_logging();
    let mut env = Env::new();
    let gw = Account::new("gw");
    let alice = Account::new("alice");
    let usd = gw.iou("USD");
    env.fund(xrp(10_000), [&alice, &gw]);

    env.apply(offer(&alice, usd.amount(10), xrp(10)), &[require(owners(&alice, 1))]);
    // Sequence 2 is the offer above, replaced by this one
    env.apply(
        offer(&alice, usd.amount(20), xrp(10)),
        &[merge(json!({ "OfferSequence": 2 })), require(owners(&alice, 1))],
    );
}

// ============================================================================
// Low Balance Destroy
// ============================================================================

#[test]
fn test_low_balance_destroys_correct_amount() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    env.memoize(&alice);

    // Not reproducible against the open ledger, so work on a local ledger
    let config = env.app().config();
    let closed = Ledger::genesis(
        &config.fees,
        &config.features,
        &[],
        env.master().id(),
    )
    .unwrap();
    let mut expected_drops = SYSTEM_CURRENCY_START;
    assert_eq!(closed.info().drops, Drops::new(expected_drops));

    let alice_units = 400;
    let alice_amount = xrp(alice_units);
    let mut next = Ledger::successor(&closed, &config.features);

    let jt = env.jt(pay(env.master(), &alice, alice_amount), &[]);
    let result = apply_to(&mut next, jt.stx.as_ref().unwrap());
    assert_eq!(result, (Ter::tesSUCCESS, true));
    expected_drops -= next.fees().base.drops();
    assert_eq!(next.info().drops, Drops::new(expected_drops));
    assert_eq!(native_balance(&next, &alice), alice_amount.drops());

    // The open ledger does not know alice, so the sequence is set by hand
    let jt = env.jt(noop(&alice), &[fee(expected_drops), seq(1)]);
    let result = apply_to(&mut next, jt.stx.as_ref().unwrap());
    assert_eq!(result, (Ter::tecINSUFF_FEE, true));
    assert_eq!(native_balance(&next, &alice), Some(Drops::zero()));

    expected_drops -= alice_units * DROPS_PER_UNIT;
    assert_eq!(next.info().drops, Drops::new(expected_drops));
}

// ============================================================================
// Foreign Key Types
// ============================================================================

// A secp256r1 public key, which this ledger cannot verify
const SECP256R1_PUB_KEY: &str = "045d02995ec24988d9a2ae06a3733aa35ba0741e87527\
    ed12909b60bd458052c944b24cbf5893c3e5be321774e\
    5082e11c034b765861d0effbde87423f8476bb2c";

fn submit_with_foreign_key(env: &mut Env, account: &Account) {
    let base_fee = env.base_fee().drops();
    let account_seq = env.seq(account).unwrap();
    let jv = env.json(noop(account), &[fee(base_fee), seq(account_seq), sig(account)]);

    let mut jt: JTx = env.jt(jv, &[]);
    jt.fill_sig = false;
    jt.jv["SigningPubKey"] = json!(SECP256R1_PUB_KEY);
    jt.stx = Some(Arc::new(Transaction::from_json(&jt.jv).unwrap()));
    assert_eq!(jt.stx.as_ref().unwrap().signing_pub_key().len(), 65);
    jt.ter = Some(Ter::temINVALID);
    env.submit(&jt);
}

#[test]
fn test_foreign_signing_key_fails_gracefully() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    let becky = Account::new("becky");
    env.fund(xrp(10_000), [&alice, &becky]);

    submit_with_foreign_key(&mut env, &alice);
    submit_with_foreign_key(&mut env, &becky);
    assert_eq!(env.ter(), Ter::temINVALID);
    assert!(!env.applied());
}

// ============================================================================
// Fee Escalation Autofill
// ============================================================================

#[test]
fn test_autofilled_fee_uses_escalated_fee() {
    init_test_logging();
    let config = envconfig_with(|mut config| {
        config.transaction_queue.minimum_txn_in_ledger_standalone = 3;
        config
    });
    let features: FeatureSet = [*FEATURE_FEE_ESCALATION].into_iter().collect();
    let mut env = Env::with_config_and_features(config, features);

    let alice = Account::new("alice");
    env.fund(xrp(100_000), &alice);

    // Max fee is 50k drops
    let params = json!({ "fee_mult_max": 5000 });
    let expected_fees = [10, 10, 8889, 13889, 20000];

    for expected in expected_fees {
        let jt = env.jt(noop(&alice), &[fee_none(), seq_none()]);
        env.sign_and_submit(&jt, params.clone()).unwrap();

        let tx = env.tx().expect("submitted transaction in the open ledger");
        assert_eq!(tx.account(), alice.id());
        assert_eq!(tx.tx_type(), TxType::AccountSet);
        assert_eq!(tx.fee(), drops(expected).drops().unwrap());
    }
}

#[test]
fn test_expected_result_is_checked_for_server_signed() {
    init_test_logging();
    let mut env = Env::new();
    let alice = Account::new("alice");
    env.fund(xrp(1_000), &alice);

    let jt = env.jt(noop(&alice), &[fee_none(), seq_none(), ter(Ter::tesSUCCESS)]);
    env.sign_and_submit(&jt, Value::Null).unwrap();
    assert_eq!(env.ter(), Ter::tesSUCCESS);
    assert!(env.tx().is_some());
}

// ============================================================================
// JSON Parsing
// ============================================================================

#[test]
fn test_json_parses_from_split_buffers() {
    let request = r#"{"command":"path_find","id":19,"subcommand":"create","source_account":"rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh","destination_account":"rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh","destination_amount":"1000000","source_currencies":[{"currency":"0000000000000000000000000000000000000000"},{"currency":"0000000000000000000000005553440000000000"},{"currency":"0000000000000000000000004254430000000000"},{"issuer":"rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh","currency":"0000000000000000000000004254430000000000"},{"issuer":"rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh","currency":"0000000000000000000000004254430000000000"},{"issuer":"rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh","currency":"0000000000000000000000004555520000000000"},{"currency":"0000000000000000000000004554480000000000"},{"currency":"0000000000000000000000004A50590000000000"},{"issuer":"rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh","currency":"000000000000000000000000434E590000000000"},{"currency":"0000000000000000000000004742490000000000"},{"issuer":"rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh","currency":"0000000000000000000000004341440000000000"}]}"#;
    assert!(request.len() > 1024);

    let (first, second) = request.as_bytes().split_at(1024);
    let reader = first.chain(second);
    let parsed: Value = serde_json::from_reader(reader).unwrap();
    assert!(parsed.is_object());
    assert_eq!(parsed["command"], "path_find");
    assert_eq!(parsed["source_currencies"].as_array().map(Vec::len), Some(11));
}
