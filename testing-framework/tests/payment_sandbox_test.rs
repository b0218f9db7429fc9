#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Payment Sandbox Tests
//!
//! Credits received inside a payment sandbox are not spendable until the
//! payment completes:
//! - Subtracting credits on a plain view, a sandbox and nested sandboxes
//! - A tiny balance survives a huge deferred credit
//! - Native funds after a round trip below the reserve read zero
//! - The balance hook keeps the issuer of the amount asked about

use trackable_common::{
    amount::{Amount, IouAmount, Issue},
    crypto::AccountId,
    features::{feature_id, FeatureSet, FEATURE_FLOW},
};
use trackable_daemon::ledger::{
    helpers::{account_holds, account_send, issue_iou, redeem_iou, ripple_credit},
    ApplyFlags, ApplyView, ApplyViewImpl, PaymentSandbox, ReadView,
};
use trackable_testing_framework::{
    jtx::{pay, xrp, Account, Env},
    utilities::init_test_logging,
};

// ============================================================================
// Test Helpers
// ============================================================================

// Every scenario runs with and without the payment engine amendments
fn feature_sets() -> Vec<FeatureSet> {
    vec![
        FeatureSet::new(),
        [*FEATURE_FLOW, feature_id("fix1373")].into_iter().collect(),
    ]
}

fn plus(a: Amount, b: Amount) -> Amount {
    a.checked_add(&b).unwrap()
}

fn minus(a: Amount, b: Amount) -> Amount {
    a.checked_sub(&b).unwrap()
}

// ============================================================================
// Subtract Credits
// ============================================================================

fn check_subtract_credits(features: FeatureSet) {
    let mut env = Env::with_features(features);
    let gw1 = Account::new("gw1");
    let gw2 = Account::new("gw2");
    let alice = Account::new("alice");
    env.fund(xrp(10_000), [&alice, &gw1, &gw2]);

    let usd_gw1 = gw1.iou("USD");
    let usd_gw2 = gw2.iou("USD");
    env.trust(usd_gw1.amount(100), &[&alice]);
    env.trust(usd_gw2.amount(100), &[&alice]);
    env.apply(pay(&gw1, &alice, usd_gw1.amount(50)), &[]);
    env.apply(pay(&gw2, &alice, usd_gw2.amount(50)), &[]);

    let to_credit = usd_gw1.amount(30);
    let to_debit = usd_gw1.amount(20);
    let issue = usd_gw1.issue();
    let (gw1, alice) = (gw1.id(), alice.id());
    let view = env.current();

    {
        // account_send, no deferred credits
        let mut av = ApplyViewImpl::new(&view, ApplyFlags::NONE);
        let starting = account_holds(&av, &alice, &issue);

        account_send(&mut av, &gw1, &alice, &to_credit);
        assert_eq!(account_holds(&av, &alice, &issue), plus(starting, to_credit));

        account_send(&mut av, &alice, &gw1, &to_debit);
        assert_eq!(
            account_holds(&av, &alice, &issue),
            minus(plus(starting, to_credit), to_debit)
        );
    }

    {
        // ripple_credit, no deferred credits
        let mut av = ApplyViewImpl::new(&view, ApplyFlags::NONE);
        let starting = account_holds(&av, &alice, &issue);

        ripple_credit(&mut av, &gw1, &alice, &to_credit);
        assert_eq!(account_holds(&av, &alice, &issue), plus(starting, to_credit));

        ripple_credit(&mut av, &alice, &gw1, &to_debit);
        assert_eq!(
            account_holds(&av, &alice, &issue),
            minus(plus(starting, to_credit), to_debit)
        );
    }

    {
        // account_send, with deferred credits
        let av = ApplyViewImpl::new(&view, ApplyFlags::NONE);
        let mut pv = PaymentSandbox::new(&av, ApplyFlags::NONE);
        let starting = account_holds(&pv, &alice, &issue);

        account_send(&mut pv, &gw1, &alice, &to_credit);
        assert_eq!(account_holds(&pv, &alice, &issue), starting);

        account_send(&mut pv, &alice, &gw1, &to_debit);
        assert_eq!(account_holds(&pv, &alice, &issue), minus(starting, to_debit));
    }

    {
        // ripple_credit, with deferred credits
        let av = ApplyViewImpl::new(&view, ApplyFlags::NONE);
        let mut pv = PaymentSandbox::new(&av, ApplyFlags::NONE);
        let starting = account_holds(&pv, &alice, &issue);

        ripple_credit(&mut pv, &gw1, &alice, &to_credit);
        assert_eq!(account_holds(&pv, &alice, &issue), starting);
    }

    {
        // redeem_iou, with deferred credits
        let av = ApplyViewImpl::new(&view, ApplyFlags::NONE);
        let mut pv = PaymentSandbox::new(&av, ApplyFlags::NONE);
        let starting = account_holds(&pv, &alice, &issue);

        redeem_iou(&mut pv, &alice, &to_debit);
        assert_eq!(account_holds(&pv, &alice, &issue), minus(starting, to_debit));
    }

    {
        // issue_iou, with deferred credits
        let av = ApplyViewImpl::new(&view, ApplyFlags::NONE);
        let mut pv = PaymentSandbox::new(&av, ApplyFlags::NONE);
        let starting = account_holds(&pv, &alice, &issue);

        issue_iou(&mut pv, &alice, &to_credit);
        assert_eq!(account_holds(&pv, &alice, &issue), starting);
    }

    {
        // account_send, with deferred credits and stacked sandboxes
        let av = ApplyViewImpl::new(&view, ApplyFlags::NONE);
        let mut pv = PaymentSandbox::new(&av, ApplyFlags::NONE);
        let starting = account_holds(&pv, &alice, &issue);

        account_send(&mut pv, &gw1, &alice, &to_credit);
        assert_eq!(account_holds(&pv, &alice, &issue), starting);

        {
            let mut pv2 = PaymentSandbox::nested(&pv);
            assert_eq!(account_holds(&pv2, &alice, &issue), starting);
            account_send(&mut pv2, &gw1, &alice, &to_credit);
            assert_eq!(account_holds(&pv2, &alice, &issue), starting);
        }

        account_send(&mut pv, &alice, &gw1, &to_debit);
        assert_eq!(account_holds(&pv, &alice, &issue), minus(starting, to_debit));
    }
}

#[test]
fn test_subtract_credits() {
    init_test_logging();
    for features in feature_sets() {
        check_subtract_credits(features);
    }
}

#[test]
fn test_nested_sandbox_merges_into_parent() {
    init_test_logging();
    let mut env = Env::new();
    let gw = Account::new("gw");
    let alice = Account::new("alice");
    env.fund(xrp(10_000), [&alice, &gw]);
    let usd = gw.iou("USD");
    env.trust(usd.amount(100), &[&alice]);
    env.apply(pay(&gw, &alice, usd.amount(50)), &[]);

    let view = env.current();
    let av = ApplyViewImpl::new(&view, ApplyFlags::NONE);
    let mut pv = PaymentSandbox::new(&av, ApplyFlags::NONE);
    let starting = account_holds(&pv, &alice.id(), &usd.issue());

    let delta = {
        let mut pv2 = PaymentSandbox::nested(&pv);
        account_send(&mut pv2, &gw.id(), &alice.id(), &usd.amount(10));
        pv2.finish()
    };
    pv.merge(delta);

    // The merged credit is still deferred
    assert_eq!(account_holds(&pv, &alice.id(), &usd.issue()), starting);
    account_send(&mut pv, &alice.id(), &gw.id(), &usd.amount(5));
    assert_eq!(
        account_holds(&pv, &alice.id(), &usd.issue()),
        minus(starting, usd.amount(5))
    );
}

// ============================================================================
// Tiny Balance
// ============================================================================

#[test]
fn test_tiny_balance() {
    init_test_logging();
    for features in feature_sets() {
        let mut env = Env::with_features(features);
        let gw = Account::new("gw");
        let alice = Account::new("alice");
        let issue = gw.iou("USD").issue();

        // Smallest and largest representable magnitudes
        let tiny = Amount::iou(IouAmount::new(1_000_000_000_000_000, -95), issue);
        let huge = Amount::iou(IouAmount::new(9_999_999_999_999_999, 79), issue);

        env.close();
        let view = env.current();
        let av = ApplyViewImpl::new(&view, ApplyFlags::NONE);
        let mut pv = PaymentSandbox::new(&av, ApplyFlags::NONE);

        // Adding and removing a huge credit must give the tiny balance back
        pv.credit_hook(&gw.id(), &alice.id(), &huge, &tiny.negate());
        assert_eq!(pv.balance_hook(&alice.id(), &gw.id(), huge), tiny);
    }
}

// ============================================================================
// Reserve
// ============================================================================

#[test]
fn test_reserve() {
    init_test_logging();
    for features in feature_sets() {
        let mut env = Env::with_features(features);
        let alice = Account::new("alice");
        let reserve = env.with_current(|view| view.fees().account_reserve(1));
        env.fund(Amount::Native(reserve), &alice);
        env.close();

        let master = env.master().id();
        let view = env.current();
        let av = ApplyViewImpl::new(&view, ApplyFlags::NONE);
        let mut sb = PaymentSandbox::new(&av, ApplyFlags::NONE);

        // Receiving and spending 100 leaves the deferred balance below the
        // reserve. Funds read zero, never negative.
        account_send(&mut sb, &master, &alice.id(), &xrp(100));
        account_send(&mut sb, &alice.id(), &master, &xrp(100));
        assert_eq!(account_holds(&sb, &alice.id(), &Issue::native()), Amount::native(0));
    }
}

// ============================================================================
// Balance Hook
// ============================================================================

#[test]
fn test_balance_hook_keeps_issuer() {
    init_test_logging();
    for features in feature_sets() {
        let mut env = Env::with_features(features);
        let gw = Account::new("gw");
        let alice = Account::new("alice");
        let usd = gw.iou("USD");
        env.close();

        let view = env.current();
        let av = ApplyViewImpl::new(&view, ApplyFlags::NONE);
        let mut sb = PaymentSandbox::new(&av, ApplyFlags::NONE);

        // Balances from a trust line carry the currency but no issuer
        let line_issue = Issue::new(usd.issue().currency, AccountId::no_account());
        let line_balance = Amount::iou(IouAmount::from_integer(600), line_issue);

        sb.credit_hook(&gw.id(), &alice.id(), &usd.amount(400), &line_balance);
        sb.credit_hook(&gw.id(), &alice.id(), &usd.amount(100), &line_balance);

        let balance = sb.balance_hook(&gw.id(), &alice.id(), usd.amount(600));
        assert_eq!(balance.issuer(), usd.issue().account);
    }
}
