// File: testing-framework/src/jtx/funclets.rs
//
// Transaction templates and the funclets that adjust them.
//
// Templates return the JSON of one transaction with only the fields the
// caller chose. Fee, sequence and signature are left to autofill unless a
// funclet sets or suppresses them.

use serde_json::{json, Value};
use std::sync::Arc;
use trackable_common::{
    amount::Amount,
    config::QUALITY_ONE,
    flags::tf,
    ter::Ter,
    transaction::sign_json,
};

use super::{Account, Env, Funclet, JTx, Requirement};

// ============================================================================
// Templates
// ============================================================================

/// Send `amount` from `from` to `to`.
pub fn pay(from: &Account, to: &Account, amount: Amount) -> Value {
    json!({
        "Account": from.human(),
        "Amount": amount.to_json(),
        "Destination": to.human(),
        "TransactionType": "Payment",
        "Flags": tf::UNIVERSAL,
    })
}

/// An AccountSet that changes nothing.
pub fn noop(account: &Account) -> Value {
    fset(account, 0)
}

/// Set an account flag (`asf::*`). Zero leaves `SetFlag` out.
pub fn fset(account: &Account, on: u32) -> Value {
    fset_clear(account, on, 0)
}

/// Clear an account flag (`asf::*`).
pub fn fclear(account: &Account, off: u32) -> Value {
    fset_clear(account, 0, off)
}

/// AccountSet with both a flag to set and a flag to clear. Zero leaves the
/// field out.
pub fn fset_clear(account: &Account, on: u32, off: u32) -> Value {
    let mut jv = json!({
        "Account": account.human(),
        "TransactionType": "AccountSet",
    });
    if on != 0 {
        jv["SetFlag"] = json!(on);
    }
    if off != 0 {
        jv["ClearFlag"] = json!(off);
    }
    jv
}

/// Extend a trust line to the issuer of `limit`.
pub fn trust(account: &Account, limit: Amount) -> Value {
    trust_with_flags(account, limit, 0)
}

pub fn trust_with_flags(account: &Account, limit: Amount, flags: u32) -> Value {
    json!({
        "Account": account.human(),
        "LimitAmount": limit.to_json(),
        "TransactionType": "TrustSet",
        "Flags": flags,
    })
}

/// Offer to take `taker_pays` in exchange for `taker_gets`.
pub fn offer(account: &Account, taker_pays: Amount, taker_gets: Amount) -> Value {
    offer_with_flags(account, taker_pays, taker_gets, 0)
}

pub fn offer_with_flags(account: &Account, taker_pays: Amount, taker_gets: Amount, flags: u32) -> Value {
    json!({
        "Account": account.human(),
        "TakerPays": taker_pays.to_json(),
        "TakerGets": taker_gets.to_json(),
        "TransactionType": "OfferCreate",
        "Flags": flags,
    })
}

/// Cancel the offer `account` created with sequence `offer_seq`.
pub fn offer_cancel(account: &Account, offer_seq: u32) -> Value {
    json!({
        "Account": account.human(),
        "OfferSequence": offer_seq,
        "TransactionType": "OfferCancel",
    })
}

/// Set the regular key of `account`.
pub fn regkey(account: &Account, signer: &Account) -> Value {
    json!({
        "Account": account.human(),
        "RegularKey": signer.human(),
        "TransactionType": "SetRegularKey",
    })
}

/// Remove the regular key of `account`.
pub fn regkey_disabled(account: &Account) -> Value {
    json!({
        "Account": account.human(),
        "TransactionType": "SetRegularKey",
    })
}

/// Replace the signer list of `account` with `signers`, as (account,
/// weight) pairs.
pub fn signers(account: &Account, quorum: u32, signers: &[(&Account, u16)]) -> Value {
    let entries: Vec<Value> = signers
        .iter()
        .map(|(signer, weight)| {
            json!({
                "SignerEntry": {
                    "Account": signer.human(),
                    "SignerWeight": weight,
                }
            })
        })
        .collect();
    json!({
        "Account": account.human(),
        "TransactionType": "SignerListSet",
        "SignerQuorum": quorum,
        "SignerEntries": entries,
    })
}

/// Remove the signer list of `account`.
pub fn signers_none(account: &Account) -> Value {
    json!({
        "Account": account.human(),
        "TransactionType": "SignerListSet",
        "SignerQuorum": 0,
    })
}

/// Attach `account`'s public key and signature to `jv`.
///
/// # Panics
///
/// When `jv` does not parse as a transaction object.
pub fn sign(jv: &mut Value, account: &Account) {
    if let Err(e) = sign_json(jv, account.keys()) {
        log::error!("Unable to sign:\n{}", pretty(jv));
        panic!("Unable to sign a transaction for {}: {}", account, e);
    }
}

pub(crate) fn pretty(jv: &Value) -> String {
    serde_json::to_string_pretty(jv).unwrap_or_else(|_| jv.to_string())
}

// ============================================================================
// Autofill control
// ============================================================================

/// Pay exactly `drops` in fees.
pub fn fee(drops: i64) -> Funclet {
    Funclet::with_json(move |_, jt| {
        jt.jv["Fee"] = Amount::native(drops).to_json();
    })
}

/// Leave the fee out.
pub fn fee_none() -> Funclet {
    Funclet::with_json(|_, jt| jt.fill_fee = false)
}

/// Let the environment pick the fee. This is the default.
pub fn fee_autofill() -> Funclet {
    Funclet::with_json(|_, jt| jt.fill_fee = true)
}

/// Use sequence `n`.
pub fn seq(n: u32) -> Funclet {
    Funclet::with_json(move |_, jt| jt.jv["Sequence"] = json!(n))
}

/// Leave the sequence out.
pub fn seq_none() -> Funclet {
    Funclet::with_json(|_, jt| jt.fill_seq = false)
}

/// Sign with `account`'s master key instead of autofill.
pub fn sig(account: &Account) -> Funclet {
    let account = account.clone();
    Funclet::with_json(move |_, jt| {
        jt.fill_sig = false;
        let account = account.clone();
        jt.signer = Some(Arc::new(move |_: &Env, jt: &mut JTx| sign(&mut jt.jv, &account)));
    })
}

/// Leave the transaction unsigned.
pub fn sig_none() -> Funclet {
    Funclet::with_json(|_, jt| {
        jt.fill_sig = false;
        jt.signer = None;
    })
}

// ============================================================================
// Fields
// ============================================================================

/// Set the `Flags` field.
pub fn txflags(flags: u32) -> Funclet {
    Funclet::with_json(move |_, jt| jt.jv["Flags"] = json!(flags))
}

/// Merge `fields` into the transaction, replacing existing values.
pub fn json(fields: Value) -> Funclet {
    Funclet::with_json(move |_, jt| {
        if let (Some(target), Some(source)) = (jt.jv.as_object_mut(), fields.as_object()) {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        }
    })
}

/// Remove `field` from the transaction.
pub fn without(field: &'static str) -> Funclet {
    Funclet::with_json(move |_, jt| {
        if let Some(target) = jt.jv.as_object_mut() {
            target.remove(field);
        }
    })
}

/// Set `Domain` to the hex of `domain`.
pub fn domain(domain: &[u8]) -> Funclet {
    let domain = hex::encode_upper(domain);
    Funclet::with_json(move |_, jt| jt.jv["Domain"] = json!(domain))
}

/// Set `TransferRate` to `rate` as a multiplier, e.g. `rate(1.1)`.
pub fn rate(rate: f64) -> Funclet {
    let value = (rate * f64::from(QUALITY_ONE)).round() as u32;
    Funclet::with_json(move |_, jt| jt.jv["TransferRate"] = json!(value))
}

/// Spend at most `amount` on a payment.
pub fn sendmax(amount: Amount) -> Funclet {
    Funclet::with_json(move |_, jt| jt.jv["SendMax"] = amount.to_json())
}

/// Set `DestinationTag`.
pub fn dtag(tag: u32) -> Funclet {
    Funclet::with_json(move |_, jt| jt.jv["DestinationTag"] = json!(tag))
}

// ============================================================================
// Expectations
// ============================================================================

/// Expect `code` instead of tesSUCCESS.
pub fn ter(code: Ter) -> Funclet {
    Funclet::with_json(move |_, jt| jt.ter = Some(code))
}

/// Accept any result.
pub fn ter_any() -> Funclet {
    Funclet::with_json(|_, jt| jt.ter = None)
}

/// Check `requirement` once the transaction applied as expected.
pub fn require(requirement: Requirement) -> Funclet {
    Funclet::with_json(move |_, jt| jt.requires.push(requirement.clone()))
}

/// Run `check` on the parsed transaction.
pub fn inspect(check: impl Fn(&Env, &JTx) + Send + Sync + 'static) -> Funclet {
    Funclet::with_tx(check)
}
