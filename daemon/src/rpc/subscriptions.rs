use indexmap::IndexMap;
use log::{debug, trace};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::Sender,
    },
};
use trackable_common::crypto::AccountId;

use crate::ledger::{Ledger, ReadView, TxEntry};

pub type SubscriberId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stream {
    Ledger,
    Transactions,
}

impl Stream {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ledger" => Some(Stream::Ledger),
            "transactions" => Some(Stream::Transactions),
            _ => None,
        }
    }
}

struct Subscriber {
    sink: Sender<Value>,
    streams: HashSet<Stream>,
    accounts: HashSet<AccountId>,
}

/// Websocket connections and the streams they listen to.
#[derive(Default)]
pub struct Subscriptions {
    next_id: AtomicU64,
    subscribers: Mutex<IndexMap<SubscriberId, Subscriber>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, sink: Sender<Value>) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers.lock().insert(
            id,
            Subscriber {
                sink,
                streams: HashSet::new(),
                accounts: HashSet::new(),
            },
        );
        debug!("Subscriber {} connected", id);
        id
    }

    pub fn disconnect(&self, id: SubscriberId) {
        if self.subscribers.lock().shift_remove(&id).is_some() {
            debug!("Subscriber {} disconnected", id);
        }
    }

    /// Returns false when the subscriber is gone.
    pub fn subscribe(&self, id: SubscriberId, streams: &[Stream], accounts: &[AccountId]) -> bool {
        let mut subscribers = self.subscribers.lock();
        let Some(subscriber) = subscribers.get_mut(&id) else {
            return false;
        };
        subscriber.streams.extend(streams.iter().copied());
        subscriber.accounts.extend(accounts.iter().copied());
        true
    }

    pub fn unsubscribe(&self, id: SubscriberId, streams: &[Stream], accounts: &[AccountId]) -> bool {
        let mut subscribers = self.subscribers.lock();
        let Some(subscriber) = subscribers.get_mut(&id) else {
            return false;
        };
        for stream in streams {
            subscriber.streams.remove(stream);
        }
        for account in accounts {
            subscriber.accounts.remove(account);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Subscribers whose connection dropped are removed
    fn publish(&self, message: &Value, wanted: impl Fn(&Subscriber) -> bool) {
        self.subscribers.lock().retain(|id, subscriber| {
            if !wanted(subscriber) {
                return true;
            }
            let delivered = subscriber.sink.send(message.clone()).is_ok();
            if !delivered {
                debug!("Dropping subscriber {}", id);
            }
            delivered
        });
    }

    pub fn publish_ledger(&self, ledger: &Ledger, validated_ledgers: &str) {
        let mut message = ledger_stream_json(ledger);
        message["type"] = json!("ledgerClosed");
        message["txn_count"] = json!(ledger.txs().len());
        message["validated_ledgers"] = json!(validated_ledgers);
        trace!("Publishing ledger {}", ledger.seq());
        self.publish(&message, |s| s.streams.contains(&Stream::Ledger));
    }

    pub fn publish_transaction(&self, ledger: &Ledger, entry: &TxEntry) {
        let tx = &entry.tx;
        let mut message = json!({
            "type": "transaction",
            "transaction": tx.to_json(),
            "ledger_index": ledger.seq(),
            "ledger_hash": ledger.info().hash.to_hex(),
            "status": "closed",
            "validated": true,
        });
        if let Some(meta) = &entry.meta {
            message["meta"] = meta.to_json();
            message["engine_result"] = json!(meta.result.token());
            message["engine_result_code"] = json!(meta.result.code());
            message["engine_result_message"] = json!(meta.result.human());
        }
        let account = tx.account();
        let destination = tx.get_account(trackable_common::transaction::Field::Destination);
        self.publish(&message, |s| {
            s.streams.contains(&Stream::Transactions)
                || s.accounts.contains(&account)
                || destination.is_some_and(|d| s.accounts.contains(&d))
        });
    }
}

/// Ledger fields shared by `subscribe` results and ledger stream messages.
pub fn ledger_stream_json(ledger: &Ledger) -> Value {
    let fees = ledger.fees();
    json!({
        "ledger_index": ledger.seq(),
        "ledger_hash": ledger.info().hash.to_hex(),
        "ledger_time": ledger.info().close_time.as_secs(),
        "fee_base": fees.base.drops(),
        "fee_ref": fees.units,
        "reserve_base": fees.reserve.drops(),
        "reserve_inc": fees.increment.drops(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeeSetup;
    use std::sync::mpsc::channel;
    use trackable_common::features::FeatureSet;

    fn ledger() -> Ledger {
        Ledger::genesis(&FeeSetup::default(), &FeatureSet::new(), &[], Default::default()).unwrap()
    }

    #[test]
    fn test_only_subscribed_streams_receive() {
        let subscriptions = Subscriptions::new();
        let (tx_a, rx_a) = channel();
        let (tx_b, rx_b) = channel();
        let a = subscriptions.connect(tx_a);
        let _b = subscriptions.connect(tx_b);
        assert!(subscriptions.subscribe(a, &[Stream::Ledger], &[]));

        subscriptions.publish_ledger(&ledger(), "1");
        let message = rx_a.try_recv().unwrap();
        assert_eq!(message["type"], "ledgerClosed");
        assert_eq!(message["ledger_index"], 1);
        assert!(rx_b.try_recv().is_err());

        assert!(subscriptions.unsubscribe(a, &[Stream::Ledger], &[]));
        subscriptions.publish_ledger(&ledger(), "1");
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let subscriptions = Subscriptions::new();
        let (sink, receiver) = channel();
        let id = subscriptions.connect(sink);
        subscriptions.subscribe(id, &[Stream::Ledger], &[]);
        drop(receiver);
        subscriptions.publish_ledger(&ledger(), "1");
        assert!(subscriptions.is_empty());
        assert!(!subscriptions.subscribe(id, &[Stream::Ledger], &[]));
    }
}
