//! The ledger application a node runs: the last closed ledger, the open
//! ledger built on top of it, and the services around them.

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use thiserror::Error;
use tokio::runtime::Handle;
use trackable_common::{
    config::MASTER_PASSPHRASE,
    crypto::{Hash256, KeyPair, Seed},
    features::{FeatureId, SUPPORTED_AMENDMENTS},
    ter::Ter,
    transaction::Transaction,
};

use crate::{
    amendments::AmendmentTable,
    config::{Config, ConfigError},
    ledger::{keylet, ApplyFlags, Ledger, LedgerError, OpenView, ReadView, Rules, TxEntry},
    nodestore::{Backend, Manager, NodeObject, NodeObjectType, NodeStoreError},
    rpc::subscriptions::Subscriptions,
    time_keeper::TimeKeeper,
    txq::{TxQ, TxQSetup},
    validators::{ManifestCache, ValidatorList, ValidatorListError, ValidatorSite},
};

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    NodeStore(#[from] NodeStoreError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Validators(#[from] ValidatorListError),
    #[error("Unable to start the runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Service has stopped")]
    ServiceStopped,
}

struct LedgerState {
    closed: Arc<Ledger>,
    open: OpenView<'static>,
    history: BTreeMap<u32, Arc<Ledger>>,
}

pub struct Application {
    config: RwLock<Config>,
    time_keeper: Arc<dyn TimeKeeper>,
    runtime: Handle,
    master: KeyPair,
    validation_keys: Option<KeyPair>,
    ledgers: RwLock<LedgerState>,
    txq: TxQ,
    amendments: AmendmentTable,
    validators: Arc<ValidatorList>,
    validator_sites: ValidatorSite,
    node_store: Mutex<Box<dyn Backend>>,
    check_sigs: AtomicBool,
    subscriptions: Subscriptions,
}

fn open_rules(config: &Config, ledger: &Ledger) -> Rules {
    let amendments = ledger
        .read_keylet(&keylet::amendments())
        .and_then(|entry| entry.as_amendments().cloned());
    Rules::new(&config.features, amendments.as_ref())
}

impl Application {
    /// Build the application on `runtime`: open the node store, create the
    /// genesis ledger and close it once, then load the validator
    /// configuration.
    pub fn new(
        config: Config,
        time_keeper: Arc<dyn TimeKeeper>,
        runtime: Handle,
    ) -> Result<Arc<Self>, ApplicationError> {
        config.validate()?;
        let node_store = Manager::make_backend(&config.node_db)?;

        let master = KeyPair::from_passphrase(MASTER_PASSPHRASE);
        let genesis = Ledger::genesis(
            &config.fees,
            &config.features,
            &[],
            master.public_key().account_id(),
        )?;
        let mut first = Ledger::successor(&genesis, &config.features);
        let close_time = first.info().close_time;
        first.accept(close_time, true)?;
        let genesis = Arc::new(genesis);
        let first = Arc::new(first);
        info!(
            "Starting at ledger {} closed at {}",
            first.seq(),
            first.info().close_time
        );

        let validation_keys = config
            .validation_seed
            .as_deref()
            .map(|seed| KeyPair::from_seed(&Seed::parse_generic(seed)));
        let manifests = Arc::new(ManifestCache::new());
        let validators = Arc::new(ValidatorList::new(manifests, time_keeper.clone()));
        validators.load(
            validation_keys.as_ref().map(|keys| *keys.public_key()),
            &config.validators,
            &config.validator_list_keys,
        )?;
        let validator_sites = ValidatorSite::new(runtime.clone(), validators.clone());
        validator_sites.load(&config.validator_list_sites)?;

        let mut history = BTreeMap::new();
        history.insert(genesis.seq(), genesis.clone());
        history.insert(first.seq(), first.clone());
        let open = OpenView::new_open(first.clone(), open_rules(&config, &first));

        let app = Arc::new(Self {
            txq: TxQ::new(TxQSetup::from_config(&config)),
            amendments: AmendmentTable::new(SUPPORTED_AMENDMENTS, &[]),
            check_sigs: AtomicBool::new(config.check_signatures),
            config: RwLock::new(config),
            time_keeper,
            runtime,
            master,
            validation_keys,
            ledgers: RwLock::new(LedgerState {
                closed: first.clone(),
                open,
                history,
            }),
            validators,
            validator_sites,
            node_store: Mutex::new(node_store),
            subscriptions: Subscriptions::new(),
        });
        app.store_ledger(&genesis, None)?;
        app.store_ledger(&first, Some(&genesis))?;
        Ok(app)
    }

    /// Start fetching the configured validator lists.
    pub fn start(&self) {
        self.validator_sites.start();
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    pub fn time_keeper(&self) -> &Arc<dyn TimeKeeper> {
        &self.time_keeper
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Genesis account holding every drop at startup.
    pub fn master(&self) -> &KeyPair {
        &self.master
    }

    pub fn is_validator(&self) -> bool {
        self.validation_keys.is_some()
    }

    pub fn is_standalone(&self) -> bool {
        self.config.read().standalone
    }

    pub fn txq(&self) -> &TxQ {
        &self.txq
    }

    pub fn amendments(&self) -> &AmendmentTable {
        &self.amendments
    }

    pub fn validators(&self) -> &Arc<ValidatorList> {
        &self.validators
    }

    pub fn validator_sites(&self) -> &ValidatorSite {
        &self.validator_sites
    }

    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    /// Last closed ledger.
    pub fn closed(&self) -> Arc<Ledger> {
        self.ledgers.read().closed.clone()
    }

    /// Snapshot of the open ledger.
    pub fn current(&self) -> OpenView<'static> {
        self.ledgers.read().open.clone()
    }

    pub fn with_current<R>(&self, f: impl FnOnce(&OpenView<'static>) -> R) -> R {
        f(&self.ledgers.read().open)
    }

    pub fn ledger_by_seq(&self, seq: u32) -> Option<Arc<Ledger>> {
        self.ledgers.read().history.get(&seq).cloned()
    }

    pub fn ledger_by_hash(&self, hash: &Hash256) -> Option<Arc<Ledger>> {
        self.ledgers
            .read()
            .history
            .values()
            .rev()
            .find(|ledger| &ledger.info().hash == hash)
            .cloned()
    }

    /// Range of closed ledgers held, as `first-last`.
    pub fn complete_ledgers(&self) -> String {
        let ledgers = self.ledgers.read();
        match (ledgers.history.keys().next(), ledgers.history.keys().next_back()) {
            (Some(first), Some(last)) => format!("{}-{}", first, last),
            _ => "empty".to_string(),
        }
    }

    /// Look a transaction up in the open ledger, then in closed ledgers from
    /// newest to oldest. The ledger is `None` for the open ledger.
    pub fn find_transaction(&self, id: &Hash256) -> Option<(TxEntry, Option<Arc<Ledger>>)> {
        let ledgers = self.ledgers.read();
        if let Some(entry) = ledgers.open.tx_read(id) {
            return Some((entry, None));
        }
        ledgers
            .history
            .values()
            .rev()
            .find_map(|ledger| ledger.tx_read(id).map(|entry| (entry, Some(ledger.clone()))))
    }

    pub fn set_check_sigs(&self, check: bool) {
        self.check_sigs.store(check, Ordering::SeqCst);
    }

    pub fn check_sigs(&self) -> bool {
        self.check_sigs.load(Ordering::SeqCst)
    }

    /// Treat an amendment as enabled from the next open ledger on.
    pub fn enable_feature(&self, id: FeatureId) {
        let mut config = self.config.write();
        if config.features.insert(id) {
            debug!("Feature {} preset", id);
        }
        let mut ledgers = self.ledgers.write();
        let rules = open_rules(&config, &ledgers.closed);
        ledgers.open.set_rules(rules);
    }

    /// Apply a transaction to the open ledger.
    pub fn submit(&self, tx: &Arc<Transaction>) -> (Ter, bool) {
        let flags = if self.check_sigs() {
            ApplyFlags::NONE
        } else {
            ApplyFlags::NO_CHECK_SIGN
        };
        let mut ledgers = self.ledgers.write();
        let (ter, applied) = self.txq.apply(&mut ledgers.open, tx, flags);
        debug!("Submitted {}: {} (applied: {})", tx.id(), ter, applied);
        (ter, applied)
    }

    /// Close the open ledger at the time keeper's close time, pushed back by
    /// `consensus_delay` when given, and open its successor.
    pub fn accept_ledger(&self, consensus_delay: Option<Duration>) -> Result<Arc<Ledger>, ApplicationError> {
        let config = self.config.read().clone();
        let (next, previous) = {
            let mut ledgers = self.ledgers.write();
            let previous = ledgers.closed.clone();
            let mut next = Ledger::successor(&previous, &config.features);
            let (table, txs) = ledgers.open.clone().into_delta();
            next.apply_delta(&table, txs);

            if self.is_validator() && next.is_flag_ledger() {
                let trusted = self.validators.trusted_count().max(1) as u32;
                self.amendments.do_voting(&mut next, trusted);
            }

            let mut close_time = self.time_keeper.close_time();
            if let Some(delay) = consensus_delay {
                close_time = close_time + delay;
            }
            next.accept(close_time, true)?;
            let next = Arc::new(next);

            self.txq.process_closed_ledger(&next);
            self.amendments.sync(&next);
            ledgers.history.insert(next.seq(), next.clone());
            ledgers.closed = next.clone();
            ledgers.open = OpenView::new_open(next.clone(), open_rules(&config, &next));
            (next, previous)
        };
        info!(
            "Accepted ledger {} with {} transactions, closed at {}",
            next.seq(),
            next.txs().len(),
            next.info().close_time
        );

        self.store_ledger(&next, Some(&previous))?;
        let complete = self.complete_ledgers();
        self.subscriptions.publish_ledger(&next, &complete);
        for entry in next.txs().values() {
            self.subscriptions.publish_transaction(&next, entry);
        }
        Ok(next)
    }

    // Writes the header, the transactions and the state entries that differ
    // from `previous`
    fn store_ledger(&self, ledger: &Ledger, previous: Option<&Ledger>) -> Result<(), ApplicationError> {
        let mut batch = Vec::new();
        batch.push(NodeObject::new(
            NodeObjectType::Ledger,
            ledger.info().hash,
            serde_json::to_vec(&ledger.info().to_json())?,
        ));
        for (id, entry) in ledger.txs() {
            batch.push(NodeObject::new(NodeObjectType::TransactionNode, *id, entry.tx.to_blob()));
        }
        for (key, entry) in ledger.state() {
            let unchanged = previous
                .and_then(|p| p.state().get(key))
                .is_some_and(|before| Arc::ptr_eq(before, entry));
            if unchanged {
                continue;
            }
            let data = bincode::serialize(entry.as_ref()).map_err(LedgerError::from)?;
            batch.push(NodeObject::new(NodeObjectType::AccountNode, *key, data));
        }
        debug!("Storing {} objects for ledger {}", batch.len(), ledger.seq());
        self.node_store.lock().store_batch(&batch)?;
        Ok(())
    }

    /// Read an object back from the node store.
    pub fn fetch_node(&self, hash: &Hash256) -> Result<Option<Arc<NodeObject>>, ApplicationError> {
        Ok(self.node_store.lock().fetch(hash)?)
    }

    pub fn node_store_name(&self) -> String {
        self.node_store.lock().name()
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        if let Err(e) = self.node_store.get_mut().close() {
            warn!("Error while closing the node store: {}", e);
        }
    }
}
