// File: testing-framework/src/jtx/env.rs
//
// Test Environment
//
// One `Env` owns one application: its service thread, the manual clock the
// ledger closes by, a client talking to the service and the accounts the
// scenario created. Dropping the environment stops the service, also when
// the test panics.

use log::{debug, error, info};
use serde_json::{json, Value};
use std::{collections::HashMap, str::FromStr, sync::Arc, time::Duration};
use thiserror::Error;
use trackable_common::{
    amount::{Amount, Drops, IouAmount, Issue},
    crypto::{AccountId, Hash256},
    features::{FeatureId, FeatureSet},
    flags::asf,
    ter::Ter,
    time::NetTime,
    transaction::{Transaction, TxObject},
};
use trackable_daemon::{
    app::{Application, ApplicationError},
    config::Config,
    ledger::{
        keylet::{self, Keylet},
        Ledger, LedgerEntry, OpenView, ReadView, TxMeta,
    },
    rpc::{cmd_line::cmd_line_to_json_rpc, service::Service},
};

use super::{
    envconfig::envconfig,
    funclets::{self, pretty, sign},
    requires, Account, Funclet, JTx, Requirement,
};
use crate::{
    client::{AbstractClient, ClientError, JsonRpcClient, WsClient, REQUEST_ID},
    orchestrator::{ManualTimeKeeper, TestSuite},
};

/// Time `close()` moves the clock forward by.
pub const DEFAULT_CLOSE_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Unable to start the application: {0}")]
    Application(#[from] ApplicationError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("Unknown account {0}")]
    UnknownAccount(AccountId),
    #[error("Invalid account id '{0}'")]
    InvalidAccountId(String),
    #[error("Missing account root for {0}")]
    MissingAccountRoot(String),
}

/// Accounts a `fund` call creates, and whether each gets DefaultTrackable.
pub trait Fundable {
    fn fund_targets(&self) -> Vec<(Account, bool)>;
}

impl Fundable for &Account {
    fn fund_targets(&self) -> Vec<(Account, bool)> {
        vec![((*self).clone(), true)]
    }
}

impl<const N: usize> Fundable for [&Account; N] {
    fn fund_targets(&self) -> Vec<(Account, bool)> {
        self.iter().map(|a| ((*a).clone(), true)).collect()
    }
}

impl<const N: usize> Fundable for &[&Account; N] {
    fn fund_targets(&self) -> Vec<(Account, bool)> {
        self.iter().map(|a| ((*a).clone(), true)).collect()
    }
}

impl Fundable for &[&Account] {
    fn fund_targets(&self) -> Vec<(Account, bool)> {
        self.iter().map(|a| ((*a).clone(), true)).collect()
    }
}

/// Accounts funded without DefaultTrackable.
pub struct NoTrackable(Vec<Account>);

impl Fundable for NoTrackable {
    fn fund_targets(&self) -> Vec<(Account, bool)> {
        self.0.iter().map(|a| (a.clone(), false)).collect()
    }
}

/// Fund `accounts` without setting DefaultTrackable on them.
pub fn notrackable(accounts: &[&Account]) -> NoTrackable {
    NoTrackable(accounts.iter().map(|a| (*a).clone()).collect())
}

/// Test environment around one application instance.
///
/// # Example
///
/// ```ignore
/// let mut env = Env::new();
/// let alice = Account::new("alice");
/// env.fund(xrp(10_000), &alice);
/// env.apply(noop(&alice), &[fee(20)]);
/// env.close();
/// ```
pub struct Env {
    service: Service,
    time_keeper: Arc<ManualTimeKeeper>,
    client: Box<dyn AbstractClient>,
    master: Account,
    accounts: HashMap<AccountId, Account>,
    txid: Hash256,
    last: (Ter, bool),
    trace: i32,
    suite: TestSuite,
}

impl Env {
    /// Environment on `config` with exactly `features` enabled.
    pub fn try_new(mut config: Config, features: FeatureSet) -> Result<Self, EnvError> {
        config.features = features;
        let time_keeper = Arc::new(ManualTimeKeeper::default());
        let service = Service::start(config, time_keeper.clone())?;
        time_keeper.set(service.app().closed().info().close_time);
        let client = JsonRpcClient::new(service.handle(), 2)?;

        let name = std::thread::current().name().unwrap_or("env").to_owned();
        let mut env = Self {
            service,
            time_keeper,
            client: Box::new(client),
            master: Account::master(),
            accounts: HashMap::new(),
            txid: Hash256::default(),
            last: (Ter::tesSUCCESS, true),
            trace: 0,
            suite: TestSuite::new(name),
        };
        let master = env.master.clone();
        env.memoize(&master);
        debug!("Environment ready at ledger {}", env.closed().seq());
        Ok(env)
    }

    /// Environment on the unit test configuration with every supported
    /// amendment enabled.
    pub fn new() -> Self {
        Self::with_config_and_features(envconfig(), FeatureSet::all_supported())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_config_and_features(config, FeatureSet::all_supported())
    }

    pub fn with_features(features: FeatureSet) -> Self {
        Self::with_config_and_features(envconfig(), features)
    }

    /// # Panics
    ///
    /// When the application does not start.
    pub fn with_config_and_features(config: Config, features: FeatureSet) -> Self {
        match Self::try_new(config, features) {
            Ok(env) => env,
            Err(e) => panic!("Env setup failed: {}", e),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn app(&self) -> &Arc<Application> {
        self.service.app()
    }

    pub fn client(&self) -> &dyn AbstractClient {
        self.client.as_ref()
    }

    /// Open a websocket connection to the application.
    pub fn ws_client(&self, version: u32) -> Result<WsClient, ClientError> {
        WsClient::new(self.service.handle(), version)
    }

    /// Open another request/response connection to the application.
    pub fn json_rpc_client(&self, version: u32) -> Result<JsonRpcClient, ClientError> {
        JsonRpcClient::new(self.service.handle(), version)
    }

    pub fn master(&self) -> &Account {
        &self.master
    }

    pub fn timekeeper(&self) -> &ManualTimeKeeper {
        &self.time_keeper
    }

    pub fn suite(&self) -> &TestSuite {
        &self.suite
    }

    /// Network time of the manual clock.
    pub fn now(&self) -> NetTime {
        use trackable_daemon::time_keeper::TimeKeeper;
        self.time_keeper.now()
    }

    /// Result of the last submission.
    pub fn ter(&self) -> Ter {
        self.last.0
    }

    /// Whether the last submission was applied.
    pub fn applied(&self) -> bool {
        self.last.1
    }

    /// Id of the last transaction submitted.
    pub fn txid(&self) -> Hash256 {
        self.txid
    }

    /// Snapshot of the open ledger.
    pub fn current(&self) -> OpenView<'static> {
        self.app().current()
    }

    pub fn with_current<R>(&self, f: impl FnOnce(&OpenView<'static>) -> R) -> R {
        self.app().with_current(f)
    }

    /// Last closed ledger.
    pub fn closed(&self) -> Arc<Ledger> {
        self.app().closed()
    }

    /// Base fee of the open ledger.
    pub fn base_fee(&self) -> Drops {
        self.with_current(|view| view.fees().base)
    }

    // ------------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------------

    /// Remember `account` so it can be looked up by id.
    pub fn memoize(&mut self, account: &Account) {
        self.accounts.entry(account.id()).or_insert_with(|| account.clone());
    }

    pub fn lookup(&self, id: &AccountId) -> Result<&Account, EnvError> {
        self.accounts.get(id).ok_or(EnvError::UnknownAccount(*id))
    }

    pub fn lookup_base58(&self, id: &str) -> Result<&Account, EnvError> {
        let id = AccountId::from_base58(id).map_err(|_| EnvError::InvalidAccountId(id.to_owned()))?;
        self.lookup(&id)
    }

    /// Account root of `account` in the open ledger.
    pub fn le(&self, account: &Account) -> Option<Arc<LedgerEntry>> {
        self.le_keylet(&keylet::account(&account.id()))
    }

    pub fn le_keylet(&self, keylet: &Keylet) -> Option<Arc<LedgerEntry>> {
        self.with_current(|view| view.read_keylet(keylet))
    }

    /// Native balance of `account`, zero when it does not exist.
    pub fn balance(&self, account: &Account) -> Amount {
        self.le(account)
            .as_deref()
            .and_then(LedgerEntry::as_account_root)
            .map(|root| Amount::Native(root.balance))
            .unwrap_or_else(|| Amount::native(0))
    }

    /// Balance of `account` in `issue`, as seen by `account`. Zero when
    /// there is no trust line.
    pub fn balance_of(&self, account: &Account, issue: &Issue) -> Amount {
        if issue.is_native() {
            return self.balance(account);
        }
        let line = self.le_keylet(&keylet::line(&account.id(), &issue.account, &issue.currency));
        let value = line
            .as_deref()
            .and_then(LedgerEntry::as_ripple_state)
            .map(|line| line.balance_for(&account.id()))
            .unwrap_or_else(IouAmount::zero);
        Amount::iou(value, *issue)
    }

    /// Sequence of `account` in the open ledger.
    pub fn seq(&self, account: &Account) -> Result<u32, EnvError> {
        self.le(account)
            .as_deref()
            .and_then(LedgerEntry::as_account_root)
            .map(|root| root.sequence)
            .ok_or_else(|| EnvError::MissingAccountRoot(account.to_string()))
    }

    // ------------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------------

    /// Close the open ledger at `close_time`. With a consensus delay the
    /// ledger is accepted directly, otherwise through `ledger_accept`.
    /// Returns whether a ledger was accepted.
    pub fn close_at(&mut self, close_time: NetTime, consensus_delay: Option<Duration>) -> bool {
        // Round up to the next distinguishable close time
        let resolution = u64::from(self.closed().info().close_time_resolution);
        self.time_keeper
            .set(close_time + Duration::from_secs(resolution) - Duration::from_secs(1));

        let accepted = match consensus_delay {
            Some(delay) => match self.app().accept_ledger(Some(delay)) {
                Ok(_) => true,
                Err(e) => {
                    error!("Unable to accept ledger: {}", e);
                    false
                }
            },
            None => {
                let jr = self.rpc(&["ledger_accept"]);
                if jr["result"]["status"] == "success" {
                    true
                } else {
                    error!(
                        "Env::close() failed: {}",
                        jr["result"]["error_message"]
                            .as_str()
                            .or_else(|| jr["result"]["error"].as_str())
                            .unwrap_or("unknown error")
                    );
                    false
                }
            }
        };
        let close_time = self.closed().info().close_time;
        self.time_keeper.set(close_time);
        accepted
    }

    /// Close the open ledger five seconds from now.
    pub fn close(&mut self) -> bool {
        let close_time = self.now() + DEFAULT_CLOSE_INTERVAL;
        self.close_at(close_time, None)
    }

    /// Treat `feature` as enabled from the open ledger on.
    pub fn enable_feature(&self, feature: FeatureId) {
        self.app().enable_feature(feature);
    }

    /// Apply transactions without checking their signatures.
    pub fn disable_sigs(&self) {
        self.app().set_check_sigs(false);
    }

    /// Log the next `count` submissions, or all of them when negative.
    pub fn trace(&mut self, count: i32) {
        self.trace = count;
    }

    pub fn notrace(&mut self) {
        self.trace = 0;
    }

    /// Metadata of the last transaction. Closes the open ledger first.
    pub fn meta(&mut self) -> Option<Arc<TxMeta>> {
        self.close();
        self.closed().tx_read(&self.txid).and_then(|entry| entry.meta)
    }

    /// The last transaction, from the open ledger.
    pub fn tx(&self) -> Option<Arc<Transaction>> {
        let txid = self.txid;
        self.with_current(|view| view.tx_read(&txid)).map(|entry| entry.tx)
    }

    // ------------------------------------------------------------------------
    // RPC
    // ------------------------------------------------------------------------

    /// Run a command given as command line words, e.g.
    /// `env.rpc(&["submit", &blob])`.
    pub fn rpc(&self, args: &[&str]) -> Value {
        let mut jv = cmd_line_to_json_rpc(args);
        if jv.get("jsonrpc").is_none() {
            jv["jsonrpc"] = json!("2.0");
            jv["trackablerpc"] = json!("2.0");
            jv["id"] = json!(REQUEST_ID);
        }
        let method = jv["method"].as_str().unwrap_or_default().to_owned();
        let params = jv["params"][0].clone();
        let mut response = self.client.invoke(&method, &params);

        for field in ["jsonrpc", "trackablerpc", "id"] {
            response[field] = jv[field].clone();
        }
        if params.get("error").is_some() && response.get("error").is_none() {
            response["client_error"] = params;
        }
        response
    }

    // ------------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------------

    /// Build a transaction from a template: apply the JSON funclets,
    /// autofill fee, sequence and signature, then parse.
    pub fn jt(&self, jv: Value, funclets: &[Funclet]) -> JTx {
        let mut jt = JTx::new(jv);
        for funclet in funclets {
            if let Funclet::WithJson(f) = funclet {
                f(self, &mut jt);
            }
        }
        self.autofill(&mut jt);
        jt.stx = self.st(&jt);
        for funclet in funclets {
            if let Funclet::WithTx(f) = funclet {
                f(self, &jt);
            }
        }
        jt
    }

    /// The JSON `jt` would submit.
    pub fn json(&self, jv: Value, funclets: &[Funclet]) -> Value {
        self.jt(jv, funclets).jv
    }

    /// Build and submit a transaction.
    pub fn apply(&mut self, jv: Value, funclets: &[Funclet]) {
        let jt = self.jt(jv, funclets);
        self.submit(&jt);
    }

    /// Submit a built transaction as a signed blob.
    pub fn submit(&mut self, jt: &JTx) {
        let (ter, applied) = match &jt.stx {
            Some(stx) => {
                self.txid = stx.id();
                let blob = hex::encode_upper(stx.to_blob());
                let jr = self.rpc(&["submit", &blob]);
                Self::parse_result(&jr)
            }
            // The JSON did not make a valid transaction
            None => (Ter::temMALFORMED, false),
        };
        self.last = (ter, applied);
        self.postconditions(jt, ter, applied);
    }

    /// Submit the JSON of `jt` unsigned and let the server fill in fee,
    /// sequence and signature with the account's secret. Null `params` go
    /// through the command line form of `submit`.
    pub fn sign_and_submit(&mut self, jt: &JTx, params: Value) -> Result<(), EnvError> {
        let account = jt
            .account()
            .ok_or_else(|| EnvError::InvalidAccountId(String::new()))?;
        let passphrase = self.lookup_base58(account)?.passphrase().to_owned();

        let jr = if params.is_null() {
            let tx_json = jt.jv.to_string();
            self.rpc(&["submit", &passphrase, &tx_json])
        } else {
            let mut params = params;
            let has_secret = ["secret", "key_type", "seed", "seed_hex", "passphrase"]
                .iter()
                .any(|field| params.get(field).is_some());
            if !has_secret {
                params["secret"] = json!(passphrase);
            }
            params["tx_json"] = jt.jv.clone();
            self.client.invoke("submit", &params)
        };

        self.txid = jr["result"]["tx_json"]["hash"]
            .as_str()
            .and_then(|hash| Hash256::from_str(hash).ok())
            .unwrap_or_default();
        let (ter, applied) = Self::parse_result(&jr);
        self.last = (ter, applied);
        self.postconditions(jt, ter, applied);
        Ok(())
    }

    /// Result code of a `submit` response, and whether it applied. A
    /// response without a code is `temINVALID`. A code missing from the
    /// `Ter` table also reads as `temINVALID`, but whether it applied is
    /// decided on the raw code, so an unknown tec code still counts.
    pub fn parse_result(jr: &Value) -> (Ter, bool) {
        let Some(code) = jr
            .get("result")
            .and_then(|result| result.get("engine_result_code"))
            .and_then(Value::as_i64)
            .and_then(|code| i32::try_from(code).ok())
        else {
            return (Ter::temINVALID, false);
        };
        let applied = code == 0 || code >= 100;
        (Ter::from_code(code).unwrap_or(Ter::temINVALID), applied)
    }

    /// Check the result against the expected one, then run the
    /// requirements. Requirements are skipped after a mismatch.
    pub fn postconditions(&mut self, jt: &JTx, ter: Ter, applied: bool) {
        if let Some(expected) = jt.ter {
            let matched = self.suite.expect(
                ter == expected,
                format!(
                    "apply: {} ({}) != {} ({})",
                    ter.token(),
                    ter.human(),
                    expected.token(),
                    expected.human()
                ),
            );
            if !matched {
                info!("{}", pretty(&jt.jv));
                return;
            }
        }
        if self.trace != 0 {
            if self.trace > 0 {
                self.trace -= 1;
            }
            info!("{} (applied: {})\n{}", ter.token(), applied, pretty(&jt.jv));
        }
        self.require(jt.requires.iter().cloned());
    }

    /// Check `requirements`. Each failing one is recorded on its own.
    pub fn require(&self, requirements: impl IntoIterator<Item = Requirement>) {
        for requirement in requirements {
            match requirement(self) {
                Ok(()) => self.suite.pass(),
                Err(e) => self.suite.fail(e.to_string()),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Funding
    // ------------------------------------------------------------------------

    /// Create each account with exactly `amount`. Accounts get
    /// DefaultTrackable unless wrapped in `notrackable`.
    pub fn fund(&mut self, amount: Amount, accounts: impl Fundable) {
        for (account, default_trackable) in accounts.fund_targets() {
            self.memoize(&account);
            let master = self.master.clone();
            if default_trackable {
                let base = Amount::Native(self.base_fee());
                let total = match amount.checked_add(&base) {
                    Ok(total) => total,
                    Err(e) => panic!("fund: {} is not a native amount: {}", amount, e),
                };
                self.apply(funclets::pay(&master, &account, total), &[]);
                self.apply(funclets::fset(&account, asf::DEFAULT_TRACKABLE), &[]);
                self.require([requires::flags(&account, &[asf::DEFAULT_TRACKABLE])]);
            } else {
                self.apply(funclets::pay(&master, &account, amount), &[]);
                self.require([requires::nflags(&account, &[asf::DEFAULT_TRACKABLE])]);
            }
            self.require([requires::balance(&account, amount)]);
        }
    }

    /// Extend a trust line of `limit` from each account, refunding the fee
    /// so the native balance is unchanged.
    pub fn trust(&mut self, limit: Amount, accounts: &[&Account]) {
        let master = self.master.clone();
        for account in accounts {
            let start = self.balance(account);
            self.apply(funclets::trust(account, limit), &[]);
            let base = Amount::Native(self.base_fee());
            self.apply(funclets::pay(&master, account, base), &[]);
            let end = self.balance(account);
            self.suite.expect(
                end == start,
                format!("trust: balance of {} changed from {} to {}", account, start, end),
            );
        }
    }

    // ------------------------------------------------------------------------
    // Autofill
    // ------------------------------------------------------------------------

    fn autofill(&self, jt: &mut JTx) {
        let account = jt.account().and_then(|a| AccountId::from_base58(a).ok());
        if jt.fill_fee && jt.jv.get("Fee").is_none() {
            let fee = self.with_current(|view| self.app().txq().open_ledger_fee(view));
            jt.jv["Fee"] = Amount::Native(fee).to_json();
        }
        if jt.fill_seq && jt.jv.get("Sequence").is_none() {
            let root = account.and_then(|id| self.le_keylet(&keylet::account(&id)));
            if let Some(root) = root.as_deref().and_then(LedgerEntry::as_account_root) {
                jt.jv["Sequence"] = json!(root.sequence);
            }
        }
        // Signing covers every other field, so it comes last
        self.autofill_sig(jt, account);
    }

    fn autofill_sig(&self, jt: &mut JTx, account: Option<AccountId>) {
        if let Some(signer) = jt.signer.clone() {
            return signer(self, jt);
        }
        if !jt.fill_sig {
            return;
        }
        let Some(id) = account else {
            return;
        };
        let account = match self.lookup(&id) {
            Ok(account) => account.clone(),
            Err(e) => panic!("autofill signature: {}", e),
        };
        if !self.app().check_sigs() {
            jt.jv["SigningPubKey"] = json!(account.public_key().to_hex());
            // A placeholder keeps the transaction well formed
            jt.jv["TxnSignature"] = json!("00");
            return;
        }
        let regular_key = self
            .le(&account)
            .as_deref()
            .and_then(LedgerEntry::as_account_root)
            .and_then(|root| root.regular_key);
        match regular_key {
            Some(key) => match self.lookup(&key) {
                Ok(signer) => sign(&mut jt.jv, signer),
                Err(e) => panic!("autofill signature with regular key: {}", e),
            },
            None => sign(&mut jt.jv, &account),
        }
    }

    // The JSON was built here, so a parse failure is a bug in the scenario
    fn st(&self, jt: &JTx) -> Option<Arc<Transaction>> {
        let object = match TxObject::from_json(&jt.jv) {
            Ok(object) => object,
            Err(e) => {
                error!("parse failed:\n{}", pretty(&jt.jv));
                panic!("Unable to parse transaction JSON: {}", e);
            }
        };
        match Transaction::from_object(object) {
            Ok(tx) => Some(Arc::new(tx)),
            Err(e) => {
                debug!("Not a valid transaction: {}", e);
                None
            }
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Env {
    fn drop(&mut self) {
        // Queued requests finish before the stop signal
        if let Err(e) = self.service.rendezvous() {
            debug!("Service gone before teardown: {}", e);
        }
        self.service.stop();
    }
}
