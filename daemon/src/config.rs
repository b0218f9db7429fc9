//! Daemon configuration.
//!
//! Every section has serde defaults so a partial YAML document is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use trackable_common::{
    config::{
        DEFAULT_ACCOUNT_RESERVE, DEFAULT_ESCALATION_MULTIPLIER, DEFAULT_OWNER_RESERVE,
        DEFAULT_REFERENCE_FEE,
    },
    features::FeatureSet,
};

// Fee units charged by a reference transaction
pub const REFERENCE_FEE_UNITS: u64 = 10;

// Transactions per ledger before fees escalate, per mode
pub const DEFAULT_MINIMUM_TXN_IN_LEDGER: u32 = 5;
pub const DEFAULT_MINIMUM_TXN_IN_LEDGER_STANDALONE: u32 = 1000;

const fn default_reference_fee() -> i64 {
    DEFAULT_REFERENCE_FEE
}

const fn default_account_reserve() -> i64 {
    DEFAULT_ACCOUNT_RESERVE
}

const fn default_owner_reserve() -> i64 {
    DEFAULT_OWNER_RESERVE
}

const fn default_minimum_txn_in_ledger() -> u32 {
    DEFAULT_MINIMUM_TXN_IN_LEDGER
}

const fn default_minimum_txn_in_ledger_standalone() -> u32 {
    DEFAULT_MINIMUM_TXN_IN_LEDGER_STANDALONE
}

const fn default_minimum_escalation_multiplier() -> u64 {
    DEFAULT_ESCALATION_MULTIPLIER
}

const fn default_true() -> bool {
    true
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for '{0}': {1}")]
    InvalidValue(&'static str, String),
}

/// Fee schedule applied to the genesis ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeeSetup {
    /// Drops charged for a reference transaction.
    #[serde(default = "default_reference_fee")]
    pub reference_fee: i64,
    /// Drops an account must hold to exist.
    #[serde(default = "default_account_reserve")]
    pub account_reserve: i64,
    /// Additional drops per owned ledger object.
    #[serde(default = "default_owner_reserve")]
    pub owner_reserve: i64,
}

impl Default for FeeSetup {
    fn default() -> Self {
        Self {
            reference_fee: DEFAULT_REFERENCE_FEE,
            account_reserve: DEFAULT_ACCOUNT_RESERVE,
            owner_reserve: DEFAULT_OWNER_RESERVE,
        }
    }
}

/// Open ledger fee escalation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxQConfig {
    #[serde(default = "default_minimum_txn_in_ledger")]
    pub minimum_txn_in_ledger: u32,
    #[serde(default = "default_minimum_txn_in_ledger_standalone")]
    pub minimum_txn_in_ledger_standalone: u32,
    /// Escalation multiplier used until a ledger with enough transactions
    /// has closed.
    #[serde(default = "default_minimum_escalation_multiplier")]
    pub minimum_escalation_multiplier: u64,
}

impl Default for TxQConfig {
    fn default() -> Self {
        Self {
            minimum_txn_in_ledger: DEFAULT_MINIMUM_TXN_IN_LEDGER,
            minimum_txn_in_ledger_standalone: DEFAULT_MINIMUM_TXN_IN_LEDGER_STANDALONE,
            minimum_escalation_multiplier: DEFAULT_ESCALATION_MULTIPLIER,
        }
    }
}

/// Node store backend selection, mirroring a `[node_db]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Section {
    #[serde(rename = "type", default)]
    pub backend: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Section {
    pub fn new(backend: &str, path: Option<PathBuf>) -> Self {
        Self {
            backend: backend.to_string(),
            path,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fees: FeeSetup,
    #[serde(default)]
    pub transaction_queue: TxQConfig,
    #[serde(default)]
    pub node_db: Section,
    /// Amendments treated as enabled regardless of ledger state.
    #[serde(default)]
    pub features: FeatureSet,
    /// Seed of the validation key. Enables validator mode.
    #[serde(default)]
    pub validation_seed: Option<String>,
    #[serde(default)]
    pub validator_list_sites: Vec<String>,
    #[serde(default)]
    pub validator_list_keys: Vec<String>,
    #[serde(default)]
    pub validators: Vec<String>,
    /// Whether callers on the JSON-RPC transport have admin rights.
    #[serde(default = "default_true")]
    pub rpc_admin: bool,
    /// Whether callers on the websocket transport have admin rights.
    #[serde(default = "default_true")]
    pub ws_admin: bool,
    #[serde(default = "default_true")]
    pub standalone: bool,
    /// Verify transaction signatures on apply.
    #[serde(default = "default_true")]
    pub check_signatures: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fees: FeeSetup::default(),
            transaction_queue: TxQConfig::default(),
            node_db: Section::new("memory", None),
            features: FeatureSet::new(),
            validation_seed: None,
            validator_list_sites: Vec::new(),
            validator_list_keys: Vec::new(),
            validators: Vec::new(),
            rpc_admin: true,
            ws_admin: true,
            standalone: true,
            check_signatures: true,
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fees.reference_fee <= 0 {
            return Err(ConfigError::InvalidValue(
                "fees.reference_fee",
                self.fees.reference_fee.to_string(),
            ));
        }
        if self.transaction_queue.minimum_txn_in_ledger_standalone == 0 {
            return Err(ConfigError::InvalidValue(
                "transaction_queue.minimum_txn_in_ledger_standalone",
                "0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_validator(&self) -> bool {
        self.validation_seed.is_some()
    }

    /// Target number of transactions per ledger before fees escalate.
    pub fn txns_expected(&self) -> u32 {
        if self.standalone {
            self.transaction_queue.minimum_txn_in_ledger_standalone
        } else {
            self.transaction_queue.minimum_txn_in_ledger
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.fees.reference_fee, 10);
        assert_eq!(config.txns_expected(), 1000);
        assert!(config.rpc_admin);
        assert!(!config.is_validator());
        assert_eq!(config.node_db.backend, "memory");
    }

    #[test]
    fn test_partial_yaml() {
        let config = Config::from_yaml_str(
            r#"
transaction_queue:
  minimum_txn_in_ledger_standalone: 3
node_db:
  type: sled
  path: /tmp/db
rpc_admin: false
"#,
        )
        .unwrap();
        assert_eq!(config.txns_expected(), 3);
        assert_eq!(config.transaction_queue.minimum_escalation_multiplier, 128_000);
        assert_eq!(config.node_db.backend, "sled");
        assert!(!config.rpc_admin);
        assert!(config.ws_admin);
        assert_eq!(config.fees, FeeSetup::default());
    }

    #[test]
    fn test_rejects_zero_fee() {
        let result = Config::from_yaml_str("fees:\n  reference_fee: 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue(..))));
    }
}
