// Protocol constants shared by the daemon and the test harness

pub const VERSION: &str = env!("BUILD_VERSION");

// 6 decimals for the native currency
pub const DROPS_PER_UNIT: i64 = 1_000_000;
// 100 billion units exist at genesis, all owned by the master account
pub const SYSTEM_CURRENCY_START: i64 = 100_000_000_000 * DROPS_PER_UNIT;

// Default fee schedule
pub const DEFAULT_REFERENCE_FEE: i64 = 10;
pub const DEFAULT_ACCOUNT_RESERVE: i64 = 200 * DROPS_PER_UNIT;
pub const DEFAULT_OWNER_RESERVE: i64 = 50 * DROPS_PER_UNIT;

// Fee levels are expressed relative to the reference fee, which is level 256
pub const BASE_FEE_LEVEL: u64 = 256;
pub const DEFAULT_ESCALATION_MULTIPLIER: u64 = 500 * BASE_FEE_LEVEL;

// Rates are expressed in billionths
pub const QUALITY_ONE: u32 = 1_000_000_000;

pub const MAX_DOMAIN_LENGTH: usize = 256;

// Amendment voting happens on ledgers whose sequence is a multiple of this
pub const FLAG_LEDGER_INTERVAL: u32 = 256;

// Passphrase of the account holding the genesis supply
pub const MASTER_PASSPHRASE: &str = "masterpassphrase";

// Network clock epoch: 2000-01-01T00:00:00Z, in seconds since the unix epoch
pub const NETWORK_EPOCH_OFFSET: u64 = 946_684_800;
