mod error;

pub use error::*;

/// Version of the JSON-RPC envelope used by the command line mapping.
pub const JSON_RPC_VERSION: &str = "2.0";

/// Numeric API version reported by clients.
pub const API_VERSION: u32 = 1;
