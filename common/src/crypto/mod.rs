mod account_id;
mod hash;
mod keys;
mod tokens;

pub mod error;

pub use account_id::*;
pub use error::CryptoError;
pub use hash::*;
pub use keys::*;
pub use tokens::*;
