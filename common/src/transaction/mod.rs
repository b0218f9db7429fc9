mod error;
mod field;
mod object;
mod tx;
mod tx_type;

pub use error::*;
pub use field::*;
pub use object::*;
pub use tx::*;
pub use tx_type::*;
