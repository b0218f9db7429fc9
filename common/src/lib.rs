#![allow(clippy::module_inception)]
#![allow(clippy::upper_case_acronyms)]

pub mod amount;
pub mod config;
pub mod crypto;
pub mod features;
pub mod flags;
pub mod rpc;
pub mod serializer;
pub mod ter;
pub mod time;
pub mod transaction;
