// Trackable daemon library
// Ledger state, transaction engine, node store and the RPC service the test
// harness drives in-process

#![allow(clippy::type_complexity)]
#![allow(clippy::uninlined_format_args)]

extern crate log;

pub mod amendments;
pub mod app;
pub mod config;
pub mod ledger;
pub mod nodestore;
pub mod rpc;
pub mod time_keeper;
pub mod tx;
pub mod txq;
pub mod validators;
