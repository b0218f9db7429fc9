//! Command handlers and the in-process service answering them.

pub mod account;
pub mod cmd_line;
pub mod context;
pub mod feature;
pub mod handler;
pub mod ledger;
pub mod lookup;
pub mod notrackable;
pub mod service;
pub mod submit;
pub mod subscribe;
pub mod subscriptions;
pub mod transaction;

use std::sync::Arc;
use trackable_common::rpc::RpcError;

use crate::{app::Application, async_handler};
use context::Context;
use handler::RpcHandler;
use subscriptions::SubscriberId;

/// Privilege of a caller, decided by the transport's admin setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    Ws,
}

/// The websocket connection a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection(pub SubscriberId);

pub(crate) fn application(context: &Context) -> Result<&Arc<Application>, RpcError> {
    context.get::<Arc<Application>>()
}

pub fn register_methods(handler: &mut RpcHandler) {
    handler.register_method("account_info", async_handler!(account::account_info));
    handler.register_method("ledger_closed", async_handler!(ledger::ledger_closed));
    handler.register_method("ledger_current", async_handler!(ledger::ledger_current));
    handler.register_method("notrackable_check", async_handler!(notrackable::notrackable_check));
    handler.register_method("server_info", async_handler!(ledger::server_info));
    handler.register_method("submit", async_handler!(submit::submit));
    handler.register_method("subscribe", async_handler!(subscribe::subscribe));
    handler.register_method("transaction_entry", async_handler!(transaction::transaction_entry));
    handler.register_method("tx", async_handler!(transaction::tx));
    handler.register_method("unsubscribe", async_handler!(subscribe::unsubscribe));

    handler.register_admin_method("feature", async_handler!(feature::feature));
    handler.register_admin_method("ledger_accept", async_handler!(ledger::ledger_accept));
}
