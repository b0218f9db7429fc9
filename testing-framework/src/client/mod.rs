// File: testing-framework/src/client/mod.rs
//
// Client Channels
//
// Scenario code talks to the application the way an external caller would:
// JSON requests over an HTTP style or websocket style transport, answered
// by the in-process RPC service.

pub mod json_rpc;
pub mod ws;

pub use json_rpc::JsonRpcClient;
pub use ws::WsClient;

use serde_json::Value;
use thiserror::Error;
use trackable_daemon::app::ApplicationError;

/// Id sent with every version 2 request.
pub const REQUEST_ID: u64 = 5;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection refused: {0}")]
    ConnectionRefused(#[source] ApplicationError),
}

/// A transport to the RPC service.
///
/// `invoke` never fails: transport problems and responses that are not JSON
/// come back as `Value::Null`, RPC errors come back as JSON with `error`
/// and `status` set.
pub trait AbstractClient: Send + Sync {
    /// Run `cmd` with `params` (an object, or null for none).
    fn invoke(&self, cmd: &str, params: &Value) -> Value;

    /// Protocol version: 1, or 2 for `jsonrpc`/`trackablerpc` envelopes.
    fn version(&self) -> u32;
}

// Fields a version 2 request carries beside the method and params
pub(crate) fn add_v2_fields(request: &mut serde_json::Map<String, Value>) {
    request.insert("jsonrpc".into(), Value::from("2.0"));
    request.insert("trackablerpc".into(), Value::from("2.0"));
    request.insert("id".into(), Value::from(REQUEST_ID));
}
