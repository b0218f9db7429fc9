// File: testing-framework/src/client/json_rpc.rs
//
// Request/response client, one JSON document per call, as an HTTP caller
// would send it.

use log::{debug, trace};
use serde_json::{Map, Value};
use trackable_daemon::rpc::{
    service::{RpcReply, ServiceHandle},
    Transport,
};

use super::{add_v2_fields, AbstractClient, ClientError};

pub struct JsonRpcClient {
    service: ServiceHandle,
    version: u32,
}

impl JsonRpcClient {
    /// Connect to the service. Fails when the service does not answer.
    pub fn new(service: ServiceHandle, version: u32) -> Result<Self, ClientError> {
        service.rendezvous().map_err(ClientError::ConnectionRefused)?;
        Ok(Self { service, version })
    }
}

impl AbstractClient for JsonRpcClient {
    fn invoke(&self, cmd: &str, params: &Value) -> Value {
        let mut request = Map::new();
        request.insert("method".into(), Value::from(cmd));
        if !params.is_null() {
            request.insert("params".into(), Value::Array(vec![params.clone()]));
        }
        if self.version == 2 {
            add_v2_fields(&mut request);
        }
        let body = Value::Object(request).to_string();
        trace!("json-rpc request: {}", body);

        let text = match self.service.call(body, Transport::Http, None) {
            Ok(RpcReply::Json(text)) => text,
            Ok(RpcReply::Forbidden) => {
                debug!("json-rpc {} forbidden", cmd);
                return Value::Null;
            }
            Err(e) => {
                debug!("json-rpc {} failed: {}", cmd, e);
                return Value::Null;
            }
        };
        let mut response: Value = match serde_json::from_str(&text) {
            Ok(response) => response,
            Err(e) => {
                debug!("json-rpc {} returned malformed JSON: {}", cmd, e);
                return Value::Null;
            }
        };

        for field in ["error", "status"] {
            if let Some(value) = response.get("result").and_then(|r| r.get(field)).cloned() {
                response[field] = value;
            }
        }
        response
    }

    fn version(&self) -> u32 {
        self.version
    }
}
