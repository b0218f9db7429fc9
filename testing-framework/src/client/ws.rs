// File: testing-framework/src/client/ws.rs
//
// Websocket style client. Commands are answered like requests, and the
// connection also receives the stream messages it subscribed to.

use log::{debug, trace};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    time::{Duration, Instant},
};
use trackable_daemon::rpc::{
    service::{RpcReply, ServiceHandle},
    subscriptions::SubscriberId,
    Transport,
};

use super::{add_v2_fields, AbstractClient, ClientError};

pub struct WsClient {
    service: ServiceHandle,
    connection: SubscriberId,
    messages: Mutex<Receiver<Value>>,
    version: u32,
}

impl WsClient {
    /// Open a connection. Fails when the service does not answer.
    pub fn new(service: ServiceHandle, version: u32) -> Result<Self, ClientError> {
        let (sink, messages) = mpsc::channel();
        let connection = service.connect(sink).map_err(ClientError::ConnectionRefused)?;
        debug!("Websocket client connected as {}", connection);
        Ok(Self {
            service,
            connection,
            messages: Mutex::new(messages),
            version,
        })
    }

    /// Next pushed message, or None once `timeout` passes without one.
    pub fn get_msg(&self, timeout: Duration) -> Option<Value> {
        match self.messages.lock().recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// First pushed message matching `pred` within `timeout`. Messages that
    /// do not match are discarded.
    pub fn find_msg(&self, timeout: Duration, pred: impl Fn(&Value) -> bool) -> Option<Value> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let message = self.get_msg(remaining)?;
            if pred(&message) {
                return Some(message);
            }
            trace!("Skipping websocket message: {}", message);
        }
    }
}

impl AbstractClient for WsClient {
    fn invoke(&self, cmd: &str, params: &Value) -> Value {
        let mut request = match params {
            Value::Object(fields) => fields.clone(),
            _ => Map::new(),
        };
        request.insert("command".into(), Value::from(cmd));
        if self.version == 2 {
            add_v2_fields(&mut request);
        }

        let reply = self.service.call(
            Value::Object(request).to_string(),
            Transport::Ws,
            Some(self.connection),
        );
        let text = match reply {
            Ok(RpcReply::Json(text)) => text,
            Ok(RpcReply::Forbidden) => return Value::Null,
            Err(e) => {
                debug!("websocket {} failed: {}", cmd, e);
                return Value::Null;
            }
        };
        let Ok(Value::Object(mut response)) = serde_json::from_str::<Value>(&text) else {
            return Value::Null;
        };

        // Reshape into the request/response form callers expect: the result
        // object, with errors and status copied beside it
        response.remove("type");
        if response.contains_key("error") {
            let error = response.get("error").cloned().unwrap_or(Value::Null);
            return json!({
                "result": Value::Object(response),
                "error": error,
                "status": "error",
            });
        }
        let status = response.get("status").cloned();
        let mut result = response.remove("result").unwrap_or_else(|| json!({}));
        if let (Some(status), Some(fields)) = (status.clone(), result.as_object_mut()) {
            fields.insert("status".into(), status);
        }
        let mut normalized = json!({ "result": result });
        if let Some(status) = status {
            normalized["status"] = status;
        }
        normalized
    }

    fn version(&self) -> u32 {
        self.version
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        if let Err(e) = self.service.disconnect(self.connection) {
            debug!("Websocket disconnect after service stop: {}", e);
        }
    }
}
