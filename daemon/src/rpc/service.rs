use log::{debug, error, info, trace};
use serde_json::{json, Map, Value};
use std::{
    sync::{mpsc::Sender as SyncSender, Arc},
    thread::JoinHandle,
};
use tokio::{
    runtime::{Builder, Handle, Runtime},
    select,
    sync::{mpsc, oneshot},
};
use trackable_common::rpc::{RpcError, RpcErrorCode};

use super::{
    context::Context,
    handler::{Dispatch, RpcHandler},
    register_methods,
    subscriptions::SubscriberId,
    Connection, Role, Transport,
};
use crate::{
    app::{Application, ApplicationError},
    config::Config,
    time_keeper::TimeKeeper,
};

const REQUEST_QUEUE_SIZE: usize = 64;

/// What a transport gets back for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcReply {
    /// A serialized JSON response.
    Json(String),
    /// The caller may not run the command. No JSON body is produced.
    Forbidden,
}

enum ServiceRequest {
    Rpc {
        body: String,
        transport: Transport,
        connection: Option<SubscriberId>,
        reply: oneshot::Sender<RpcReply>,
    },
    Connect {
        sink: SyncSender<Value>,
        reply: oneshot::Sender<SubscriberId>,
    },
    Disconnect(SubscriberId),
    Rendezvous(oneshot::Sender<()>),
}

/// Owner of the application, its runtime and the thread answering
/// requests. Dropping it stops everything.
pub struct Service {
    app: Arc<Application>,
    handle: ServiceHandle,
    runtime: Option<Runtime>,
    stop: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Service {
    pub fn start(config: Config, time_keeper: Arc<dyn TimeKeeper>) -> Result<Self, ApplicationError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("trackable-worker")
            .enable_all()
            .build()?;
        let app = Application::new(config, time_keeper, runtime.handle().clone())?;
        app.start();

        let mut handler = RpcHandler::new();
        register_methods(&mut handler);

        let (sender, receiver) = mpsc::channel(REQUEST_QUEUE_SIZE);
        let (stop_sender, stop_receiver) = oneshot::channel();
        let thread = {
            let app = app.clone();
            let runtime = runtime.handle().clone();
            std::thread::Builder::new()
                .name("trackable-rpc".into())
                .spawn(move || runtime.block_on(run(app, handler, receiver, stop_receiver)))?
        };
        info!("RPC service started");

        Ok(Self {
            app,
            handle: ServiceHandle { sender },
            runtime: Some(runtime),
            stop: Some(stop_sender),
            thread: Some(thread),
        })
    }

    pub fn app(&self) -> &Arc<Application> {
        &self.app
    }

    pub fn handle(&self) -> ServiceHandle {
        self.handle.clone()
    }

    pub fn runtime(&self) -> Handle {
        self.app.runtime().clone()
    }

    /// Wait until every request queued so far has been answered.
    pub fn rendezvous(&self) -> Result<(), ApplicationError> {
        self.handle.rendezvous()
    }

    pub fn stop(&mut self) {
        let Some(stop) = self.stop.take() else {
            return;
        };
        if let Err(e) = self.handle.rendezvous() {
            debug!("Service already gone before stopping: {}", e);
        }
        // The loop may have ended on its own
        let _ = stop.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("RPC service thread panicked");
            }
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
        info!("RPC service stopped");
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cloneable entry point to the service for synchronous callers. The
/// methods block, so they must not be called from inside the runtime.
#[derive(Clone)]
pub struct ServiceHandle {
    sender: mpsc::Sender<ServiceRequest>,
}

impl ServiceHandle {
    fn send(&self, request: ServiceRequest) -> Result<(), ApplicationError> {
        self.sender
            .blocking_send(request)
            .map_err(|_| ApplicationError::ServiceStopped)
    }

    /// Run one JSON request as it arrived on `transport`.
    pub fn call(
        &self,
        body: String,
        transport: Transport,
        connection: Option<SubscriberId>,
    ) -> Result<RpcReply, ApplicationError> {
        let (reply, receiver) = oneshot::channel();
        self.send(ServiceRequest::Rpc {
            body,
            transport,
            connection,
            reply,
        })?;
        receiver
            .blocking_recv()
            .map_err(|_| ApplicationError::ServiceStopped)
    }

    /// Register a websocket connection. Stream messages go to `sink`.
    pub fn connect(&self, sink: SyncSender<Value>) -> Result<SubscriberId, ApplicationError> {
        let (reply, receiver) = oneshot::channel();
        self.send(ServiceRequest::Connect { sink, reply })?;
        receiver
            .blocking_recv()
            .map_err(|_| ApplicationError::ServiceStopped)
    }

    pub fn disconnect(&self, id: SubscriberId) -> Result<(), ApplicationError> {
        self.send(ServiceRequest::Disconnect(id))
    }

    pub fn rendezvous(&self) -> Result<(), ApplicationError> {
        let (reply, receiver) = oneshot::channel();
        self.send(ServiceRequest::Rendezvous(reply))?;
        receiver
            .blocking_recv()
            .map_err(|_| ApplicationError::ServiceStopped)
    }
}

async fn run(
    app: Arc<Application>,
    handler: RpcHandler,
    mut requests: mpsc::Receiver<ServiceRequest>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        select! {
            _ = &mut stop => break,
            request = requests.recv() => match request {
                Some(request) => process(&app, &handler, request).await,
                None => break,
            },
        }
    }
    debug!("RPC service loop exited");
}

async fn process(app: &Arc<Application>, handler: &RpcHandler, request: ServiceRequest) {
    match request {
        ServiceRequest::Rpc {
            body,
            transport,
            connection,
            reply,
        } => {
            let response = handle_rpc(app, handler, &body, transport, connection).await;
            if reply.send(response).is_err() {
                debug!("RPC caller went away before the reply");
            }
        }
        ServiceRequest::Connect { sink, reply } => {
            let id = app.subscriptions().connect(sink);
            trace!("Websocket connection {} registered", id);
            let _ = reply.send(id);
        }
        ServiceRequest::Disconnect(id) => app.subscriptions().disconnect(id),
        ServiceRequest::Rendezvous(reply) => {
            let _ = reply.send(());
        }
    }
}

// Method name and parameters: JSON-RPC style `method` + `params[0]`, or a
// websocket command object whose remaining fields are the parameters
fn split_request(request: &Value) -> Option<(String, Value)> {
    let obj = request.as_object()?;
    let method = obj
        .get("method")
        .or_else(|| obj.get("command"))
        .and_then(Value::as_str)?
        .to_owned();
    let params = match obj.get("params") {
        Some(Value::Array(params)) => params.first().cloned().unwrap_or_else(|| json!({})),
        _ => {
            let mut params = obj.clone();
            for field in ["method", "command", "id", "jsonrpc", "trackablerpc"] {
                params.remove(field);
            }
            Value::Object(params)
        }
    };
    Some((method, params))
}

async fn handle_rpc(
    app: &Arc<Application>,
    handler: &RpcHandler,
    body: &str,
    transport: Transport,
    connection: Option<SubscriberId>,
) -> RpcReply {
    let request: Value = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => {
            debug!("Unable to parse request: {}", e);
            let error = RpcError::with_message(RpcErrorCode::BadSyntax, "Unable to parse request.");
            return RpcReply::Json(json!({ "result": error.to_json() }).to_string());
        }
    };
    let Some((method, params)) = split_request(&request) else {
        let error = RpcError::from(RpcErrorCode::InvalidParams);
        return RpcReply::Json(json!({ "result": error.to_json() }).to_string());
    };

    let config = app.config();
    let role = match transport {
        Transport::Http if config.rpc_admin => Role::Admin,
        Transport::Ws if config.ws_admin => Role::Admin,
        _ => Role::User,
    };
    let mut context = Context::new();
    context.store(app.clone());
    context.store(role);
    context.store(transport);
    if let Some(id) = connection {
        context.store(Connection(id));
    }

    let result = match handler.dispatch(&context, &method, params).await {
        Dispatch::Result(result) => result,
        Dispatch::Forbidden => return RpcReply::Forbidden,
    };

    let response = match transport {
        Transport::Http => {
            let mut response = Map::new();
            response.insert("result".into(), result);
            for field in ["id", "jsonrpc", "trackablerpc"] {
                if let Some(value) = request.get(field) {
                    response.insert(field.into(), value.clone());
                }
            }
            response
        }
        Transport::Ws => ws_response(&request, result),
    };
    RpcReply::Json(Value::Object(response).to_string())
}

// Websocket replies carry `type` and `status` at the top level. Errors are
// flattened so `error` sits beside them.
fn ws_response(request: &Value, result: Value) -> Map<String, Value> {
    let mut response = Map::new();
    response.insert("type".into(), json!("response"));
    if let Some(id) = request.get("id") {
        response.insert("id".into(), id.clone());
    }
    let status = result.get("status").cloned().unwrap_or_else(|| json!("success"));
    if status == "error" {
        if let Value::Object(fields) = result {
            response.extend(fields);
        }
    } else {
        response.insert("result".into(), result);
    }
    response.insert("status".into(), status);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_keeper::SystemTimeKeeper;

    fn standalone() -> Config {
        Config::default()
    }

    fn call(service: &Service, body: Value, transport: Transport) -> Value {
        match service.handle().call(body.to_string(), transport, None).unwrap() {
            RpcReply::Json(text) => serde_json::from_str(&text).unwrap(),
            RpcReply::Forbidden => Value::Null,
        }
    }

    #[test]
    fn test_http_envelope() {
        let service = Service::start(standalone(), Arc::new(SystemTimeKeeper)).unwrap();
        let response = call(
            &service,
            json!({"method": "ledger_current", "params": [{}], "id": 5, "jsonrpc": "2.0"}),
            Transport::Http,
        );
        assert_eq!(response["result"]["ledger_current_index"], 3);
        assert_eq!(response["result"]["status"], "success");
        assert_eq!(response["id"], 5);
        assert_eq!(response["jsonrpc"], "2.0");
    }

    #[test]
    fn test_ws_errors_are_flattened() {
        let service = Service::start(standalone(), Arc::new(SystemTimeKeeper)).unwrap();
        let response = call(&service, json!({"command": "account_info", "id": 1}), Transport::Ws);
        assert_eq!(response["type"], "response");
        assert_eq!(response["status"], "error");
        assert_eq!(response["error"], "invalidParams");
        assert_eq!(response["id"], 1);
    }

    #[test]
    fn test_admin_commands_are_forbidden_to_users() {
        let config = Config {
            rpc_admin: false,
            ..standalone()
        };
        let service = Service::start(config, Arc::new(SystemTimeKeeper)).unwrap();
        let reply = service
            .handle()
            .call(json!({"method": "ledger_accept", "params": [{}]}).to_string(), Transport::Http, None)
            .unwrap();
        assert_eq!(reply, RpcReply::Forbidden);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut service = Service::start(standalone(), Arc::new(SystemTimeKeeper)).unwrap();
        let handle = service.handle();
        service.stop();
        service.stop();
        assert!(matches!(handle.rendezvous(), Err(ApplicationError::ServiceStopped)));
    }
}
