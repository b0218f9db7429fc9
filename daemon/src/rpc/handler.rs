use futures::future::BoxFuture;
use log::{debug, trace};
use serde_json::{Map, Value};
use std::collections::HashMap;
use trackable_common::rpc::{RpcError, RpcErrorCode};

use super::{context::Context, Role};

pub type Handler = for<'a> fn(&'a Context, Value) -> BoxFuture<'a, Result<Value, RpcError>>;

/// Wrap an `async fn(&Context, Value) -> Result<Value, RpcError>` into a
/// [`Handler`].
#[macro_export]
macro_rules! async_handler {
    ($func: expr) => {
        move |a, b| Box::pin($func(a, b))
    };
}

struct Method {
    handler: Handler,
    admin: bool,
}

/// Outcome of dispatching one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The `result` object of the response.
    Result(Value),
    /// Caller may not run the command. Transports answer without a JSON body.
    Forbidden,
}

#[derive(Default)]
pub struct RpcHandler {
    methods: HashMap<&'static str, Method>,
}

impl RpcHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_method(&mut self, name: &'static str, handler: Handler) {
        self.methods.insert(name, Method { handler, admin: false });
    }

    /// Register a command only admin callers may run.
    pub fn register_admin_method(&mut self, name: &'static str, handler: Handler) {
        self.methods.insert(name, Method { handler, admin: true });
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Run `method` with `params`. Successful results get `status` set to
    /// `success` unless the handler set it, failures carry the error fields
    /// and the original request.
    pub async fn dispatch(&self, context: &Context, method: &str, params: Value) -> Dispatch {
        let Some(entry) = self.methods.get(method) else {
            debug!("Unknown method '{}'", method);
            return Dispatch::Result(error_result(RpcErrorCode::UnknownCommand.into(), method, &params));
        };
        let role = context.get_copy::<Role>().unwrap_or(Role::User);
        if entry.admin && role != Role::Admin {
            debug!("Refusing admin method '{}' to a user", method);
            return Dispatch::Forbidden;
        }
        trace!("Dispatching '{}'", method);
        match (entry.handler)(context, params.clone()).await {
            Ok(Value::Object(mut result)) => {
                result
                    .entry("status")
                    .or_insert_with(|| Value::String("success".into()));
                Dispatch::Result(Value::Object(result))
            }
            Ok(other) => {
                let mut result = Map::new();
                result.insert("value".into(), other);
                result.insert("status".into(), Value::String("success".into()));
                Dispatch::Result(Value::Object(result))
            }
            Err(e) => Dispatch::Result(error_result(e, method, &params)),
        }
    }
}

fn error_result(error: RpcError, method: &str, params: &Value) -> Value {
    let mut result = Map::new();
    error.inject(&mut result);
    let mut request = match params {
        Value::Object(obj) => obj.clone(),
        _ => Map::new(),
    };
    request.insert("command".into(), Value::String(method.into()));
    result.insert("request".into(), Value::Object(request));
    Value::Object(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn echo(_: &Context, body: Value) -> Result<Value, RpcError> {
        Ok(json!({ "echo": body }))
    }

    async fn fail(_: &Context, _: Value) -> Result<Value, RpcError> {
        Err(RpcError::missing_field("account"))
    }

    fn handler() -> RpcHandler {
        let mut handler = RpcHandler::new();
        handler.register_method("echo", async_handler!(echo));
        handler.register_method("fail", async_handler!(fail));
        handler.register_admin_method("secret", async_handler!(echo));
        handler
    }

    fn context(role: Role) -> Context {
        let mut context = Context::new();
        context.store(role);
        context
    }

    #[tokio::test]
    async fn test_success_sets_status() {
        let result = handler().dispatch(&context(Role::User), "echo", json!({"a": 1})).await;
        assert_eq!(
            result,
            Dispatch::Result(json!({"echo": {"a": 1}, "status": "success"}))
        );
    }

    #[tokio::test]
    async fn test_failure_carries_request() {
        let Dispatch::Result(result) = handler().dispatch(&context(Role::User), "fail", json!({})).await else {
            panic!("expected a result");
        };
        assert_eq!(result["error"], "invalidParams");
        assert_eq!(result["error_message"], "Missing field 'account'.");
        assert_eq!(result["status"], "error");
        assert_eq!(result["request"]["command"], "fail");
    }

    #[tokio::test]
    async fn test_admin_methods() {
        let handler = handler();
        assert_eq!(
            handler.dispatch(&context(Role::User), "secret", Value::Null).await,
            Dispatch::Forbidden
        );
        assert!(matches!(
            handler.dispatch(&context(Role::Admin), "secret", Value::Null).await,
            Dispatch::Result(_)
        ));
        let Dispatch::Result(result) = handler.dispatch(&context(Role::Admin), "nope", Value::Null).await else {
            panic!("expected a result");
        };
        assert_eq!(result["error"], "unknownCmd");
    }
}
