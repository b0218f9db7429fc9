use log::info;
use serde_json::{json, Value};
use trackable_common::{
    features::FeatureId,
    rpc::{RpcError, RpcErrorCode},
};

use super::{application, context::Context};

/// `feature`: list amendments, or show one by name or hex id and
/// optionally veto or accept it.
pub async fn feature(context: &Context, body: Value) -> Result<Value, RpcError> {
    let app = application(context)?;
    let table = app.amendments();
    let Some(name) = body.get("feature") else {
        return Ok(json!({ "features": table.get_json() }));
    };
    let id = name
        .as_str()
        .and_then(|name| {
            table
                .find(name)
                .or_else(|| name.parse::<FeatureId>().ok())
        })
        .ok_or_else(|| RpcError::from(RpcErrorCode::BadFeature))?;

    match body.get("vetoed").and_then(Value::as_bool) {
        Some(true) => {
            info!("Vetoing amendment {}", id);
            table.veto(&id);
        }
        Some(false) => {
            info!("Accepting amendment {}", id);
            table.unveto(&id);
        }
        None => {}
    }
    Ok(table.get_json_for(&id))
}
