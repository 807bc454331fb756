use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::store::Store;
use serde::de::DeserializeOwned;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .filter(|v| !v.is_empty())
}

/// Decode a typed record embedded in the params. Missing optional fields
/// default; a structurally wrong value is a caller error.
pub fn required_record<T: DeserializeOwned>(
    req: &Request,
    key: &str,
) -> Result<T, serde_json::Value> {
    let raw = req
        .params
        .get(key)
        .cloned()
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))?;
    serde_json::from_value(raw).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("malformed {}: {}", key, e),
            None,
        )
    })
}

pub fn store_ref<'a>(state: &'a AppState, req: &Request) -> Result<&'a Store, serde_json::Value> {
    state
        .store
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}
