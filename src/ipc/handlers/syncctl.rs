use crate::ipc::error::{err, ok};
use crate::ipc::helpers::store_ref;
use crate::ipc::types::{AppState, Request};
use crate::sync::Connectivity;
use serde_json::json;

fn handle_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let status = store.sync().status();
    let failures: Vec<serde_json::Value> = status
        .failures
        .iter()
        .map(|f| {
            json!({
                "collection": f.collection,
                "docId": f.doc_id,
                "error": f.error,
                "attempts": f.attempts,
            })
        })
        .collect();
    ok(
        &req.id,
        json!({
            "connectivity": status.connectivity.as_str(),
            "realtime": status.realtime,
            "failures": failures,
        }),
    )
}

/// The one sync operation that surfaces failure: the user pressed the
/// button and expects a definitive answer.
fn handle_force_push(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if store.sync().status().connectivity == Connectivity::Unconfigured {
        return err(
            &req.id,
            "remote_unavailable",
            "offline mode, cannot sync",
            None,
        );
    }
    match store.sync().force_push_all() {
        Ok(()) => ok(&req.id, json!({ "pushed": true })),
        Err(e) => err(&req.id, "push_failed", format!("{e:#}"), None),
    }
}

fn handle_set_realtime(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let enabled = req
        .params
        .get("enabled")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    store.sync().set_realtime(enabled);
    ok(&req.id, json!({ "realtime": store.sync().status().realtime }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sync.status" => Some(handle_status(state, req)),
        "sync.forcePush" => Some(handle_force_push(state, req)),
        "sync.setRealtime" => Some(handle_set_realtime(state, req)),
        _ => None,
    }
}
