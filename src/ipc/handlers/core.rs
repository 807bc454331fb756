use crate::config::RemoteConfig;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::ALL_DATASETS;
use crate::store::Store;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let connectivity = state
        .store
        .as_ref()
        .map(|s| s.sync().status().connectivity.as_str());
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "connectivity": connectivity,
        }),
    )
}

/// Open (or create) a workspace: the cache database lives inside it. Runs
/// the bootstrap sync before replying so the first read after selection
/// already reflects the remote store when one is reachable.
fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    // Replacing the store tears the previous one down (watchers stopped,
    // push queue drained) before the new one spins up. Event registrations
    // die with the old bus.
    state.event_subs.clear();
    state.store = None;

    match Store::open(&path, RemoteConfig::from_env()) {
        Ok(store) => {
            store.sync().bootstrap();
            let status = store.sync().status();
            state.workspace = Some(path.clone());
            state.store = Some(store);
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "connectivity": status.connectivity.as_str(),
                }),
            )
        }
        Err(e) => err(&req.id, "store_open_failed", format!("{e:?}"), None),
    }
}

/// Start emitting change events. Every dataset change, whether caused by a
/// local write or a realtime update, prints one unsolicited line on stdout:
///
///   {"event":"datasetChanged","dataset":"report-grades"}
///
/// Events print before the response of the request that caused them, since
/// listeners run inside the write.
fn handle_events_subscribe(state: &mut AppState, req: &Request) -> serde_json::Value {
    let bus = match state.store.as_ref() {
        Some(store) => store.bus().clone(),
        None => return err(&req.id, "no_workspace", "select a workspace first", None),
    };
    for sub in state.event_subs.drain(..) {
        bus.unsubscribe(sub);
    }
    for dataset in ALL_DATASETS {
        let sub = bus.subscribe(
            &[dataset],
            Box::new(move || {
                let line = json!({
                    "event": "datasetChanged",
                    "dataset": dataset.storage_key(),
                });
                // println! takes the stdout lock, so event lines never
                // interleave with response lines.
                println!("{line}");
            }),
        );
        state.event_subs.push(sub);
    }
    ok(&req.id, json!({ "events": true }))
}

fn handle_events_unsubscribe(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(store) = state.store.as_ref() {
        let bus = store.bus().clone();
        for sub in state.event_subs.drain(..) {
            bus.unsubscribe(sub);
        }
    } else {
        state.event_subs.clear();
    }
    ok(&req.id, json!({ "events": false }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "events.subscribe" => Some(handle_events_subscribe(state, req)),
        "events.unsubscribe" => Some(handle_events_unsubscribe(state, req)),
        _ => None,
    }
}
