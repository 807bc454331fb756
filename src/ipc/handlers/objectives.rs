use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, required_record, required_str, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::model::LearningObjective;
use serde_json::json;

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let subject = optional_str(req, "subject");
    let phase = optional_str(req, "phase");
    let class_target = optional_str(req, "classTarget");
    match store.tps(subject.as_deref(), phase.as_deref(), class_target.as_deref()) {
        Ok(tps) => ok(&req.id, json!({ "tps": tps })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let tp: LearningObjective = match required_record(req, "tp") {
        Ok(tp) => tp,
        Err(resp) => return resp,
    };
    if tp.subject.is_empty() || tp.description.is_empty() {
        return err(
            &req.id,
            "bad_params",
            "tp.subject and tp.description are required",
            None,
        );
    }
    match store.add_tp(tp) {
        Ok(saved) => ok(&req.id, json!({ "tp": saved })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let tp_id = match required_str(req, "tpId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match store.delete_tp(&tp_id) {
        Ok(removed) => ok(&req.id, json!({ "removed": removed })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "tps.list" => Some(handle_list(state, req)),
        "tps.add" => Some(handle_add(state, req)),
        "tps.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
