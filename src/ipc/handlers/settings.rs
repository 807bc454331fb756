use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_record, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::model::{ReportCoverConfig, SchoolData};
use serde_json::json;

fn handle_school_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match store.school_data() {
        Ok(data) => ok(&req.id, json!({ "school": data })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_school_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let data: SchoolData = match required_record(req, "school") {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    match store.save_school_data(data) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_cover_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match store.cover_config() {
        Ok(config) => ok(&req.id, json!({ "cover": config })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_cover_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let config: ReportCoverConfig = match required_record(req, "cover") {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match store.save_cover_config(config) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.schoolGet" => Some(handle_school_get(state, req)),
        "settings.schoolSave" => Some(handle_school_save(state, req)),
        "settings.coverGet" => Some(handle_cover_get(state, req)),
        "settings.coverSave" => Some(handle_cover_save(state, req)),
        _ => None,
    }
}
