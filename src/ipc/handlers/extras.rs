use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, required_record, required_str, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::model::ReportExtras;
use serde_json::json;

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let academic_year = optional_str(req, "academicYear").unwrap_or_default();
    match store.report_extras(&student_id, &academic_year) {
        Ok(extras) => ok(&req.id, json!({ "extras": extras })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_list_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match store.all_report_extras() {
        Ok(extras) => ok(&req.id, json!({ "extras": extras })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let extras: ReportExtras = match required_record(req, "extras") {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    if extras.student_id.is_empty() {
        return err(&req.id, "bad_params", "extras.studentId is required", None);
    }
    match store.save_report_extras(extras) {
        Ok(saved) => ok(&req.id, json!({ "extras": saved })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "extras.get" => Some(handle_get(state, req)),
        "extras.listAll" => Some(handle_list_all(state, req)),
        "extras.save" => Some(handle_save(state, req)),
        _ => None,
    }
}
