use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_record, required_str, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::model::{Student, StudentProfile};
use serde_json::json;

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match store.students() {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let student: Student = match required_record(req, "student") {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match store.save_student(student) {
        Ok(saved) => ok(&req.id, json!({ "student": saved })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match store.delete_student(&student_id) {
        Ok(removed) => ok(&req.id, json!({ "removed": removed })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_profile_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match store.student_profile(&student_id) {
        Ok(profile) => ok(&req.id, json!({ "profile": profile })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_profile_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let profile: StudentProfile = match required_record(req, "profile") {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if profile.student_id.is_empty() {
        return err(&req.id, "bad_params", "profile.studentId is required", None);
    }
    match store.save_student_profile(profile) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.save" => Some(handle_save(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        "profiles.get" => Some(handle_profile_get(state, req)),
        "profiles.save" => Some(handle_profile_save(state, req)),
        _ => None,
    }
}
