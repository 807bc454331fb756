use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_record, required_str, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::model::User;
use serde_json::{json, Value};

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match store.users() {
        Ok(users) => ok(&req.id, json!({ "users": users })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let user: User = match required_record(req, "user") {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    match store.save_user(user) {
        Ok(saved) => ok(&req.id, json!({ "user": saved })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match store.delete_user(&user_id) {
        Ok(removed) => ok(&req.id, json!({ "removed": removed })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_homeroom_teacher(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let class = match required_str(req, "class") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match store.homeroom_teacher(&class) {
        Ok(user) => ok(
            &req.id,
            json!({ "user": user.map(|u| json!(u)).unwrap_or(Value::Null) }),
        ),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let academic_year = req
        .params
        .get("academicYear")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    match store.login(&username, &password, academic_year) {
        Ok(Some(session)) => ok(&req.id, json!({ "session": session })),
        Ok(None) => ok(&req.id, json!({ "session": Value::Null })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match store.logout() {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match store.session() {
        Ok(session) => ok(
            &req.id,
            json!({ "session": session.map(|s| json!(s)).unwrap_or(Value::Null) }),
        ),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.list" => Some(handle_list(state, req)),
        "users.save" => Some(handle_save(state, req)),
        "users.delete" => Some(handle_delete(state, req)),
        "users.homeroomTeacher" => Some(handle_homeroom_teacher(state, req)),
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        _ => None,
    }
}
