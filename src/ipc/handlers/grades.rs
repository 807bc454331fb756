use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, required_str, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::model::ReportGrade;
use serde_json::json;

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let semester = match required_str(req, "semester") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subject = optional_str(req, "subject");
    let academic_year = optional_str(req, "academicYear");
    match store.report_grades(subject.as_deref(), &semester, academic_year.as_deref()) {
        Ok(grades) => ok(&req.id, json!({ "grades": grades })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_list_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match store.all_report_grades() {
        Ok(grades) => ok(&req.id, json!({ "grades": grades })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_save_batch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let raw = req.params.get("grades").cloned().unwrap_or_default();
    let batch: Vec<ReportGrade> = match serde_json::from_value(raw) {
        Ok(b) => b,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                format!("malformed grades: {}", e),
                None,
            )
        }
    };
    match store.save_report_grades(batch) {
        Ok(saved) => ok(&req.id, json!({ "grades": saved })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

/// Flip one objective on one report slot. A slot with no grade yet starts
/// from an empty zero-score entry, matching the grading form's behavior.
fn handle_toggle_tp(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subject = match required_str(req, "subject") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let semester = match required_str(req, "semester") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let tp_id = match required_str(req, "tpId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let kind = match required_str(req, "kind") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let academic_year = optional_str(req, "academicYear").unwrap_or_default();

    let template = ReportGrade {
        id: String::new(),
        student_id: student_id.clone(),
        subject,
        final_score: 0.0,
        achieved_tp_ids: vec![],
        improvement_tp_ids: vec![],
        semester,
        academic_year,
    };
    let mut grade = match store.all_report_grades() {
        Ok(all) => all
            .into_iter()
            .find(|g| g.same_slot(&template))
            .unwrap_or(template),
        Err(e) => return err(&req.id, "store_failed", format!("{e:#}"), None),
    };

    match kind.as_str() {
        "achieved" => grade.toggle_achieved(&tp_id),
        "improvement" => grade.toggle_improvement(&tp_id),
        other => {
            return err(
                &req.id,
                "bad_params",
                "kind must be achieved or improvement",
                Some(json!({ "kind": other })),
            )
        }
    }

    match store.save_report_grades(vec![grade]) {
        Ok(mut saved) => ok(&req.id, json!({ "grade": saved.remove(0) })),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.list" => Some(handle_list(state, req)),
        "grades.listAll" => Some(handle_list_all(state, req)),
        "grades.saveBatch" => Some(handle_save_batch(state, req)),
        "grades.toggleTp" => Some(handle_toggle_tp(state, req)),
        _ => None,
    }
}
