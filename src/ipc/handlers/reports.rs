use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, required_str, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::report;
use serde_json::{json, Value};

/// Assemble everything the print template needs for one student: identity,
/// school and cover settings, the filtered subject rows with generated
/// descriptions, attendance and the promotion line.
fn handle_print(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let semester = match required_str(req, "semester") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let academic_year = optional_str(req, "academicYear");

    let inner = || -> anyhow::Result<Option<Value>> {
        let Some(student) = store
            .students()?
            .into_iter()
            .find(|s| s.id == student_id)
        else {
            return Ok(None);
        };

        let mut grades =
            store.report_grades(None, &semester, academic_year.as_deref())?;
        grades.retain(|g| g.student_id == student_id);
        // Descriptions resolve against the full objective list so ids match
        // no matter which class the objective was created under.
        let tps = store.tps(None, None, None)?;
        let subjects = report::subjects_to_print(&grades, &tps);

        let extras = store.report_extras(
            &student_id,
            academic_year.as_deref().unwrap_or_default(),
        )?;
        let promotion_text = extras.promotion.display_text();
        let homeroom = store.homeroom_teacher(&student.class)?;

        Ok(Some(json!({
            "student": student,
            "profile": store.student_profile(&student_id)?,
            "school": store.school_data()?,
            "cover": store.cover_config()?,
            "subjects": subjects,
            "extras": extras,
            "promotionText": promotion_text,
            "homeroomTeacher": homeroom,
        })))
    };

    match inner() {
        Ok(Some(result)) => ok(&req.id, result),
        Ok(None) => err(&req.id, "not_found", "student not found", None),
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.print" => Some(handle_print(state, req)),
        _ => None,
    }
}
