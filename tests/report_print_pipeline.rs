use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_erapord");
    let mut child = Command::new(exe)
        .env_remove("ERAPOR_REMOTE_URL")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn erapord");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn print_model_fills_in_as_the_teacher_enters_data() {
    let workspace = temp_dir("erapor-print");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.save",
        json!({ "student": { "nisn": "0051234567", "name": "Siti Rahma", "class": "X-A" } }),
    );
    let student_id = saved["student"]["id"].as_str().expect("id").to_string();

    // A zero score keeps the subject off the report even with an objective
    // marked; it relies on the seeded tp1 for Matematika (Umum).
    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grades.saveBatch",
        json!({ "grades": [{
            "studentId": student_id,
            "subject": "Matematika (Umum)",
            "finalScore": 0,
            "achievedTpIds": ["tp1"],
            "semester": "1",
            "academicYear": "2025/2026",
        }]}),
    );
    let printed = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "reports.print",
        json!({ "studentId": student_id, "semester": "1", "academicYear": "2025/2026" }),
    );
    assert_eq!(printed["subjects"].as_array().expect("subjects").len(), 0);
    assert_eq!(printed["student"]["name"], "Siti Rahma");
    assert_eq!(printed["school"]["name"], "SMA NEGERI 1 PULAU BANYAK BARAT");
    assert_eq!(printed["cover"]["reportTitle"], "LAPORAN HASIL BELAJAR");
    assert!(printed["promotionText"].is_null());
    assert!(printed["homeroomTeacher"].is_null());

    // A real score plus the achieved objective puts the row on the report
    // with a generated description.
    request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "grades.saveBatch",
        json!({ "grades": [{
            "studentId": student_id,
            "subject": "Matematika (Umum)",
            "finalScore": 80,
            "achievedTpIds": ["tp1"],
            "semester": "1",
            "academicYear": "2025/2026",
        }]}),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "users.save",
        json!({ "user": {
            "username": "guru1",
            "name": "Ibu Ani",
            "role": "guru",
            "homeroomClass": "X-A",
        }}),
    );

    let printed = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "reports.print",
        json!({ "studentId": student_id, "semester": "1", "academicYear": "2025/2026" }),
    );
    let subjects = printed["subjects"].as_array().expect("subjects");
    assert_eq!(subjects.len(), 1);
    assert_eq!(subjects[0]["subject"], "Matematika (Umum)");
    assert_eq!(subjects[0]["finalScore"].as_f64(), Some(80.0));
    let description = subjects[0]["description"].as_str().expect("description");
    assert!(description.starts_with("Menunjukkan penguasaan yang baik dalam:"));
    assert!(description.contains("Memahami konsep eksponen dan logaritma"));
    assert_eq!(printed["homeroomTeacher"]["name"], "Ibu Ani");
    // No extras were ever saved: the report still carries an empty record.
    assert_eq!(printed["extras"]["attendance"]["sakit"], 0);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn printing_an_unknown_student_is_a_not_found_error() {
    let workspace = temp_dir("erapor-print-missing");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "reports.print",
        json!({ "studentId": "ghost", "semester": "1" }),
    );
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "not_found");

    drop(stdin);
    let _ = child.wait();
}
