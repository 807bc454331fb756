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

fn request_ok(
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
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        line.trim()
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn dated_and_undated_extras_live_in_separate_partitions() {
    let workspace = temp_dir("erapor-extras");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "extras.save",
        json!({ "extras": {
            "studentId": "s1",
            "academicYear": "2025/2026",
            "teacherNote": "rajin dan teliti",
            "attendance": { "sakit": 2, "izin": 1, "alpa": 0 },
        }}),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "extras.save",
        json!({ "extras": {
            "studentId": "s1",
            "academicYear": "",
            "teacherNote": "catatan tanpa tahun",
        }}),
    );

    let dated = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "extras.get",
        json!({ "studentId": "s1", "academicYear": "2025/2026" }),
    );
    assert_eq!(dated["extras"]["teacherNote"], "rajin dan teliti");
    assert_eq!(dated["extras"]["attendance"]["sakit"], 2);

    let undated = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "extras.get",
        json!({ "studentId": "s1" }),
    );
    assert_eq!(undated["extras"]["teacherNote"], "catatan tanpa tahun");
    assert_eq!(undated["extras"]["academicYear"], "default");

    let all = request_ok(&mut stdin, &mut reader, "6", "extras.listAll", json!({}));
    assert_eq!(all["extras"].as_array().expect("extras").len(), 2);

    // Saving the undated partition again overwrites instead of splitting.
    request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "extras.save",
        json!({ "extras": {
            "studentId": "s1",
            "academicYear": "",
            "teacherNote": "catatan diperbarui",
        }}),
    );
    let all = request_ok(&mut stdin, &mut reader, "8", "extras.listAll", json!({}));
    assert_eq!(all["extras"].as_array().expect("extras").len(), 2);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn unknown_extras_come_back_as_a_fresh_default_record() {
    let workspace = temp_dir("erapor-extras-default");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let got = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "extras.get",
        json!({ "studentId": "ghost", "academicYear": "2025/2026" }),
    );
    assert_eq!(got["extras"]["studentId"], "ghost");
    assert_eq!(got["extras"]["attendance"]["alpa"], 0);
    assert_eq!(got["extras"]["extracurriculars"], json!([]));
    assert_eq!(got["extras"]["teacherNote"], "");
    // A default record is not persisted by a read.
    let all = request_ok(&mut stdin, &mut reader, "3", "extras.listAll", json!({}));
    assert_eq!(all["extras"].as_array().expect("extras").len(), 0);

    drop(stdin);
    let _ = child.wait();
}
