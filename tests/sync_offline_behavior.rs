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
        .env_remove("ERAPOR_REMOTE_TOKEN")
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
fn without_a_remote_the_daemon_runs_unconfigured_but_fully_usable() {
    let workspace = temp_dir("erapor-offline");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected["connectivity"], "unconfigured");

    let health = request_ok(&mut stdin, &mut reader, "2", "health", json!({}));
    assert_eq!(health["connectivity"], "unconfigured");

    let status = request_ok(&mut stdin, &mut reader, "3", "sync.status", json!({}));
    assert_eq!(status["connectivity"], "unconfigured");
    assert_eq!(status["realtime"], false);
    assert_eq!(status["failures"], json!([]));

    // Writes still work; they simply never leave the local cache.
    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.save",
        json!({ "student": { "nisn": "1", "name": "Budi", "class": "X-A" } }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "5", "students.list", json!({}));
    assert_eq!(listed["students"].as_array().expect("students").len(), 1);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn force_push_refuses_to_run_without_a_remote() {
    let workspace = temp_dir("erapor-offline-push");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let resp = request(&mut stdin, &mut reader, "2", "sync.forcePush", json!({}));
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "remote_unavailable");
    assert_eq!(resp["error"]["message"], "offline mode, cannot sync");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn realtime_cannot_be_enabled_without_a_remote() {
    let workspace = temp_dir("erapor-offline-rt");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let enabled = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "sync.setRealtime",
        json!({ "enabled": true }),
    );
    // The request succeeds but there is nothing to watch.
    assert_eq!(enabled["realtime"], false);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn requests_before_selecting_a_workspace_are_rejected() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(&mut stdin, &mut reader, "1", "students.list", json!({}));
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "no_workspace");

    // health works without a workspace and reports none selected.
    let health = request_ok(&mut stdin, &mut reader, "2", "health", json!({}));
    assert!(health["workspacePath"].is_null());

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn unknown_methods_get_a_not_implemented_error() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let resp = request(&mut stdin, &mut reader, "1", "nosuch.method", json!({}));
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "not_implemented");
    drop(stdin);
    let _ = child.wait();
}
