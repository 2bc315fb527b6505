//! Basic CLI E2E tests.
//!
//! Each test drives the built `learnhub` binary against its own data
//! directory so runs never share state.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_learnhub"))
        .args(args)
        .env("LEARNHUB_DATA_DIR", data_dir)
        .env_remove("LEARNHUB_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_user_create_and_show() {
    let dir = tempfile::tempdir().unwrap();
    let created = run_json(dir.path(), &["user", "create", "ada@example.com", "--name", "Ada"]);
    assert_eq!(created["email"], "ada@example.com");

    let shown = run_json(dir.path(), &["user", "show", "ada@example.com"]);
    assert_eq!(shown["id"], created["id"]);

    let (_, stderr, code) = run_cli(dir.path(), &["user", "create", "ada@example.com"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("User already exists"));
}

#[test]
fn test_complete_module_unlocks_tool_once() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["user", "create", "ada@example.com"]);

    for task in 1..=6 {
        let outcome = run_json(
            dir.path(),
            &["progress", "complete", "ada@example.com", "foundation", &task.to_string()],
        );
        assert_eq!(outcome["unlocked"].as_array().unwrap().len(), 0);
    }
    let outcome = run_json(dir.path(), &["progress", "complete", "ada@example.com", "foundation", "7"]);
    assert_eq!(outcome["module_complete"], true);
    assert_eq!(outcome["unlocked"][0]["tool_id"], "foundation-interview-kit");

    let again = run_json(dir.path(), &["tools", "unlock", "ada@example.com", "foundation"]);
    assert_eq!(again.as_array().unwrap().len(), 0);

    let unlocked = run_json(dir.path(), &["tools", "list", "ada@example.com", "--unlocked"]);
    let unlocked = unlocked.as_array().unwrap();
    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0]["is_unlocked"], true);

    let summary = run_json(dir.path(), &["progress", "summary", "ada@example.com"]);
    assert_eq!(summary["xp"], 7);
    assert_eq!(summary["completed_modules"], 1);
}

#[test]
fn test_invalid_task_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["user", "create", "ada@example.com"]);

    let (_, stderr, code) = run_cli(dir.path(), &["progress", "complete", "ada@example.com", "react", "8"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Invalid task id 8"));

    let (_, stderr, code) = run_cli(dir.path(), &["progress", "complete", "ada@example.com", "elixir", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Unknown module"));
}

#[test]
fn test_locked_tool_cannot_be_used() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["user", "create", "ada@example.com"]);

    let (_, stderr, code) = run_cli(dir.path(), &["tools", "use", "ada@example.com", "mock-interviewer"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("locked"));
}

#[test]
fn test_config_set_and_get() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "set", "storage.busy_timeout_ms", "1500"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "storage.busy_timeout_ms"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "1500");

    let (_, _, code) = run_cli(dir.path(), &["config", "get", "storage.nope"]);
    assert_eq!(code, 1);
}

#[test]
fn test_catalog_listing_and_check() {
    let dir = tempfile::tempdir().unwrap();
    let modules = run_json(dir.path(), &["catalog", "modules"]);
    assert_eq!(modules.as_array().unwrap().len(), 6);

    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "[[modules]]\nid = \"x\"\ntitle = \"X\"\ntasks = []\n").unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["catalog", "check", bad.to_str().unwrap()]);
    assert_eq!(code, 1);
    assert!(stderr.contains("has no tasks"));
}
