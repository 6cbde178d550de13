//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a temporary config file and verify
//! outputs.

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(config: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_studyplan-cli"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("STUDYPLAN_ENV", "dev")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

const SNAPSHOT: &str = r#"{
  "tasks": [
    { "id": "hw", "title": "Homework", "type": "assignment",
      "dueDate": "2026-03-05T20:00:00Z", "estimatedHours": 2 },
    { "id": "exam", "title": "Midterm", "type": "exam",
      "dueDate": "2026-03-06T09:00:00Z", "estimatedHours": 2, "splittable": false },
    { "id": "late", "title": "Late", "type": "quiz",
      "dueDate": "2026-03-01T09:00:00Z", "estimatedHours": 1 }
  ],
  "events": [
    { "id": "class", "startTime": "2026-03-02T10:00:00Z", "endTime": "2026-03-02T12:00:00Z" }
  ]
}"#;

fn write_snapshot(dir: &TempDir) -> String {
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, SNAPSHOT).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_plan_generate_outputs_blocks_and_diagnostics() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    let snapshot = write_snapshot(&dir);

    let (code, stdout, stderr) = run_cli(
        &config,
        &["plan", "generate", "--input", &snapshot, "--now", "2026-03-02T07:00:00Z", "--seed", "3"],
    );
    assert_eq!(code, 0, "plan generate failed: {stderr}");

    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let blocks = parsed["blocks"].as_array().unwrap();
    assert!(!blocks.is_empty());
    assert!(blocks.iter().all(|b| b["taskId"] != "late"));
    assert_eq!(parsed["diagnostics"]["overdueTaskIds"][0], "late");

    let exam_blocks: Vec<_> = blocks.iter().filter(|b| b["taskId"] == "exam").collect();
    assert_eq!(exam_blocks.len(), 1);
}

#[test]
fn test_plan_generate_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    let snapshot = write_snapshot(&dir);
    let args = [
        "plan", "generate", "--input", &snapshot, "--now", "2026-03-02T07:00:00Z", "--seed", "9",
    ];

    let (_, first, _) = run_cli(&config, &args);
    let (_, second, _) = run_cli(&config, &args);
    assert_eq!(first, second);
}

#[test]
fn test_plan_records_then_reschedule() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    let snapshot = write_snapshot(&dir);

    let (code, stdout, stderr) = run_cli(
        &config,
        &["plan", "generate", "--input", &snapshot, "--now", "2026-03-02T07:00:00Z", "--records"],
    );
    assert_eq!(code, 0, "plan generate failed: {stderr}");
    let generated: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(generated["blocks"][0]["title"].is_string());

    let mut full: serde_json::Value = serde_json::from_str(SNAPSHOT).unwrap();
    full["blocks"] = generated["blocks"].clone();
    let planned = dir.path().join("planned.json");
    std::fs::write(&planned, full.to_string()).unwrap();

    let (code, stdout, stderr) = run_cli(
        &config,
        &[
            "plan",
            "reschedule",
            "--input",
            planned.to_str().unwrap(),
            "--completed",
            "hw",
            "--now",
            "2026-03-02T08:00:00Z",
        ],
    );
    assert_eq!(code, 0, "plan reschedule failed: {stderr}");
    let updated: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let blocks = updated["blocks"].as_array().unwrap();
    assert!(blocks.iter().all(|b| b["taskId"] != "hw"));
    assert!(blocks.iter().any(|b| b["taskId"] == "exam"));
}

#[test]
fn test_plan_generate_rejects_missing_input() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    let missing = dir.path().join("missing.json");

    let (code, _, stderr) =
        run_cli(&config, &["plan", "generate", "--input", missing.to_str().unwrap()]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_plan_generate_rejects_out_of_range_days() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    let snapshot = write_snapshot(&dir);

    let (code, _, stderr) = run_cli(
        &config,
        &["plan", "generate", "--input", &snapshot, "--now", "2026-03-02T07:00:00Z", "--days", "4000000000"],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"), "unexpected stderr: {stderr}");
    assert!(stderr.contains("days"));
}

#[test]
fn test_config_set_get_reset() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");

    let (code, stdout, _) = run_cli(&config, &["config", "set", "scheduler.buffer_minutes", "20"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (_, stdout, _) = run_cli(&config, &["config", "get", "scheduler.buffer_minutes"]);
    assert_eq!(stdout.trim(), "20");

    let (code, _, _) = run_cli(&config, &["config", "get", "scheduler.nope"]);
    assert_ne!(code, 0);

    let (_, stdout, _) = run_cli(&config, &["config", "path"]);
    assert_eq!(stdout.trim(), config.to_string_lossy());

    run_cli(&config, &["config", "reset"]);
    let (_, stdout, _) = run_cli(&config, &["config", "show"]);
    assert!(stdout.contains("buffer_minutes = 10"));
}

#[test]
fn test_energy_override_lifecycle() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");

    let (code, _, _) = run_cli(&config, &["energy", "set", "14", "95"]);
    assert_eq!(code, 0);

    let (_, stdout, _) = run_cli(&config, &["energy", "peaks", "--day", "mon", "--min", "90"]);
    assert!(stdout.contains("14:00"));
    assert!(stdout.contains("95%  high"));

    let (code, stdout, _) = run_cli(&config, &["energy", "show", "--day", "wed"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Wed Energy Curve"));
    assert!(stdout.contains("14:00"));

    let (_, stdout, _) = run_cli(&config, &["energy", "clear", "14"]);
    assert!(stdout.contains("cleared"));

    let (code, _, _) = run_cli(&config, &["energy", "set", "25", "50"]);
    assert_ne!(code, 0);

    let (code, _, _) = run_cli(&config, &["energy", "show", "--day", "someday"]);
    assert_ne!(code, 0);
}
