//! Basic CLI E2E tests.
//!
//! Each test drives the built binary against its own data directory.

use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_dayweave"))
        .args(args)
        .env("DAYWEAVE_HOME", home)
        .env("RUST_LOG", "warn")
        .env_remove("DAYWEAVE_MAPS_API_KEY")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);
    (stdout, stderr, code)
}

/// Run a command that must succeed and parse its JSON output.
fn run_json(home: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("{args:?} printed non-JSON ({e}): {stdout}"))
}

fn create_user(home: &Path) -> String {
    run_json(home, &["user", "create", "ada"])["id"].to_string()
}

fn create_event(home: &Path, user: &str, summary: &str, start: &str, end: &str) -> Value {
    run_json(home, &["event", "create", user, summary, "--start", start, "--end", end])
}

#[test]
fn test_user_create_and_list() {
    let home = TempDir::new().unwrap();
    let user = run_json(home.path(), &["user", "create", "ada"]);
    assert_eq!(user["name"], "ada");

    let users = run_json(home.path(), &["user", "list"]);
    assert_eq!(users.as_array().unwrap().len(), 1);
}

#[test]
fn test_event_lifecycle() {
    let home = TempDir::new().unwrap();
    let user = create_user(home.path());
    let event = create_event(home.path(), &user, "Standup", "2026-03-02T09:00", "2026-03-02T10:00");
    assert_eq!(event["start"], "2026-03-02T09:00:00Z");
    assert_eq!(event["status"], "PLANNED");

    let (_, stderr, code) = run_cli(
        home.path(),
        &["event", "create", &user, "Clash", "--start", "2026-03-02T09:30", "--end", "2026-03-02T10:30"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"), "{stderr}");

    let id = event["id"].to_string();
    let moved = run_json(home.path(), &["event", "update", &id, "--start", "2026-03-02T13:00", "--end", "2026-03-02T14:00"]);
    assert_eq!(moved["start"], "2026-03-02T13:00:00Z");

    let cancelled = run_json(home.path(), &["event", "cancel", &id]);
    assert_eq!(cancelled["status"], "CANCELLED");

    let listed = run_json(home.path(), &["event", "list", &user, "--date", "2026-03-02"]);
    assert!(listed.as_array().unwrap().is_empty());
    let all = run_json(home.path(), &["event", "list", &user, "--date", "2026-03-02", "--include-cancelled"]);
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[test]
fn test_focus_and_load() {
    let home = TempDir::new().unwrap();
    let user = create_user(home.path());
    create_event(home.path(), &user, "Standup", "2026-03-02T09:00", "2026-03-02T10:00");
    create_event(home.path(), &user, "Review", "2026-03-02T11:00", "2026-03-02T12:00");

    let slots = run_json(home.path(), &["focus", &user, "--date", "2026-03-02"]);
    let slots = slots.as_array().unwrap();
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0]["start"], "2026-03-02T12:00:00Z");

    let load = run_json(home.path(), &["load", &user, "--date", "2026-03-02"]);
    assert_eq!(load["committed_minutes"], 120);
    assert_eq!(load["remaining_minutes"], 360);
    assert_eq!(load["overloaded"], false);
}

#[test]
fn test_reshuffle_materializes_task() {
    let home = TempDir::new().unwrap();
    let user = create_user(home.path());
    let event = create_event(home.path(), &user, "Lecture", "2026-03-02T14:00", "2026-03-02T15:00");
    run_json(home.path(), &["task", "create", &user, "Reading", "--minutes", "50", "--priority", "3"]);
    let essay = run_json(home.path(), &["task", "create", &user, "Essay", "--minutes", "45", "--priority", "5"]);

    let id = event["id"].to_string();
    let outcome = run_json(home.path(), &["reshuffle", &id]);
    assert_eq!(outcome["outcome"], "materialized");
    assert_eq!(outcome["task_id"], essay["id"]);
    assert_eq!(outcome["event"]["end"], "2026-03-02T14:45:00Z");

    let retry = run_json(home.path(), &["reshuffle", &id]);
    assert_eq!(retry["outcome"], "reconciled");

    let tasks = run_json(home.path(), &["task", "list", &user]);
    let essay_row = tasks
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["id"] == essay["id"])
        .unwrap();
    assert_eq!(essay_row["status"], "SCHEDULED");
}

#[test]
fn test_travel_and_check() {
    let home = TempDir::new().unwrap();
    let user = create_user(home.path());
    run_json(
        home.path(),
        &[
            "event", "create", &user, "Office", "--start", "2026-03-02T08:00", "--end", "2026-03-02T10:00",
            "--lat", "48.8566", "--lng", "2.3522",
        ],
    );
    run_json(
        home.path(),
        &[
            "event", "create", &user, "Client", "--start", "2026-03-02T14:00", "--end", "2026-03-02T15:00",
            "--lat", "48.9466", "--lng", "2.3522", "--mode", "driving",
        ],
    );

    let segments = run_json(home.path(), &["travel", "list", &user, "--date", "2026-03-02"]);
    let segments = segments.as_array().unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0]["start"], "2026-03-02T10:00:00Z");
    assert_eq!(segments[0]["mode"], "DRIVING");

    let report = run_json(home.path(), &["travel", "recalc", &user]);
    assert_eq!(report["unchanged"], 1);

    let violations = run_json(home.path(), &["check", &user]);
    assert!(violations.as_array().unwrap().is_empty());

    let summary = run_json(home.path(), &["reconcile", "once"]);
    assert_eq!(summary["users"], 1);
    assert_eq!(summary["succeeded"], 1);
}

#[test]
fn test_import_reports_rejections() {
    let home = TempDir::new().unwrap();
    let user = create_user(home.path());
    let file = home.path().join("import.json");
    std::fs::write(
        &file,
        r#"[
            {"summary": "Lecture", "start": "2026-03-02T09:00:00Z", "end": "2026-03-02T10:00:00Z", "category": "study"},
            {"summary": "Clash", "start": "2026-03-02T09:30:00Z", "end": "2026-03-02T10:30:00Z"}
        ]"#,
    )
    .unwrap();

    let report = run_json(home.path(), &["event", "import", &user, file.to_str().unwrap()]);
    assert_eq!(report["created"].as_array().unwrap().len(), 1);
    assert_eq!(report["created"][0]["category"], "study");
    assert_eq!(report["rejected"][0]["index"], 1);
}

#[test]
fn test_user_prefs_cap_events() {
    let home = TempDir::new().unwrap();
    let user = create_user(home.path());
    let shown = run_json(home.path(), &["user", "prefs", &user]);
    assert!(shown["max_events_per_day"].is_null());

    let updated = run_json(home.path(), &["user", "prefs", &user, "--max-events", "1", "--period", "morning"]);
    assert_eq!(updated["max_events_per_day"], 1);
    assert_eq!(updated["preferred_period"], "morning");

    create_event(home.path(), &user, "Standup", "2026-03-02T09:00", "2026-03-02T09:15");
    let (_, stderr, code) = run_cli(
        home.path(),
        &["event", "create", &user, "Review", "--start", "2026-03-02T11:00", "--end", "2026-03-02T11:30"],
    );
    assert_eq!(code, 1, "{stderr}");

    let reset = run_json(home.path(), &["user", "prefs", &user, "--reset"]);
    assert!(reset["max_events_per_day"].is_null());
    create_event(home.path(), &user, "Review", "2026-03-02T11:00", "2026-03-02T11:30");
}

#[test]
fn test_config_get_set() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "overload.daily_budget_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "480");

    let (_, _, code) = run_cli(home.path(), &["config", "set", "overload.daily_budget_minutes", "60"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "overload.daily_budget_minutes"]);
    assert_eq!(stdout.trim(), "60");

    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "no.such.key", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    let (_, _, code) = run_cli(home.path(), &["config", "set", "time_zone", "Mars/Olympus"]);
    assert_eq!(code, 1);
}

#[test]
fn test_unknown_user_fails() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["focus", "42", "--date", "2026-03-02"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("user 42 not found"), "{stderr}");
}
