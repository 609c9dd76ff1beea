//! CLI integration tests: parsing, configuration and end-to-end commands
//! against temporary stores.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use common::{json, routine, setup};
use predicates::prelude::*;
use tempfile::TempDir;

const BACKENDS: [&str; 2] = ["redb", "file"];

// =============================================================================
// BASICS
// =============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    routine(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("recurring systems"));
}

#[test]
fn test_unknown_command_fails() {
    let tmp = TempDir::new().unwrap();
    routine(tmp.path())
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_system_list_is_fixed() {
    let tmp = TempDir::new().unwrap();
    let names = json(tmp.path(), &["system", "list"]);
    assert_eq!(
        names,
        serde_json::json!(["Daily", "Saturday", "Sunday", "Weekly", "Monthly"])
    );
}

// =============================================================================
// INIT
// =============================================================================

#[test]
fn test_init_creates_database() {
    for backend in BACKENDS {
        let tmp = TempDir::new().unwrap();
        routine(tmp.path())
            .args(["init", "-B", backend])
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized"));
        assert!(tmp.path().join("routine.db").exists());
    }
}

#[test]
fn test_init_refuses_existing_without_force() {
    let tmp = setup("redb");
    routine(tmp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    routine(tmp.path())
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn test_init_force_discards_data() {
    let tmp = setup("file");
    routine(tmp.path())
        .args(["steps", "add", "Stretch", "-B", "file"])
        .assert()
        .success();
    routine(tmp.path())
        .args(["init", "--force", "-B", "file"])
        .assert()
        .success();

    let steps = json(tmp.path(), &["steps", "list", "-B", "file"]);
    assert_eq!(steps.as_array().unwrap().len(), 0);
}

// =============================================================================
// STEPS AND GROUPS
// =============================================================================

#[test]
fn test_steps_add_and_list_by_name() {
    for backend in BACKENDS {
        let tmp = setup(backend);
        for (name, time) in [("Walk", "20"), ("Coffee", "5")] {
            routine(tmp.path())
                .args(["steps", "add", name, "--time", time, "-B", backend])
                .assert()
                .success()
                .stdout(predicate::str::contains("created"));
        }

        let steps = json(tmp.path(), &["steps", "list", "-B", backend]);
        let names: Vec<&str> = steps
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Coffee", "Walk"]);
        assert_eq!(steps[0]["icon"], "➡️");
    }
}

#[test]
fn test_duplicate_step_name_fails() {
    let tmp = setup("redb");
    routine(tmp.path())
        .args(["steps", "add", "Read"])
        .assert()
        .success();
    routine(tmp.path())
        .args(["steps", "add", "Read"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let steps = json(tmp.path(), &["steps", "list"]);
    assert_eq!(steps.as_array().unwrap().len(), 1);
}

#[test]
fn test_group_with_steps_and_total() {
    for backend in BACKENDS {
        let tmp = setup(backend);
        for (name, time) in [("Shower", "10"), ("Dress", "5")] {
            routine(tmp.path())
                .args(["steps", "add", name, "-t", time, "-B", backend])
                .assert()
                .success();
        }
        routine(tmp.path())
            .args(["groups", "add", "Morning", "--steps", "2,1", "-B", backend])
            .assert()
            .success();

        let detail = json(tmp.path(), &["groups", "show", "1", "-B", backend]);
        assert_eq!(detail["total_time"], 15);
        assert_eq!(detail["steps"][0]["name"], "Dress");
        assert_eq!(detail["steps"][1]["name"], "Shower");
        assert_eq!(detail["group"]["icon"], "📦");
    }
}

#[test]
fn test_group_edit_with_unknown_step_changes_nothing() {
    let tmp = setup("redb");
    routine(tmp.path())
        .args(["steps", "add", "Tea", "-t", "4"])
        .assert()
        .success();
    routine(tmp.path())
        .args(["groups", "add", "Break", "--steps", "1"])
        .assert()
        .success();

    routine(tmp.path())
        .args(["groups", "edit", "1", "Long break", "--steps", "1,9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Step not found: 9"));

    let detail = json(tmp.path(), &["groups", "show", "1"]);
    assert_eq!(detail["group"]["name"], "Break");
    assert_eq!(detail["steps"].as_array().unwrap().len(), 1);
}

#[test]
fn test_group_edit_without_steps_keeps_sequence() {
    let tmp = setup("file");
    routine(tmp.path())
        .args(["steps", "add", "Tea", "-t", "4", "-B", "file"])
        .assert()
        .success();
    routine(tmp.path())
        .args(["groups", "add", "Break", "--steps", "1", "-B", "file"])
        .assert()
        .success();
    routine(tmp.path())
        .args(["groups", "edit", "1", "Tea break", "-B", "file"])
        .assert()
        .success();

    let detail = json(tmp.path(), &["groups", "show", "1", "-B", "file"]);
    assert_eq!(detail["group"]["name"], "Tea break");
    assert_eq!(detail["total_time"], 4);
}

#[test]
fn test_step_rm_cascades() {
    let tmp = setup("redb");
    routine(tmp.path())
        .args(["steps", "add", "Floss", "-t", "2"])
        .assert()
        .success();
    routine(tmp.path())
        .args(["groups", "add", "Night", "--steps", "1"])
        .assert()
        .success();
    routine(tmp.path())
        .args(["system", "set", "Daily", "step-1", "group-1"])
        .assert()
        .success();

    let deleted = json(tmp.path(), &["steps", "rm", "1"]);
    assert_eq!(deleted["group_steps_removed"], 1);
    assert_eq!(deleted["system_items_removed"], 1);

    let daily = json(tmp.path(), &["system", "show", "Daily"]);
    assert_eq!(daily["items"].as_array().unwrap().len(), 1);
    assert_eq!(daily["items"][0]["type"], "group");
    assert_eq!(daily["total_time"], 0);
}

// =============================================================================
// SYSTEMS
// =============================================================================

#[test]
fn test_system_set_skips_missing_refs() {
    for backend in BACKENDS {
        let tmp = setup(backend);
        routine(tmp.path())
            .args(["steps", "add", "Meditate", "-t", "10", "-B", backend])
            .assert()
            .success();

        routine(tmp.path())
            .args(["system", "set", "Daily", "step-1", "group-99", "-B", backend])
            .assert()
            .success()
            .stdout(predicate::str::contains("1 items stored, 1 skipped"))
            .stderr(predicate::str::contains("group-99"));

        let daily = json(tmp.path(), &["system", "show", "Daily", "-B", backend]);
        let items = daily["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["type"], "step");
        assert_eq!(items[0]["id"], 1);
        assert_eq!(daily["total_time"], 10);
    }
}

#[test]
fn test_invalid_system_name_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    routine(tmp.path())
        .args(["system", "set", "Invalid", "step-1", "-B", "file"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid system name"));
    assert!(!tmp.path().join("routine.db").exists());
}

#[test]
fn test_bad_item_reference_rejected() {
    let tmp = setup("redb");
    routine(tmp.path())
        .args(["system", "set", "Weekly", "task-3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid item reference"));
}

#[test]
fn test_status_is_default_command() {
    let tmp = setup("redb");
    routine(tmp.path())
        .args(["steps", "add", "Plan", "-t", "30"])
        .assert()
        .success();
    routine(tmp.path())
        .args(["system", "set", "Monthly", "step-1"])
        .assert()
        .success();

    let dashboard = json(tmp.path(), &[]);
    assert_eq!(dashboard["step_count"], 1);
    assert_eq!(dashboard["systems"].as_array().unwrap().len(), 5);
    assert_eq!(dashboard["systems"][4]["system"], "Monthly");
    assert_eq!(dashboard["systems"][4]["total_time"], 30);
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[test]
fn test_database_from_environment() {
    let tmp = TempDir::new().unwrap();
    routine(tmp.path())
        .env("ROUTINE_DATABASE", "env.db")
        .env("ROUTINE_BACKEND", "file")
        .arg("init")
        .assert()
        .success();
    assert!(tmp.path().join("env.db").exists());
    assert!(!tmp.path().join("routine.db").exists());
}

#[test]
fn test_config_file_in_working_directory() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("routine.toml"),
        "database = \"from-toml.db\"\nbackend = \"file\"\n",
    )
    .unwrap();

    routine(tmp.path()).arg("init").assert().success();
    assert!(tmp.path().join("from-toml.db").exists());

    // Flag beats file
    routine(tmp.path())
        .args(["init", "-D", "from-flag.db"])
        .assert()
        .success();
    assert!(tmp.path().join("from-flag.db").exists());
}

#[test]
fn test_invalid_config_file_fails() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("bad.toml"), "backend = \"sqlite\"\n").unwrap();
    routine(tmp.path())
        .args(["status", "--config", "bad.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config"));
}

#[test]
fn test_json_logs_on_stderr() {
    let tmp = TempDir::new().unwrap();
    let output = routine(tmp.path())
        .env("ROUTINE_LOG_FORMAT", "json")
        .args(["steps", "add", "Water", "-B", "file", "--json-mode"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let step: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(step["name"], "Water");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("\"step created\""));
}

// =============================================================================
// FILE BACKEND AND MAINTENANCE
// =============================================================================

#[test]
fn test_file_save_keeps_previous_snapshot_intact() {
    let tmp = setup("file");
    routine(tmp.path())
        .args(["steps", "add", "Stretch", "-B", "file"])
        .assert()
        .success();
    std::fs::hard_link(
        tmp.path().join("routine.db"),
        tmp.path().join("previous.db"),
    )
    .unwrap();

    routine(tmp.path())
        .args(["steps", "add", "Read", "-B", "file"])
        .assert()
        .success();

    let previous = json(tmp.path(), &["steps", "list", "-B", "file", "-D", "previous.db"]);
    assert_eq!(previous.as_array().unwrap().len(), 1);
    let current = json(tmp.path(), &["steps", "list", "-B", "file"]);
    assert_eq!(current.as_array().unwrap().len(), 2);
}

#[test]
fn test_compact_keeps_data() {
    for backend in BACKENDS {
        let tmp = setup(backend);
        for name in ["Stretch", "Read"] {
            routine(tmp.path())
                .args(["steps", "add", name, "-B", backend])
                .assert()
                .success();
        }
        routine(tmp.path())
            .args(["steps", "rm", "1", "-B", backend])
            .assert()
            .success();

        let report = json(tmp.path(), &["compact", "-B", backend]);
        assert_eq!(report["backend"], backend);
        assert!(report["bytes"].as_u64().unwrap() > 0);

        let steps = json(tmp.path(), &["steps", "list", "-B", backend]);
        assert_eq!(steps.as_array().unwrap().len(), 1);
        assert_eq!(steps[0]["name"], "Read");
    }
}

#[test]
fn test_steps_list_shows_cleaned_tags() {
    let tmp = setup("redb");
    routine(tmp.path())
        .args(["steps", "add", "Run", "--tags", "health,, outdoor "])
        .assert()
        .success();
    routine(tmp.path())
        .args(["steps", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("health, outdoor"));
}

#[test]
fn test_skipped_refs_use_item_text_form_in_json() {
    let tmp = setup("redb");
    let report = json(tmp.path(), &["system", "set", "Daily", "group-99"]);
    assert_eq!(report["stored"], 0);
    assert_eq!(report["skipped"][0]["item"], "group-99");
    assert_eq!(report["skipped"][0]["position"], 0);
}
