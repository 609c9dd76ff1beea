//! Shared helpers for CLI integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use assert_cmd::Command;
use assert_cmd::cargo;
use std::path::Path;
use tempfile::TempDir;

/// A `routine` command isolated from the caller's environment and run
/// inside `dir`.
pub fn routine(dir: &Path) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("routine"));
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("ROUTINE_DATABASE")
        .env_remove("ROUTINE_BACKEND")
        .env_remove("ROUTINE_CONFIG")
        .env_remove("ROUTINE_LOG_FORMAT");
    cmd
}

/// Run a command with `--json-mode` and parse its stdout.
pub fn json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let output = routine(dir)
        .args(args)
        .arg("--json-mode")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

/// A temp dir with an initialized store for `backend`.
pub fn setup(backend: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    routine(tmp.path())
        .args(["init", "-B", backend])
        .assert()
        .success();
    tmp
}
