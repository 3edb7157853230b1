//! Argument-surface tests for the ghmeta binary.
//!
//! Nothing here talks to the network; these exercise clap wiring, the
//! store-backed subcommands, and error exit codes.

use assert_cmd::Command;

fn ghmeta() -> Command {
    let mut cmd = Command::cargo_bin("ghmeta").unwrap();
    // Keep ambient credentials out of the tests.
    cmd.env_remove("GITHUB_TOKEN").env_remove("GHMETA_DB");
    cmd
}

#[test]
fn help_lists_all_subcommands() {
    let assert = ghmeta().arg("--help").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    for subcommand in ["sync", "set-current", "cleanup", "limits"] {
        assert!(stdout.contains(subcommand), "missing {subcommand} in help");
    }
}

#[test]
fn sync_without_required_args_is_a_usage_error() {
    ghmeta().arg("sync").assert().failure().code(2);
}

#[test]
fn limits_without_token_is_a_usage_error() {
    ghmeta().arg("limits").assert().failure().code(2);
}

#[test]
fn set_current_rejects_a_hostile_tag() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("snapshots.db");

    ghmeta()
        .args(["set-current", "--db"])
        .arg(&db)
        .args(["--version", "v1'; DROP VIEW issues; --"])
        .assert()
        .failure()
        .code(4);
}

#[test]
fn set_current_and_cleanup_work_on_a_fresh_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("snapshots.db");

    ghmeta()
        .args(["set-current", "--db"])
        .arg(&db)
        .args(["--version", "v1"])
        .assert()
        .success();

    ghmeta()
        .args(["cleanup", "--db"])
        .arg(&db)
        .args(["--version", "v1"])
        .assert()
        .success();

    assert!(db.exists());
}
