use std::path::Path;
use std::process::Command;

use insta::assert_snapshot;
use insta_cmd::get_cargo_bin;
use serde_json::Value;

use crate::common::TestBase;

/// The binary pointed at `base`, with no user config or environment leaking in.
fn repodeck(base: &Path) -> Command {
    let mut cmd = Command::new(get_cargo_bin("repodeck"));
    cmd.arg("--config")
        .arg(base.join("no-config.toml"))
        .arg("--base")
        .arg(base)
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_CONFIG_SYSTEM", "/dev/null")
        .env_remove("REPO_BASE_PATH")
        .env_remove("RUST_LOG");
    cmd
}

fn run_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("Failed to run repodeck");
    assert!(
        output.status.success(),
        "repodeck failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_projects_lists_every_directory() {
    let base = TestBase::new();
    base.repo_with_commit("app");
    base.plain_dir("docs");

    let json = run_json(repodeck(base.path()).arg("projects"));
    let projects = json["projects"].as_array().unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0]["name"], "app");
    assert_eq!(projects[0]["snapshot"]["branch"], "main");
    assert_eq!(projects[0]["snapshot"]["worktrees"][0]["status"], "N/A");
    assert_eq!(projects[1]["name"], "docs");
    assert!(projects[1]["snapshot"].is_null());
}

#[test]
fn test_stats_shape() {
    let base = TestBase::new();
    base.repo_with_commit("app");

    let json = run_json(repodeck(base.path()).args(["stats", "--days", "3"]));
    assert_eq!(json["days_period"], 3);
    assert_eq!(json["day_distribution"].as_array().unwrap().len(), 7);
    assert_eq!(json["hour_distribution"].as_array().unwrap().len(), 24);
    assert_eq!(json["week_labels"].as_array().unwrap().len(), 7);
}

#[test]
fn test_worktrees_reports_current_branch() {
    let base = TestBase::new();
    base.repo_with_commit("app");

    let json = run_json(repodeck(base.path()).args(["worktrees", "app"]));
    assert_eq!(json["current_branch"], "main");
    assert_eq!(json["worktrees"][0]["is_primary"], true);
}

#[test]
fn test_unknown_repository_fails() {
    let base = TestBase::new();
    let output = repodeck(base.path())
        .args(["details", "missing"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("repository not found"));
}

#[test]
fn test_unknown_action_is_rejected() {
    let base = TestBase::new();
    base.repo_with_commit("app");
    let output = repodeck(base.path())
        .args(["action", "app", "push"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_pin_toggles_and_persists() {
    let base = TestBase::new();
    base.repo_with_commit("app");

    let pinned = run_json(repodeck(base.path()).args(["pin", "app"]));
    assert_eq!(pinned["is_pinned"], true);
    let content = std::fs::read_to_string(base.path().join(".my_dashboard/pinned_repos.json")).unwrap();
    assert_snapshot!(content, @r#"
    {
      "pinned": [
        "app"
      ]
    }
    "#);

    let json = run_json(repodeck(base.path()).arg("projects"));
    assert_eq!(json["projects"][0]["is_pinned"], true);

    let unpinned = run_json(repodeck(base.path()).args(["pin", "app"]));
    assert_eq!(unpinned["is_pinned"], false);
}

#[test]
fn test_saved_commands_round_trip_through_store() {
    let base = TestBase::new();
    base.repo_with_commit("app");

    let saved = run_json(repodeck(base.path()).args([
        "commands",
        "app",
        "--set",
        r#"[{"label": "Test", "cmd": "cargo test"}]"#,
    ]));
    assert_eq!(saved["commands"][0]["cmd"], "cargo test");

    let json = run_json(repodeck(base.path()).args(["commands", "app"]));
    assert_eq!(json["commands"].as_array().unwrap().len(), 1);
    let other = run_json(repodeck(base.path()).args(["commands", "lib"]));
    assert!(other["commands"].as_array().unwrap().is_empty());
}

#[test]
fn test_commands_from_legacy_location_are_kept() {
    let base = TestBase::new();
    base.repo_with_commit("app");
    std::fs::write(
        base.path().join("commands.json"),
        r#"{"app": [{"label": "Lint", "cmd": "cargo clippy"}]}"#,
    )
    .unwrap();

    let json = run_json(repodeck(base.path()).args(["commands", "app"]));
    assert_eq!(json["commands"][0]["label"], "Lint");
    assert!(base.path().join(".my_dashboard/commands.json").is_file());
}

#[test]
fn test_readme() {
    let base = TestBase::new();
    let repo = base.repo_with_commit("app");
    base.repo_with_commit("lib");
    std::fs::write(repo.path().join("readme.md"), "# App").unwrap();

    let json = run_json(repodeck(base.path()).args(["readme", "app"]));
    assert_eq!(json["content"], "# App");
    let missing = run_json(repodeck(base.path()).args(["readme", "lib"]));
    assert_eq!(missing["content"], "No README.md found in this repo.");
}
