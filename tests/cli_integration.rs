//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

const SCRIPT: &str = r#"
[hacenada]
name = "hola"
description = "nice little script ya got here"

[[step]]
type = "description"
message = "oh noo"
label = "q1"
stop = true

[[step]]
message = "shame if something were to happen to it"
"#;

/// A scratch project with a script and its own store home.
struct Project {
    dir: assert_fs::TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = assert_fs::TempDir::new().unwrap();
        dir.child("project/hola.toml").write_str(SCRIPT).unwrap();
        Self { dir }
    }

    fn script(&self) -> std::path::PathBuf {
        self.dir.child("project/hola.toml").path().to_path_buf()
    }

    /// Get the binary to test, run from the project directory.
    fn hacenada(&self) -> Command {
        let mut cmd = Command::cargo_bin("hacenada").unwrap();
        cmd.current_dir(self.dir.child("project").path())
            .env("HACENADA_HOME", self.dir.child("home").path())
            .env_remove("VISUAL")
            .env_remove("EDITOR");
        cmd
    }

    fn start(&self, input: &str) -> assert_cmd::assert::Assert {
        self.hacenada().arg("start").arg(self.script()).write_stdin(input).assert()
    }
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    Project::new()
        .hacenada()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("do-nothing").or(predicate::str::contains("Do-nothing")));
}

#[test]
fn test_version_flag() {
    Project::new()
        .hacenada()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_subcommand_fails() {
    Project::new().hacenada().assert().failure();
}

// ============================================================================
// Start Command Tests
// ============================================================================

#[test]
fn test_start_missing_script() {
    let project = Project::new();
    project
        .hacenada()
        .args(["start", "nope.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_start_invalid_script() {
    let project = Project::new();
    project.dir.child("project/broken.toml").write_str("[hacenada]\nname = \"x\"\n").unwrap();

    project
        .hacenada()
        .args(["start", "broken.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse script"));
}

#[test]
fn test_start_pauses_after_stop_step() {
    let project = Project::new();
    project
        .start("deploy 1.2\n")
        .success()
        .stdout(predicate::str::contains("[1/2] hola"))
        .stdout(predicate::str::contains("[q1]  oh noo"))
        .stdout(predicate::str::contains("---------------"));
}

#[test]
fn test_start_twice_is_refused() {
    let project = Project::new();
    project.start("first\n").success();

    project
        .start("second\n")
        .failure()
        .stderr(predicate::str::contains("already contains some answers"));
}

#[test]
fn test_start_over_archives_previous_session() {
    let project = Project::new();
    project.start("first\n").success();

    project
        .hacenada()
        .args(["start", "--start-over"])
        .arg(project.script())
        .write_stdin("second\n")
        .assert()
        .success();

    project.dir.child("project/hacenada-logs").assert(predicate::path::is_dir());
}

#[test]
fn test_end_of_input_cancels() {
    let project = Project::new();
    project.start("").success().stdout(predicate::str::contains("** Canceled at q1"));
}

// ============================================================================
// Next Command Tests
// ============================================================================

#[test]
fn test_next_finishes_and_writes_logs() {
    let project = Project::new();
    project.start("deploy 1.2\n").success();

    project
        .hacenada()
        .arg("next")
        .write_stdin("\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[2/2] deploy 1.2"))
        .stdout(predicate::str::contains("Cleaning up.  Log:"))
        .stdout(predicate::str::contains("deploy-1-2.md"));

    project.dir.child("project/hacenada-logs").assert(predicate::path::is_dir());

    // the session is gone
    project
        .hacenada()
        .arg("next")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No possible session found"));
}

#[test]
fn test_next_without_session() {
    let project = Project::new();
    project
        .hacenada()
        .args(["next", "hola.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No possible session found"));
}

#[test]
fn test_next_with_two_sessions_is_ambiguous() {
    let project = Project::new();
    project.dir.child("project/other.toml").write_str(SCRIPT).unwrap();
    project.start("one\n").success();
    project
        .hacenada()
        .args(["start", "other.toml"])
        .write_stdin("two\n")
        .assert()
        .success();

    project
        .hacenada()
        .arg("next")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Multiple possible sessions found"));

    project.hacenada().args(["next", "other.toml"]).write_stdin("y\n").assert().success();
}

#[test]
fn test_next_after_edit_is_stale() {
    let project = Project::new();
    project.start("first\n").success();
    project.dir.child("project/hola.toml").write_str(&SCRIPT.replace("oh noo", "oh yes")).unwrap();

    project
        .hacenada()
        .arg("next")
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--start-over"));
}

// ============================================================================
// Print Command Tests
// ============================================================================

#[test]
fn test_print_toml_without_session() {
    let project = Project::new();
    project
        .hacenada()
        .args(["print", "hola.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[hacenada]"))
        .stdout(predicate::str::contains("[[step]]"));
}

#[test]
fn test_print_markdown_with_answers() {
    let project = Project::new();
    project.start("printed\n").success();

    project
        .hacenada()
        .args(["print", "--format", "markdown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# hola"))
        .stdout(predicate::str::contains("**>> printed <<**"));

    project
        .hacenada()
        .args(["print", "--format", "markdown", "--no-answers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("**>>").not());
}

#[test]
fn test_print_json() {
    let project = Project::new();
    project
        .hacenada()
        .args(["print", "hola.toml", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"hacenada\""))
        .stdout(predicate::str::contains("\"label\": \"q1\""));
}

// ============================================================================
// Config & Completions Tests
// ============================================================================

#[test]
fn test_config_shows_defaults() {
    Project::new()
        .hacenada()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[storage]"))
        .stdout(predicate::str::contains("[logs]"));
}

#[test]
fn test_local_config_is_used() {
    let project = Project::new();
    project.dir.child("project/.hacenada.toml").write_str("[logs]\ndir = \"done\"\n").unwrap();

    project
        .hacenada()
        .args(["config", "--path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".hacenada.toml"));

    project.start("configured\n").success();
    project.hacenada().arg("next").write_stdin("\n").assert().success();
    project.dir.child("project/done").assert(predicate::path::is_dir());
}

#[test]
fn test_completions_bash() {
    Project::new()
        .hacenada()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hacenada"));
}
