//! Integration Tests for Non-Interactive Command Execution

#![cfg(unix)]

use release_verify::error::Error;
use release_verify::execution::{ShellCommand, ShellRunner};
use std::collections::HashMap;
use tempfile::TempDir;

#[tokio::test]
async fn test_runs_in_requested_directory() {
    let dir = TempDir::new().unwrap();
    let runner = ShellRunner::new();

    runner
        .run("pwd > where.txt", Some(dir.path()), None)
        .await
        .unwrap();

    let recorded = std::fs::read_to_string(dir.path().join("where.txt")).unwrap();
    let expected = dir.path().canonicalize().unwrap();
    assert_eq!(
        std::path::Path::new(recorded.trim()).canonicalize().unwrap(),
        expected
    );
}

#[tokio::test]
async fn test_default_working_directory() {
    let dir = TempDir::new().unwrap();
    let runner = ShellRunner::new().with_working_dir(dir.path().to_path_buf());

    runner.run("touch marker", None, None).await.unwrap();
    assert!(dir.path().join("marker").exists());
}

#[tokio::test]
async fn test_environment_replaces_inherited() {
    let dir = TempDir::new().unwrap();
    let mut env = HashMap::new();
    env.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
    env.insert("SEAFILE_TEST_VAR".to_string(), "from-map".to_string());

    let runner = ShellRunner::new();
    runner
        .run(
            r#"test "$SEAFILE_TEST_VAR" = from-map && test -z "$HOME""#,
            Some(dir.path()),
            Some(&env),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_argv_is_not_shell_interpreted() {
    let dir = TempDir::new().unwrap();
    let runner = ShellRunner::new();

    runner
        .run(
            ShellCommand::exec(["touch", "a file; with spaces"]),
            Some(dir.path()),
            None,
        )
        .await
        .unwrap();
    assert!(dir.path().join("a file; with spaces").exists());
}

#[tokio::test]
async fn test_failure_reports_exit_code() {
    let runner = ShellRunner::new();
    let err = runner
        .run(ShellCommand::exec(["/bin/sh", "-c", "exit 42"]), None, None)
        .await
        .unwrap_err();
    match err {
        Error::CommandFailed { command, exit_code } => {
            assert_eq!(command, "/bin/sh -c exit 42");
            assert_eq!(exit_code, Some(42));
        }
        other => panic!("expected CommandFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_dry_run_executes_nothing() {
    let dir = TempDir::new().unwrap();
    let runner = ShellRunner::new().with_dry_run(true);
    assert!(runner.is_dry_run());

    runner
        .run("touch should-not-exist; exit 1", Some(dir.path()), None)
        .await
        .unwrap();
    assert!(!dir.path().join("should-not-exist").exists());
}
