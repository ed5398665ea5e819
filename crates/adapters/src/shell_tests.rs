// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use std::time::Duration;

#[tokio::test]
async fn tokio_shell_executor_captures_stdout_and_exit_code() {
    let exec = TokioShellExecutor;
    let cwd = std::env::temp_dir();
    let out = exec.run("echo hi", &cwd, &HashMap::new(), Duration::from_secs(5)).await.unwrap();
    assert!(out.success());
    assert_eq!(out.stdout.trim(), "hi");
}

#[tokio::test]
async fn tokio_shell_executor_reports_nonzero_exit() {
    let exec = TokioShellExecutor;
    let cwd = std::env::temp_dir();
    let out = exec.run("exit 3", &cwd, &HashMap::new(), Duration::from_secs(5)).await.unwrap();
    assert_eq!(out.exit_code, 3);
    assert!(!out.success());
}

#[tokio::test]
async fn tokio_shell_executor_times_out() {
    let exec = TokioShellExecutor;
    let cwd = std::env::temp_dir();
    let result = exec.run("sleep 5", &cwd, &HashMap::new(), Duration::from_millis(20)).await;
    assert!(matches!(result, Err(ShellError::Timeout(_))));
}

#[tokio::test]
async fn fake_shell_executor_records_calls_and_replays_script() {
    let exec = FakeShellExecutor::new();
    exec.push_result(Ok(ShellOutput { exit_code: 0, stdout: "ok".into(), stderr: String::new() }));
    let out = exec.run("whatever", std::path::Path::new("/tmp"), &HashMap::new(), Duration::from_secs(1)).await.unwrap();
    assert_eq!(out.stdout, "ok");
    assert_eq!(exec.calls().len(), 1);
    assert_eq!(exec.calls()[0].command, "whatever");
}
