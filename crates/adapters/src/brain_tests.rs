// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[tokio::test]
async fn fake_brain_defaults_to_empty_success() {
    let brain = FakeBrain::new();
    let out = brain.run("hello", Duration::from_secs(1)).await.unwrap();
    assert_eq!(out.text, "");
    assert_eq!(brain.calls().len(), 1);
    assert_eq!(brain.calls()[0].prompt, "hello");
}

#[tokio::test]
async fn fake_brain_replays_scripted_results_in_order() {
    let brain = FakeBrain::new();
    brain.push_success(BrainOutput { text: "first".into(), tokens_used: 10, cost_usd: 0.01 });
    brain.push_failure(BrainError::Transient("rate limited".into()));

    let first = brain.run("a", Duration::from_secs(1)).await.unwrap();
    assert_eq!(first.text, "first");

    let second = brain.run("b", Duration::from_secs(1)).await.unwrap_err();
    assert!(second.is_retryable());
}

#[tokio::test]
async fn fake_brain_delay_outlasts_a_short_timeout() {
    let brain = FakeBrain::new();
    brain.push_delay(Duration::from_millis(50));
    let result = tokio::time::timeout(Duration::from_millis(5), brain.run("slow", Duration::from_millis(5))).await;
    assert!(result.is_err());
}

#[test]
fn permanent_error_is_not_retryable() {
    let err = BrainError::Permanent("rejected".into());
    assert!(!err.is_retryable());
    let task_error: oj_core::TaskError = (&err).into();
    assert_eq!(task_error.kind, "permanent");
}

#[tokio::test]
async fn exec_brain_returns_trimmed_stdout() {
    let brain = ExecBrain::new("cat");
    let out = brain.run("hello from a task", Duration::from_secs(5)).await.unwrap();
    assert_eq!(out.text, "hello from a task");
}

#[tokio::test]
async fn exec_brain_reports_nonzero_exit_as_permanent() {
    let brain = ExecBrain::new("exit 3");
    let err = brain.run("ignored", Duration::from_secs(5)).await.unwrap_err();
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn exec_brain_times_out_a_command_that_never_returns() {
    let brain = ExecBrain::new("sleep 5");
    let err = brain.run("ignored", Duration::from_millis(50)).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn http_brain_returns_the_harness_response_body() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf).await.unwrap();
        let body = "model said hi";
        let response =
            format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}", body.len(), body);
        stream.write_all(response.as_bytes()).await.unwrap();
    });

    let brain = HttpBrain::new(addr.to_string(), "/run".to_string());
    let out = brain.run("hello", Duration::from_secs(5)).await.unwrap();
    assert_eq!(out.text, "model said hi");
}

#[tokio::test]
async fn http_brain_classifies_5xx_as_transient() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf).await.unwrap();
        let body = "overloaded";
        let response =
            format!("HTTP/1.1 503 Service Unavailable\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}", body.len(), body);
        stream.write_all(response.as_bytes()).await.unwrap();
    });

    let brain = HttpBrain::new(addr.to_string(), "/run".to_string());
    let err = brain.run("hello", Duration::from_secs(5)).await.unwrap_err();
    assert!(err.is_retryable());
}
