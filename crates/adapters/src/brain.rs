// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Brain` capability trait (§4.3, §9 REDESIGN FLAGS): the coordination
//! core's only seam into LLM provider integration. This crate ships no
//! concrete provider transport — prompting, tool-call parsing, and model
//! selection are explicit non-goals (§1) that live outside this workspace;
//! callers inject whatever `Brain` implementation wires those up.

use async_trait::async_trait;
use oj_core::TaskError;
use std::time::Duration;

/// Output of a single Brain turn, enough for a worker to call
/// `Store::complete_task` directly.
#[derive(Debug, Clone, PartialEq)]
pub struct BrainOutput {
    pub text: String,
    pub tokens_used: u64,
    pub cost_usd: f64,
}

/// Errors a `Brain` implementation can report. The transient/permanent
/// split is exactly the one a worker uses to decide `fail_task(retry=...)`
/// (§7) — `Timeout` is not a variant here because that classification is
/// the worker's own, produced when the `tokio::time::timeout` around the
/// call expires rather than by the Brain itself.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrainError {
    #[error("transient: {0}")]
    Transient(String),
    #[error("permanent: {0}")]
    Permanent(String),
}

impl BrainError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrainError::Transient(_))
    }
}

impl From<&BrainError> for TaskError {
    fn from(err: &BrainError) -> Self {
        let kind = if err.is_retryable() { "transient" } else { "permanent" };
        TaskError { kind: kind.to_string(), message: err.to_string() }
    }
}

/// `{run(prompt, deadline) -> Result<Output, Error>}` (§9). `deadline` is a
/// hint to well-behaved implementations (e.g. an HTTP client timeout); the
/// worker additionally races this future against its own
/// `tokio::time::timeout` so a `Brain` that ignores it cannot wedge a
/// worker past the task's lease.
#[async_trait]
pub trait Brain: Send + Sync + 'static {
    async fn run(&self, prompt: &str, deadline: Duration) -> Result<BrainOutput, BrainError>;
}

/// Talks to a local provider harness over a bare HTTP/1.1 request, no
/// `reqwest`/`hyper` dependency, matching this workspace's established
/// raw-socket HTTP idiom for sidecar processes. `addr` is a `host:port`
/// pair; the harness is expected to accept a JSON body `{"prompt": ...}`
/// at `path` and reply with a `text/plain` body that becomes
/// [`BrainOutput::text`] verbatim (tokens/cost are not reported by this
/// transport, since counting them is a provider-side concern outside
/// this crate's non-goals).
pub struct HttpBrain {
    addr: String,
    path: String,
}

impl HttpBrain {
    pub fn new(addr: impl Into<String>, path: impl Into<String>) -> Self {
        Self { addr: addr.into(), path: path.into() }
    }
}

#[async_trait]
impl Brain for HttpBrain {
    async fn run(&self, prompt: &str, deadline: Duration) -> Result<BrainOutput, BrainError> {
        let body = serde_json::json!({ "prompt": prompt }).to_string();
        let text = tokio::time::timeout(deadline, self.send(&body))
            .await
            .map_err(|_| BrainError::Transient(format!("request to {} timed out", self.addr)))??;
        Ok(BrainOutput { text, tokens_used: 0, cost_usd: 0.0 })
    }
}

impl HttpBrain {
    async fn send(&self, body: &str) -> Result<String, BrainError> {
        use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

        let mut stream = tokio::net::TcpStream::connect(&self.addr)
            .await
            .map_err(|err| BrainError::Transient(format!("connecting to {}: {err}", self.addr)))?;

        let request = format!(
            "POST {} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.path,
            body.len(),
            body
        );
        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|err| BrainError::Transient(format!("writing request: {err}")))?;

        let mut reader = BufReader::new(stream);
        let mut status_line = String::new();
        reader
            .read_line(&mut status_line)
            .await
            .map_err(|err| BrainError::Transient(format!("reading status line: {err}")))?;
        let status = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| BrainError::Permanent(format!("malformed status line: {status_line:?}")))?;

        let mut content_length = 0usize;
        loop {
            let mut header = String::new();
            reader
                .read_line(&mut header)
                .await
                .map_err(|err| BrainError::Transient(format!("reading headers: {err}")))?;
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some(value) = header.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }

        let mut body = vec![0u8; content_length];
        reader
            .read_exact(&mut body)
            .await
            .map_err(|err| BrainError::Transient(format!("reading body: {err}")))?;
        let body = String::from_utf8_lossy(&body).into_owned();

        if (500..600).contains(&status) {
            return Err(BrainError::Transient(format!("harness returned {status}: {body}")));
        }
        if status != 200 {
            return Err(BrainError::Permanent(format!("harness returned {status}: {body}")));
        }
        Ok(body)
    }
}

/// Runs a configured command as one Brain turn, the prompt piped on
/// stdin and the trimmed stdout taken as the output text. `command` is
/// typically a `docker exec`/`kubectl exec` invocation that hands the
/// prompt to a model running in a container, matching this crate's
/// other subprocess transport ([`crate::shell::TokioShellExecutor`]).
pub struct ExecBrain {
    command: String,
}

impl ExecBrain {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }
}

#[async_trait]
impl Brain for ExecBrain {
    async fn run(&self, prompt: &str, deadline: Duration) -> Result<BrainOutput, BrainError> {
        use tokio::io::AsyncWriteExt;

        let mut child = tokio::process::Command::new("bash")
            .arg("-c")
            .arg(&self.command)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|err| BrainError::Transient(format!("spawning '{}': {err}", self.command)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|err| BrainError::Transient(format!("writing prompt to stdin: {err}")))?;
        }

        let output = tokio::time::timeout(deadline, child.wait_with_output())
            .await
            .map_err(|_| BrainError::Transient(format!("'{}' timed out", self.command)))?
            .map_err(|err| BrainError::Transient(format!("waiting on '{}': {err}", self.command)))?;

        if !output.status.success() {
            return Err(BrainError::Permanent(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(BrainOutput { text: String::from_utf8_lossy(&output.stdout).trim().to_string(), tokens_used: 0, cost_usd: 0.0 })
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{Brain, BrainError, BrainOutput};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    /// One recorded call to [`FakeBrain::run`].
    #[derive(Debug, Clone)]
    pub struct BrainCall {
        pub prompt: String,
        pub deadline: Duration,
    }

    enum Scripted {
        Succeed(BrainOutput),
        Fail(BrainError),
        Delay(Duration),
    }

    struct FakeBrainState {
        calls: Vec<BrainCall>,
        scripted: VecDeque<Scripted>,
    }

    /// Scriptable `Brain` for worker-pool and delegation tests. Defaults to
    /// succeeding with an empty output when no script entry is queued.
    #[derive(Clone)]
    pub struct FakeBrain {
        inner: Arc<Mutex<FakeBrainState>>,
    }

    impl Default for FakeBrain {
        fn default() -> Self {
            Self { inner: Arc::new(Mutex::new(FakeBrainState { calls: Vec::new(), scripted: VecDeque::new() })) }
        }
    }

    impl FakeBrain {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_success(&self, output: BrainOutput) {
            self.inner.lock().scripted.push_back(Scripted::Succeed(output));
        }

        pub fn push_failure(&self, err: BrainError) {
            self.inner.lock().scripted.push_back(Scripted::Fail(err));
        }

        /// Queue a call that sleeps `duration` before producing the default
        /// success output — used to exercise worker-side timeout handling.
        pub fn push_delay(&self, duration: Duration) {
            self.inner.lock().scripted.push_back(Scripted::Delay(duration));
        }

        pub fn calls(&self) -> Vec<BrainCall> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl Brain for FakeBrain {
        async fn run(&self, prompt: &str, deadline: Duration) -> Result<BrainOutput, BrainError> {
            let next = {
                let mut inner = self.inner.lock();
                inner.calls.push(BrainCall { prompt: prompt.to_string(), deadline });
                inner.scripted.pop_front()
            };
            match next {
                Some(Scripted::Succeed(output)) => Ok(output),
                Some(Scripted::Fail(err)) => Err(err),
                Some(Scripted::Delay(duration)) => {
                    tokio::time::sleep(duration).await;
                    Ok(BrainOutput { text: String::new(), tokens_used: 0, cost_usd: 0.0 })
                }
                None => Ok(BrainOutput { text: String::new(), tokens_used: 0, cost_usd: 0.0 }),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{BrainCall, FakeBrain};

#[cfg(test)]
#[path = "brain_tests.rs"]
mod tests;
