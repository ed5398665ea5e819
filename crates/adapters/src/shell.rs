// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ShellExecutor` capability trait (§9 REDESIGN FLAGS): `{run(cmd, cwd,
//! env, deadline) -> Result<ShellOutput, Error>}`. [`TokioShellExecutor`]
//! is the thin subprocess transport a `tool` task's shell invocation runs
//! through; no shell-parsing or scripting engine ships here, matching this
//! codebase's established `bash -c` + timeout-wrapped subprocess idiom.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("shell command timed out after {0:?}")]
    Timeout(Duration),
    #[error("shell execution error: {0}")]
    Io(String),
}

#[async_trait]
pub trait ShellExecutor: Send + Sync + 'static {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        env: &HashMap<String, String>,
        deadline: Duration,
    ) -> Result<ShellOutput, ShellError>;
}

/// Runs `command` via `bash -c 'set -euo pipefail; <command>'`, matching
/// this codebase's established shell-effect execution.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioShellExecutor;

#[async_trait]
impl ShellExecutor for TokioShellExecutor {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        env: &HashMap<String, String>,
        deadline: Duration,
    ) -> Result<ShellOutput, ShellError> {
        let wrapped = format!("set -euo pipefail\n{command}");
        let mut cmd = tokio::process::Command::new("bash");
        cmd.arg("-c").arg(&wrapped).current_dir(cwd).envs(env);
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        let output = match tokio::time::timeout(deadline, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ShellError::Io(e.to_string())),
            Err(_) => return Err(ShellError::Timeout(deadline)),
        };

        Ok(ShellOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{ShellError, ShellExecutor, ShellOutput};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    pub struct ShellCall {
        pub command: String,
        pub cwd: PathBuf,
        pub env: HashMap<String, String>,
    }

    struct FakeShellState {
        calls: Vec<ShellCall>,
        scripted: VecDeque<Result<ShellOutput, ShellError>>,
    }

    /// Scriptable `ShellExecutor` for tool-task tests.
    #[derive(Clone)]
    pub struct FakeShellExecutor {
        inner: Arc<Mutex<FakeShellState>>,
    }

    impl Default for FakeShellExecutor {
        fn default() -> Self {
            Self { inner: Arc::new(Mutex::new(FakeShellState { calls: Vec::new(), scripted: VecDeque::new() })) }
        }
    }

    impl FakeShellExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_result(&self, result: Result<ShellOutput, ShellError>) {
            self.inner.lock().scripted.push_back(result);
        }

        pub fn calls(&self) -> Vec<ShellCall> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl ShellExecutor for FakeShellExecutor {
        async fn run(
            &self,
            command: &str,
            cwd: &Path,
            env: &HashMap<String, String>,
            _deadline: Duration,
        ) -> Result<ShellOutput, ShellError> {
            let mut inner = self.inner.lock();
            inner.calls.push(ShellCall { command: command.to_string(), cwd: cwd.to_path_buf(), env: env.clone() });
            inner.scripted.pop_front().unwrap_or(Ok(ShellOutput::default()))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeShellExecutor, ShellCall};

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
