// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment variable overrides the core reads at startup (§6). Applied
//! after file config parsing and before validation, so a bad override
//! fails startup fast rather than silently misconfiguring a running agent.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_HOME_DIRNAME: &str = ".goclaw";

/// Home directory override (default `${HOME}/.goclaw`, §6).
pub fn home_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("GOCLAW_HOME") {
        return PathBuf::from(dir);
    }
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(DEFAULT_HOME_DIRNAME)
}

/// Worker-count override applied to every agent's `workers` field.
pub fn worker_count_override() -> Option<u32> {
    std::env::var("GOCLAW_WORKER_COUNT").ok().and_then(|s| s.parse().ok())
}

/// Task-timeout override (seconds) applied to every agent's `task_timeout_ms`.
pub fn task_timeout_seconds_override() -> Option<u64> {
    std::env::var("GOCLAW_TASK_TIMEOUT_SECONDS").ok().and_then(|s| s.parse().ok())
}

/// Listener bind address, e.g. `127.0.0.1:4777`. `None` means unix-socket-only.
pub fn bind_address() -> Option<String> {
    std::env::var("GOCLAW_BIND_ADDRESS").ok().filter(|s| !s.is_empty())
}

/// `tracing_subscriber::EnvFilter` directive (default `info`).
pub fn log_level() -> String {
    std::env::var("GOCLAW_LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
}

pub fn drain_timeout() -> Duration {
    std::env::var("GOCLAW_DRAIN_TIMEOUT_SECONDS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(5))
}

pub fn heartbeat_interval() -> Duration {
    std::env::var("GOCLAW_HEARTBEAT_INTERVAL_MINUTES")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(|m| Duration::from_secs(m * 60))
        .unwrap_or(Duration::from_secs(60 * 60))
}

/// Per-provider API key override, e.g. `provider = "anthropic"` reads
/// `GOCLAW_ANTHROPIC_API_KEY`.
pub fn provider_api_key(provider: &str) -> Option<String> {
    let var = format!("GOCLAW_{}_API_KEY", provider.to_uppercase());
    std::env::var(var).ok().filter(|s| !s.is_empty())
}

/// `host:port` the `HttpBrain` transport connects to for agents configured
/// with `provider = "http"` (§1: "local HTTP harness").
pub fn brain_http_address() -> String {
    std::env::var("GOCLAW_BRAIN_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:4780".to_string())
}

/// Command `ExecBrain` runs for an agent whose `provider` is anything other
/// than `"http"` (§1: "container exec"), e.g. `GOCLAW_DOCKER_BRAIN_COMMAND`
/// for `provider = "docker"`. Defaults to invoking a same-named binary.
pub fn brain_exec_command(provider: &str) -> String {
    let var = format!("GOCLAW_{}_BRAIN_COMMAND", provider.to_uppercase());
    std::env::var(var).unwrap_or_else(|_| format!("{provider}-brain"))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
