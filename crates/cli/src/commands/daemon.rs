// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj daemon` — daemon process control (§4.13): `-daemon` runs `ojd`
//! non-interactively in the background; `start`/`stop`/`restart`/`status`
//! manage that process from the pid file it writes at `<home>/daemon.pid`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use crate::output::{format_or_json, OutputFormat};

pub async fn start(home: &Path, foreground: bool) -> Result<()> {
    if read_pid(home).is_some() {
        return Err(ExitError::new(1, format!("ojd is already running ({})", home.join("daemon.pid").display())).into());
    }

    let ojd_path = find_ojd_binary()?;
    if foreground {
        let status = std::process::Command::new(&ojd_path).status()?;
        if !status.success() {
            return Err(ExitError::new(1, format!("daemon exited with status: {status}")).into());
        }
        return Ok(());
    }

    std::process::Command::new(&ojd_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()?;

    for _ in 0..50 {
        if read_pid(home).is_some() {
            println!("ojd started");
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(ExitError::new(1, "ojd did not report ready in time").into())
}

pub async fn stop(home: &Path) -> Result<()> {
    let pid = read_pid(home).ok_or_else(|| ExitError::new(1, "ojd is not running"))?;
    signal::kill(Pid::from_raw(pid), Signal::SIGTERM)?;
    println!("sent SIGTERM to ojd (pid {pid})");
    Ok(())
}

pub async fn restart(home: &Path) -> Result<()> {
    if read_pid(home).is_some() {
        stop(home).await?;
        for _ in 0..50 {
            if read_pid(home).is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
    start(home, false).await
}

pub async fn status(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    if client.connect().await.is_err() {
        return format_or_json(format, &serde_json::json!({ "running": false }), || {
            println!("ojd is not running");
        });
    }
    crate::commands::status::run(client, format).await
}

fn read_pid(home: &Path) -> Option<i32> {
    let content = std::fs::read_to_string(home.join("daemon.pid")).ok()?;
    let pid: i32 = content.trim().parse().ok()?;
    signal::kill(Pid::from_raw(pid), None).ok()?;
    Some(pid)
}

/// Prefer a sibling `ojd` next to the running `oj` binary, matching how the
/// two are shipped together; fall back to `$PATH`.
fn find_ojd_binary() -> Result<PathBuf> {
    if let Ok(current_exe) = std::env::current_exe() {
        if let Some(dir) = current_exe.parent() {
            let sibling = dir.join("ojd");
            if sibling.exists() {
                return Ok(sibling);
            }
        }
    }
    Ok(PathBuf::from("ojd"))
}
