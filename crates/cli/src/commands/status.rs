// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj status` — probe the daemon's `/healthz`-equivalent (§4.13).

use oj_wire::{Request, Response};

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

pub async fn run(client: &DaemonClient, format: OutputFormat) -> anyhow::Result<()> {
    let response = client.send(&Request::Status).await?;
    let snapshot = match response {
        Response::Status(snapshot) => snapshot,
        _ => anyhow::bail!("daemon returned an unexpected response to status"),
    };

    format_or_json(format, &snapshot, || {
        println!("daemon: {}", crate::color::header("up"));
        println!("uptime: {}s", snapshot.uptime_secs);
        println!("agents running: {}", snapshot.agents_running);
        println!("tasks queued: {}", snapshot.tasks_queued);
        println!("tasks running: {}", snapshot.tasks_running);
        println!("plans running: {}", snapshot.plans_running);
    })
}
