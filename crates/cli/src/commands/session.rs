// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj session history` — every task in a session, oldest first (§4.13).

use std::io::Write;

use oj_core::SessionId;
use oj_wire::{Request, Response};

use crate::client::DaemonClient;
use crate::output::{handle_list, OutputFormat};

pub async fn history(client: &DaemonClient, session_id: String, format: OutputFormat) -> anyhow::Result<()> {
    let request = Request::GetSessionHistory { session_id: SessionId::from_string(session_id) };
    let response = client.send(&request).await?;
    let tasks = match response {
        Response::Tasks(tasks) => tasks,
        _ => anyhow::bail!("daemon returned an unexpected response to session history"),
    };

    handle_list(format, &tasks, "no tasks in this session", |tasks, out| {
        for task in tasks {
            let _ = writeln!(
                out,
                "{:<24} {:<10} {:<10} {}",
                crate::color::header(&task.task_id.to_string()),
                task.agent_id,
                task.status,
                task.prompt.lines().next().unwrap_or(""),
            );
        }
    })
}
