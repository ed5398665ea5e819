// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj task` — create a task on an agent and inspect one by id (§4.13).

use oj_core::{AgentId, SessionId, TaskId, TaskKind};
use oj_wire::{Request, Response};

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

pub async fn create(
    client: &DaemonClient,
    agent_id: String,
    session_id: Option<String>,
    prompt: String,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let request = Request::CreateTask {
        agent_id: AgentId::from_string(agent_id),
        session_id: session_id.map(SessionId::from_string),
        kind: TaskKind::Chat,
        prompt,
    };
    let response = client.send(&request).await?;
    let task = match response {
        Response::Task(task) => *task,
        _ => anyhow::bail!("daemon returned an unexpected response to task create"),
    };

    format_or_json(format, &task, || {
        println!("task {} queued on {}", crate::color::header(&task.task_id.to_string()), task.agent_id);
        println!("session: {}", task.session_id);
    })
}

pub async fn show(client: &DaemonClient, task_id: String, format: OutputFormat) -> anyhow::Result<()> {
    let request = Request::GetTask { task_id: TaskId::from_string(task_id) };
    let response = client.send(&request).await?;
    let task = match response {
        Response::Task(task) => *task,
        _ => anyhow::bail!("daemon returned an unexpected response to task show"),
    };

    format_or_json(format, &task, || {
        println!("task: {}", task.task_id);
        println!("agent: {}", task.agent_id);
        println!("status: {}", task.status);
        println!("attempt: {}/{}", task.attempt, task.max_attempts);
        if let Some(output) = &task.output {
            println!("output:\n{output}");
        }
        if let Some(error) = &task.error {
            println!("error: {error}");
        }
    })
}
