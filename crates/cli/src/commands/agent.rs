// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj agent list` — every configured agent and its pool size (§4.13).

use std::io::Write;

use oj_wire::{Request, Response};

use crate::client::DaemonClient;
use crate::output::{handle_list, OutputFormat};

pub async fn list(client: &DaemonClient, format: OutputFormat) -> anyhow::Result<()> {
    let response = client.send(&Request::ListAgents).await?;
    let agents = match response {
        Response::Agents(agents) => agents,
        _ => anyhow::bail!("daemon returned an unexpected response to agent list"),
    };

    handle_list(format, &agents, "no agents configured", |agents, out| {
        for agent in agents {
            let _ = writeln!(
                out,
                "{:<24} {:<10} {:<10} workers={} hops={}",
                crate::color::header(&agent.agent_id.to_string()),
                agent.provider,
                agent.model,
                agent.workers,
                agent.delegation_max_hops,
            );
        }
    })
}
