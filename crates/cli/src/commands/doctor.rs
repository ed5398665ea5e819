// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj doctor` — local diagnostics: bus drop counters, per-agent queue
//! depths, and the most recent lease-recovery sweep's count (§4.13).

use oj_wire::{Request, Response};

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

pub async fn run(client: &DaemonClient, format: OutputFormat) -> anyhow::Result<()> {
    let response = client.send(&Request::Doctor).await?;
    let report = match response {
        Response::Doctor(report) => report,
        _ => anyhow::bail!("daemon returned an unexpected response to doctor"),
    };

    format_or_json(format, &report, || {
        println!("bus: {} published, {} dropped, {} subscribers",
            report.bus.published_total, report.bus.dropped_total, report.bus.subscriber_count);
        println!("leases recovered at last sweep: {}", report.leases_recovered_last_sweep);
        if report.queue_depths.is_empty() {
            println!("queue depths: none");
        } else {
            println!("queue depths:");
            let mut agents: Vec<_> = report.queue_depths.iter().collect();
            agents.sort_by_key(|(agent_id, _)| agent_id.to_string());
            for (agent_id, depth) in agents {
                println!("  {agent_id}: {depth}");
            }
        }
    })
}
