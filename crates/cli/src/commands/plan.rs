// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj plan` — list known plans, trigger a run, and check a running
//! plan execution (§4.7, §4.13).

use std::io::Write;

use oj_core::{PlanExecId, SessionId};
use oj_wire::{Request, Response};

use crate::client::DaemonClient;
use crate::output::{format_or_json, handle_list, OutputFormat};

pub async fn list(client: &DaemonClient, format: OutputFormat) -> anyhow::Result<()> {
    let response = client.send(&Request::ListPlans).await?;
    let plans = match response {
        Response::Plans(plans) => plans,
        _ => anyhow::bail!("daemon returned an unexpected response to plan list"),
    };

    handle_list(format, &plans, "no plans configured", |plans, out| {
        for plan in plans {
            let _ = writeln!(out, "{:<24} {} step(s)", crate::color::header(&plan.name), plan.step_count);
        }
    })
}

pub async fn trigger(
    client: &DaemonClient,
    plan_name: String,
    session_id: String,
    user_input: String,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let request = Request::TriggerPlan {
        plan_name,
        session_id: SessionId::from_string(session_id),
        user_input,
    };
    let response = client.send(&request).await?;
    let exec_id = match response {
        Response::PlanStarted { exec_id } => exec_id,
        _ => anyhow::bail!("daemon returned an unexpected response to plan trigger"),
    };

    format_or_json(format, &serde_json::json!({ "exec_id": exec_id.to_string() }), || {
        println!("started plan execution {}", crate::color::header(&exec_id.to_string()));
    })
}

pub async fn show(client: &DaemonClient, exec_id: String, format: OutputFormat) -> anyhow::Result<()> {
    let request = Request::GetPlanExecution { exec_id: PlanExecId::from_string(exec_id) };
    let response = client.send(&request).await?;
    let execution = match response {
        Response::PlanExecution(execution) => *execution,
        _ => anyhow::bail!("daemon returned an unexpected response to plan status"),
    };

    format_or_json(format, &execution, || {
        println!("plan: {}", execution.plan_name);
        println!("status: {}", execution.status);
        println!("steps: {}/{} complete", execution.completed_steps, execution.total_steps);
        println!("cost: ${:.4}", execution.total_cost_usd);
        for (step_id, record) in &execution.steps {
            println!("  {step_id}: {}", record.status);
        }
    })
}
