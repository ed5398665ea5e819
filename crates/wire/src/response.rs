// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC responses the daemon sends back to the CLI (§4.13, §6).

use std::collections::HashMap;

use oj_core::{AgentConfig, BusMetrics, PlanExecId, PlanExecution, SessionId, Task};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanSummary {
    pub name: String,
    pub step_count: usize,
}

/// `status`'s payload (§4.13): enough to answer "is the daemon alive and
/// roughly how busy is it" without a full `doctor` dump.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    pub uptime_secs: u64,
    pub agents_running: usize,
    pub tasks_queued: usize,
    pub tasks_running: usize,
    pub plans_running: usize,
}

/// `doctor`'s payload (§4.13): bus drop counters, per-agent queue depths,
/// and the most recent lease-recovery sweep's count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorReport {
    pub bus: BusMetrics,
    pub queue_depths: HashMap<String, usize>,
    pub leases_recovered_last_sweep: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Ok,
    Status(StatusSnapshot),
    Doctor(DoctorReport),
    Task(Box<Task>),
    Tasks(Vec<Task>),
    Agents(Vec<AgentConfig>),
    Plans(Vec<PlanSummary>),
    PlanExecution(Box<PlanExecution>),
    PlanStarted { exec_id: PlanExecId },
    SessionCreated { session_id: SessionId },
    Error { kind: String, message: String },
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
