// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC requests the CLI (`oj`) sends to a running daemon (§4.13, §6): task
//! creation, session history, system status, and plan listing/trigger.

use oj_core::{AgentId, PlanExecId, SessionId, TaskId, TaskKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Probe the daemon's `/healthz`-equivalent (§4.13 `status`).
    Status,
    /// Local diagnostics: bus drop counters, queue depths, lease-recovery
    /// counts (§4.13 `doctor`).
    Doctor,
    /// Create a task on `agent_id`. `session_id` of `None` starts a fresh
    /// session.
    CreateTask {
        agent_id: AgentId,
        #[serde(default)]
        session_id: Option<SessionId>,
        kind: TaskKind,
        prompt: String,
    },
    GetTask {
        task_id: TaskId,
    },
    /// Every task in `session_id`, oldest first.
    GetSessionHistory {
        session_id: SessionId,
    },
    ListAgents,
    /// Every known plan definition's name and step count.
    ListPlans,
    /// Start a run of `plan_name` in `session_id`, substituting
    /// `{user_input}` into step prompts.
    TriggerPlan {
        plan_name: String,
        session_id: SessionId,
        user_input: String,
    },
    GetPlanExecution {
        exec_id: PlanExecId,
    },
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
