// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable plan execution record (§3 PlanExecution). The plan *definition*
//! (DAG of steps) lives in `oj-plan`; this is the runtime/durable
//! projection the Store and the executor read and write.

use crate::session::SessionId;
use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

crate::define_id! {
    /// Unique identifier for one run of a plan.
    pub struct PlanExecId("pex-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanExecStatus {
    Running,
    Succeeded,
    Failed,
}

crate::simple_display! {
    PlanExecStatus {
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl PlanStepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStepStatus::Succeeded | PlanStepStatus::Failed)
    }
}

crate::simple_display! {
    PlanStepStatus {
        Pending => "pending",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
    }
}

/// Durable record of one step's execution within a [`PlanExecution`].
///
/// Persisted *before* the step's task is created (§4.7 step 1 note) so
/// resume can tell "planned but never dispatched" apart from "dispatched".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStepRecord {
    pub step_id: String,
    pub task_id: Option<TaskId>,
    pub status: PlanStepStatus,
    pub output: Option<String>,
    pub started_at_ms: Option<u64>,
    pub finished_at_ms: Option<u64>,
}

impl PlanStepRecord {
    pub fn pending(step_id: impl Into<String>) -> Self {
        PlanStepRecord {
            step_id: step_id.into(),
            task_id: None,
            status: PlanStepStatus::Pending,
            output: None,
            started_at_ms: None,
            finished_at_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanExecution {
    pub exec_id: PlanExecId,
    pub plan_name: String,
    pub session_id: SessionId,
    pub status: PlanExecStatus,
    pub total_steps: u32,
    pub completed_steps: u32,
    pub total_cost_usd: f64,
    pub created_at_ms: u64,
    pub completed_at_ms: Option<u64>,
    pub steps: BTreeMap<String, PlanStepRecord>,
}

impl PlanExecution {
    pub fn new(
        exec_id: PlanExecId,
        plan_name: impl Into<String>,
        session_id: SessionId,
        step_ids: &[String],
        created_at_ms: u64,
    ) -> Self {
        let steps = step_ids.iter().map(|id| (id.clone(), PlanStepRecord::pending(id))).collect();
        PlanExecution {
            exec_id,
            plan_name: plan_name.into(),
            session_id,
            status: PlanExecStatus::Running,
            total_steps: step_ids.len() as u32,
            completed_steps: 0,
            total_cost_usd: 0.0,
            created_at_ms,
            completed_at_ms: None,
            steps,
        }
    }

    pub fn all_terminal(&self) -> bool {
        self.steps.values().all(|s| s.status.is_terminal())
    }

    pub fn any_failed(&self) -> bool {
        self.steps.values().any(|s| s.status == PlanStepStatus::Failed)
    }
}

#[cfg(test)]
#[path = "plan_exec_tests.rs"]
mod tests;
