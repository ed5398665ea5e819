// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation log entries (§4.2): what the [`crate::Wal`] actually persists.
//!
//! A [`Record`] carries everything [`crate::state::MaterializedState::apply`]
//! needs to reconstruct a row from scratch on replay — richer than the
//! notification-shaped [`oj_core::Event`] published on the bus after a
//! commit. [`Record::as_bus_event`] projects the (usually smaller) bus
//! event a given record implies, when one applies.

use oj_core::{
    AgentConfig, AgentId, CronJobRecord, Event, PlanExecId, PlanExecStatus, PlanExecution,
    PlanStepRecord, Session, Task, TaskContextEntry, TaskError, TaskId, WorkerId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Record {
    AgentUpserted { config: AgentConfig },
    AgentRemoved { agent_id: AgentId },
    SessionCreated { session: Session },
    TaskEnqueued { task: Task },
    TaskLeased { task_id: TaskId, agent_id: AgentId, worker_id: WorkerId, lease_expires_at_ms: u64 },
    TaskMarkedRunning { task_id: TaskId, agent_id: AgentId, started_at_ms: u64 },
    TaskCompleted {
        task_id: TaskId,
        agent_id: AgentId,
        output: String,
        tokens_used: u64,
        cost_usd: f64,
        finished_at_ms: u64,
    },
    TaskFailed { task_id: TaskId, agent_id: AgentId, error: TaskError, will_retry: bool, finished_at_ms: u64 },
    TaskDeadLettered { task_id: TaskId, agent_id: AgentId, reason: String, finished_at_ms: u64 },
    TaskCanceled { task_id: TaskId, agent_id: AgentId, finished_at_ms: u64 },
    TaskRequeued { task_id: TaskId },
    ParentTaskSet { child_id: TaskId, parent_id: TaskId },
    TaskContextSet { entry: TaskContextEntry },
    PlanExecutionCreated { exec: PlanExecution },
    PlanStepUpserted { exec_id: PlanExecId, step: PlanStepRecord },
    PlanExecutionCompleted {
        exec_id: PlanExecId,
        status: PlanExecStatus,
        total_cost_usd: f64,
        completed_at_ms: u64,
    },
    CronUpserted { cron: CronJobRecord },
    CronRemoved { name: String },
    RetentionSwept { task_cutoff_ms: u64, plan_cutoff_ms: u64 },
}

impl Record {
    /// The bus-facing event this record implies, if any. Retention sweeps,
    /// agent/cron upserts, and context writes have no corresponding bus
    /// topic (§4.1 lists only task/plan/delegation/hitl/tools/config
    /// topics) and return `None`.
    pub fn as_bus_event(&self) -> Option<Event> {
        match self {
            Record::TaskEnqueued { task } => {
                Some(Event::TaskQueued { task_id: task.task_id, agent_id: task.agent_id })
            }
            Record::TaskLeased { task_id, agent_id, worker_id, .. } => {
                Some(Event::TaskLeased { task_id: *task_id, agent_id: *agent_id, worker: worker_id.to_string() })
            }
            Record::TaskMarkedRunning { task_id, agent_id, .. } => {
                Some(Event::TaskStarted { task_id: *task_id, agent_id: *agent_id })
            }
            Record::TaskCompleted { task_id, agent_id, tokens_used, cost_usd, .. } => Some(Event::TaskSucceeded {
                task_id: *task_id,
                agent_id: *agent_id,
                tokens_used: *tokens_used,
                cost_usd: *cost_usd,
            }),
            Record::TaskFailed { task_id, agent_id, error, will_retry, .. } => Some(Event::TaskFailed {
                task_id: *task_id,
                agent_id: *agent_id,
                error: error.clone(),
                will_retry: *will_retry,
            }),
            Record::TaskDeadLettered { task_id, agent_id, reason, .. } => {
                Some(Event::TaskDeadLetter { task_id: *task_id, agent_id: *agent_id, reason: reason.clone() })
            }
            Record::TaskCanceled { task_id, agent_id, .. } => {
                Some(Event::TaskCanceled { task_id: *task_id, agent_id: *agent_id })
            }
            // Only the terminal upsert (Succeeded/Failed) is a completion;
            // the earlier Pending→Running upsert that records a step's
            // dispatched task_id publishes nothing.
            Record::PlanStepUpserted { exec_id, step } if step.status.is_terminal() => {
                Some(Event::PlanStepCompleted {
                    exec_id: *exec_id,
                    step_id: step.step_id.clone(),
                    succeeded: step.status == oj_core::PlanStepStatus::Succeeded,
                })
            }
            Record::PlanStepUpserted { .. } => None,
            Record::PlanExecutionCompleted { exec_id, status, .. } => {
                Some(Event::PlanCompleted { exec_id: *exec_id, succeeded: *status == PlanExecStatus::Succeeded })
            }
            Record::AgentUpserted { .. }
            | Record::AgentRemoved { .. }
            | Record::SessionCreated { .. }
            | Record::TaskRequeued { .. }
            | Record::ParentTaskSet { .. }
            | Record::TaskContextSet { .. }
            | Record::PlanExecutionCreated { .. }
            | Record::CronUpserted { .. }
            | Record::CronRemoved { .. }
            | Record::RetentionSwept { .. } => None,
        }
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
