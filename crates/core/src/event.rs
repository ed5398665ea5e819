// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types published on the in-process event bus (§4.1).
//!
//! Serializes with `{"type": "task:queued", ...fields}` format, matching
//! this codebase's established tagged-enum event shape.

use crate::agent::AgentId;
use crate::error::TaskError;
use crate::plan_exec::PlanExecId;
use crate::task::TaskId;
use serde::{Deserialize, Serialize};

/// Routing key for bus subscriptions. One topic maps to one or more
/// [`Event`] variants; subscribers filter on this rather than pattern
/// matching the full event, so new event fields never require subscriber
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTopic {
    TaskQueued,
    TaskLeased,
    TaskStarted,
    TaskSucceeded,
    TaskFailed,
    TaskDeadLetter,
    TaskCanceled,
    PlanStepStarted,
    PlanStepCompleted,
    PlanCompleted,
    DelegationStarted,
    DelegationCompleted,
    HitlRequest,
    HitlResponse,
    ToolsUpdated,
    ConfigReloaded,
}

/// Events that flow through the bus (§4.1). Every task-lifecycle event
/// carries `task_id` so the Completion Waiter can filter to one task
/// without inspecting the rest of the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "task:queued")]
    TaskQueued { task_id: TaskId, agent_id: AgentId },

    #[serde(rename = "task:leased")]
    TaskLeased { task_id: TaskId, agent_id: AgentId, worker: String },

    #[serde(rename = "task:started")]
    TaskStarted { task_id: TaskId, agent_id: AgentId },

    #[serde(rename = "task:succeeded")]
    TaskSucceeded { task_id: TaskId, agent_id: AgentId, tokens_used: u64, cost_usd: f64 },

    #[serde(rename = "task:failed")]
    TaskFailed { task_id: TaskId, agent_id: AgentId, error: TaskError, will_retry: bool },

    #[serde(rename = "task:dead_letter")]
    TaskDeadLetter { task_id: TaskId, agent_id: AgentId, reason: String },

    #[serde(rename = "task:canceled")]
    TaskCanceled { task_id: TaskId, agent_id: AgentId },

    #[serde(rename = "plan:step:started")]
    PlanStepStarted { exec_id: PlanExecId, step_id: String, task_id: TaskId },

    #[serde(rename = "plan:step:completed")]
    PlanStepCompleted { exec_id: PlanExecId, step_id: String, succeeded: bool },

    #[serde(rename = "plan:completed")]
    PlanCompleted { exec_id: PlanExecId, succeeded: bool },

    #[serde(rename = "delegation:started")]
    DelegationStarted { parent_task_id: TaskId, child_task_id: TaskId, target_agent_id: AgentId },

    #[serde(rename = "delegation:completed")]
    DelegationCompleted { parent_task_id: TaskId, child_task_id: TaskId, succeeded: bool },

    #[serde(rename = "hitl:request")]
    HitlRequest { task_id: TaskId, question: String },

    #[serde(rename = "hitl:response")]
    HitlResponse { task_id: TaskId, answer: String },

    #[serde(rename = "tools:updated")]
    ToolsUpdated { agent_id: AgentId },

    #[serde(rename = "config:reloaded")]
    ConfigReloaded,

    /// Unknown type tags deserialize here rather than failing, matching this
    /// codebase's forward-compatible event deserialization.
    #[serde(other)]
    Custom,
}

impl Event {
    /// The topic this event routes under.
    pub fn topic(&self) -> EventTopic {
        match self {
            Event::TaskQueued { .. } => EventTopic::TaskQueued,
            Event::TaskLeased { .. } => EventTopic::TaskLeased,
            Event::TaskStarted { .. } => EventTopic::TaskStarted,
            Event::TaskSucceeded { .. } => EventTopic::TaskSucceeded,
            Event::TaskFailed { .. } => EventTopic::TaskFailed,
            Event::TaskDeadLetter { .. } => EventTopic::TaskDeadLetter,
            Event::TaskCanceled { .. } => EventTopic::TaskCanceled,
            Event::PlanStepStarted { .. } => EventTopic::PlanStepStarted,
            Event::PlanStepCompleted { .. } => EventTopic::PlanStepCompleted,
            Event::PlanCompleted { .. } => EventTopic::PlanCompleted,
            Event::DelegationStarted { .. } => EventTopic::DelegationStarted,
            Event::DelegationCompleted { .. } => EventTopic::DelegationCompleted,
            Event::HitlRequest { .. } => EventTopic::HitlRequest,
            Event::HitlResponse { .. } => EventTopic::HitlResponse,
            Event::ToolsUpdated { .. } => EventTopic::ToolsUpdated,
            Event::ConfigReloaded => EventTopic::ConfigReloaded,
            Event::Custom => EventTopic::ConfigReloaded,
        }
    }

    /// The task this event pertains to, if any — used by the Completion
    /// Waiter to filter a shared subscription down to one task (§4.6).
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            Event::TaskQueued { task_id, .. }
            | Event::TaskLeased { task_id, .. }
            | Event::TaskStarted { task_id, .. }
            | Event::TaskSucceeded { task_id, .. }
            | Event::TaskFailed { task_id, .. }
            | Event::TaskDeadLetter { task_id, .. }
            | Event::TaskCanceled { task_id, .. }
            | Event::HitlRequest { task_id, .. }
            | Event::HitlResponse { task_id, .. } => Some(*task_id),
            _ => None,
        }
    }

    /// True for the one terminal event every task eventually publishes
    /// exactly once (§8 invariant 6).
    pub fn is_task_terminal(&self) -> bool {
        matches!(
            self,
            Event::TaskSucceeded { .. }
                | Event::TaskFailed { .. }
                | Event::TaskDeadLetter { .. }
                | Event::TaskCanceled { .. }
        )
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
