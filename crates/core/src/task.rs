// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task entity and status lattice (§3).
//!
//! `TaskStatus` forms the lattice `Queued -> Leased -> Running ->
//! {Succeeded, Failed, DeadLetter, Canceled}`. The invariant
//! `lease_expires_at.is_some() iff status in {Leased, Running}` is enforced
//! by construction: [`Task::lease`]/[`Task::start`] are the only ways to set
//! a lease, and every terminal transition clears it.

use crate::agent::AgentId;
use crate::error::TaskError;
use crate::session::SessionId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a task.
    pub struct TaskId("tsk-");
}

crate::define_id! {
    /// Unique identifier for a worker within an agent's pool (not persisted
    /// across restarts; regenerated each time a pool starts).
    pub struct WorkerId("wkr-");
}

/// What kind of unit of work a task represents (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Chat,
    Tool,
}

crate::simple_display! {
    TaskKind {
        Chat => "chat",
        Tool => "tool",
    }
}

/// Status lattice for a task (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Leased,
    Running,
    Succeeded,
    Failed,
    DeadLetter,
    Canceled,
}

impl TaskStatus {
    /// Terminal set = {Succeeded, Failed, DeadLetter, Canceled} (§3).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::DeadLetter | TaskStatus::Canceled
        )
    }

    /// Whether this status requires a non-null `lease_expires_at` (§3 invariant 1).
    pub fn requires_lease(&self) -> bool {
        matches!(self, TaskStatus::Leased | TaskStatus::Running)
    }
}

crate::simple_display! {
    TaskStatus {
        Queued => "queued",
        Leased => "leased",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        DeadLetter => "dead_letter",
        Canceled => "canceled",
    }
}

/// A task instance (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub session_id: SessionId,
    pub agent_id: AgentId,
    pub kind: TaskKind,
    pub parent_task_id: Option<TaskId>,
    pub root_task_id: TaskId,
    pub prompt: String,
    pub status: TaskStatus,
    pub attempt: u32,
    pub max_attempts: u32,
    pub lease_expires_at_ms: Option<u64>,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub finished_at_ms: Option<u64>,
    pub output: Option<String>,
    pub error: Option<TaskError>,
    pub tokens_used: u64,
    pub cost_usd: f64,
    pub dead_letter_reason: Option<String>,
}

impl Task {
    /// Construct a new, freshly-`Queued` task. `root_task_id` is derived here
    /// (§9: "derived and cached on insert to avoid recursive lookups") from
    /// the parent's root, or the new task's own id if there is no parent.
    #[allow(clippy::too_many_arguments)]
    pub fn new_queued(
        task_id: TaskId,
        session_id: SessionId,
        agent_id: AgentId,
        kind: TaskKind,
        prompt: String,
        parent: Option<(TaskId, TaskId)>,
        max_attempts: u32,
        created_at_ms: u64,
    ) -> Self {
        let (parent_task_id, root_task_id) = match parent {
            Some((parent_id, parent_root)) => (Some(parent_id), parent_root),
            None => (None, task_id),
        };
        Task {
            task_id,
            session_id,
            agent_id,
            kind,
            parent_task_id,
            root_task_id,
            prompt,
            status: TaskStatus::Queued,
            attempt: 0,
            max_attempts,
            lease_expires_at_ms: None,
            created_at_ms,
            started_at_ms: None,
            finished_at_ms: None,
            output: None,
            error: None,
            tokens_used: 0,
            cost_usd: 0.0,
            dead_letter_reason: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_task_id.is_none()
    }

    /// §3 invariant 1.
    pub fn lease_invariant_holds(&self) -> bool {
        self.status.requires_lease() == self.lease_expires_at_ms.is_some()
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
