// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state built from WAL replay.

mod agents;
mod context;
mod crons;
mod helpers;
mod plans;
mod sessions;
mod tasks;

use crate::record::Record;
use oj_core::{AgentConfig, AgentId, CronJobRecord, PlanExecId, PlanExecution, Session, SessionId, Task, TaskContextEntry, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Durable state built by replaying a [`Record`] log (§4.2).
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub agents: HashMap<AgentId, AgentConfig>,
    pub sessions: HashMap<SessionId, Session>,
    pub tasks: HashMap<TaskId, Task>,
    #[serde(default)]
    pub task_context: HashMap<TaskId, HashMap<String, TaskContextEntry>>,
    pub plan_executions: HashMap<PlanExecId, PlanExecution>,
    pub crons: HashMap<String, CronJobRecord>,
}

impl MaterializedState {
    pub fn get_task(&self, id: &str) -> Option<&Task> {
        helpers::find_by_prefix(&self.tasks, id)
    }

    pub fn get_plan_execution(&self, id: &str) -> Option<&PlanExecution> {
        helpers::find_by_prefix(&self.plan_executions, id)
    }

    pub fn tasks_by_session(&self, session_id: SessionId) -> Vec<&Task> {
        let mut out: Vec<&Task> = self.tasks.values().filter(|t| t.session_id == session_id).collect();
        out.sort_by_key(|t| (t.created_at_ms, t.task_id));
        out
    }

    pub fn task_context_scope(&self, root_task_id: TaskId) -> Option<&HashMap<String, TaskContextEntry>> {
        self.task_context.get(&root_task_id)
    }

    /// Apply one operation-log record to the state.
    ///
    /// # Idempotency requirement
    ///
    /// Every handler MUST be safe to apply twice: once for immediate
    /// visibility right after a Store call returns, and once again during
    /// WAL replay at startup. Handlers use assignment, not `+=`/`-=`, and
    /// guard any counter mutation with a status check so a re-applied
    /// record is a no-op rather than a double-count.
    pub fn apply(&mut self, record: &Record) {
        match record {
            Record::AgentUpserted { .. } | Record::AgentRemoved { .. } => agents::apply(self, record),

            Record::SessionCreated { .. } => sessions::apply(self, record),

            Record::TaskEnqueued { .. }
            | Record::TaskLeased { .. }
            | Record::TaskMarkedRunning { .. }
            | Record::TaskCompleted { .. }
            | Record::TaskFailed { .. }
            | Record::TaskDeadLettered { .. }
            | Record::TaskCanceled { .. }
            | Record::TaskRequeued { .. }
            | Record::ParentTaskSet { .. } => tasks::apply(self, record),

            Record::TaskContextSet { .. } => context::apply(self, record),

            Record::PlanExecutionCreated { .. }
            | Record::PlanStepUpserted { .. }
            | Record::PlanExecutionCompleted { .. } => plans::apply(self, record),

            Record::CronUpserted { .. } | Record::CronRemoved { .. } => crons::apply(self, record),

            Record::RetentionSwept { task_cutoff_ms, plan_cutoff_ms } => {
                if *task_cutoff_ms > 0 {
                    self.tasks.retain(|_, t| {
                        !t.status.is_terminal() || t.finished_at_ms.unwrap_or(u64::MAX) >= *task_cutoff_ms
                    });
                }
                if *plan_cutoff_ms > 0 {
                    self.plan_executions.retain(|_, p| {
                        p.status == oj_core::PlanExecStatus::Running
                            || p.completed_at_ms.unwrap_or(u64::MAX) >= *plan_cutoff_ms
                    });
                }
            }
        }
    }

    /// Tasks with an expired lease (§4.2 `requeue_expired_leases`).
    pub fn expired_leases(&self, now_ms: u64) -> Vec<TaskId> {
        self.tasks
            .values()
            .filter(|t| t.status.requires_lease() && t.lease_expires_at_ms.is_some_and(|exp| exp < now_ms))
            .map(|t| t.task_id)
            .collect()
    }

    pub fn running_plan_executions(&self) -> Vec<&PlanExecution> {
        self.plan_executions.values().filter(|p| p.status == oj_core::PlanExecStatus::Running).collect()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
