// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task lifecycle record handlers.

use crate::record::Record;
use oj_core::TaskStatus;

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, record: &Record) {
    match record {
        Record::TaskEnqueued { task } => {
            state.tasks.insert(task.task_id, task.clone());
        }

        Record::TaskLeased { task_id, worker_id, lease_expires_at_ms, .. } => {
            if let Some(task) = state.tasks.get_mut(task_id) {
                task.status = TaskStatus::Leased;
                task.lease_expires_at_ms = Some(*lease_expires_at_ms);
                let _ = worker_id;
            }
        }

        Record::TaskMarkedRunning { task_id, started_at_ms, .. } => {
            if let Some(task) = state.tasks.get_mut(task_id) {
                task.status = TaskStatus::Running;
                task.started_at_ms = Some(*started_at_ms);
            }
        }

        Record::TaskCompleted { task_id, output, tokens_used, cost_usd, finished_at_ms, .. } => {
            if let Some(task) = state.tasks.get_mut(task_id) {
                task.status = TaskStatus::Succeeded;
                task.output = Some(output.clone());
                task.tokens_used = *tokens_used;
                task.cost_usd = *cost_usd;
                task.finished_at_ms = Some(*finished_at_ms);
                task.lease_expires_at_ms = None;
            }
        }

        Record::TaskFailed { task_id, error, will_retry, finished_at_ms, .. } => {
            if let Some(task) = state.tasks.get_mut(task_id) {
                // Guard: only transition out of Leased/Running once per failure.
                // Re-applying the same record (immediate apply + WAL replay)
                // must not increment `attempt` twice.
                if !matches!(task.status, TaskStatus::Leased | TaskStatus::Running) {
                    return;
                }
                task.error = Some(error.clone());
                task.lease_expires_at_ms = None;
                if *will_retry {
                    task.attempt += 1;
                    task.status = TaskStatus::Queued;
                } else {
                    task.status = TaskStatus::Failed;
                    task.finished_at_ms = Some(*finished_at_ms);
                }
            }
        }

        Record::TaskDeadLettered { task_id, reason, finished_at_ms, .. } => {
            if let Some(task) = state.tasks.get_mut(task_id) {
                task.status = TaskStatus::DeadLetter;
                task.dead_letter_reason = Some(reason.clone());
                task.finished_at_ms = Some(*finished_at_ms);
                task.lease_expires_at_ms = None;
            }
        }

        Record::TaskCanceled { task_id, finished_at_ms, .. } => {
            if let Some(task) = state.tasks.get_mut(task_id) {
                task.status = TaskStatus::Canceled;
                task.finished_at_ms = Some(*finished_at_ms);
                task.lease_expires_at_ms = None;
            }
        }

        Record::TaskRequeued { task_id } => {
            if let Some(task) = state.tasks.get_mut(task_id) {
                if task.status.requires_lease() {
                    task.status = TaskStatus::Queued;
                    task.lease_expires_at_ms = None;
                    task.attempt += 1;
                }
            }
        }

        Record::ParentTaskSet { child_id, parent_id } => {
            let root = state.tasks.get(parent_id).map(|p| p.root_task_id);
            if let (Some(root), Some(child)) = (root, state.tasks.get_mut(child_id)) {
                child.parent_task_id = Some(*parent_id);
                child.root_task_id = root;
            }
        }

        _ => {}
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
