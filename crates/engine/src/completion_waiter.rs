// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion Waiter (§4.6): blocks on terminal task status via bus events
//! rather than polling. `wait_for_task` subscribes *before* releasing the
//! initial consistency check so a terminal transition landing between the
//! check and the subscribe is never missed.

use oj_core::{Clock, EventTopic, Task, TaskId};
use oj_storage::Store;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

const TERMINAL_TOPICS: &[EventTopic] = &[
    EventTopic::TaskSucceeded,
    EventTopic::TaskFailed,
    EventTopic::TaskDeadLetter,
    EventTopic::TaskCanceled,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    #[error("wait timed out")]
    Timeout,
    #[error("wait canceled")]
    Canceled,
}

pub type TaskResult = Task;

pub struct CompletionWaiter<C: Clock> {
    store: std::sync::Arc<Store<C>>,
    bus: oj_core::EventBus,
}

impl<C: Clock> CompletionWaiter<C> {
    pub fn new(store: std::sync::Arc<Store<C>>, bus: oj_core::EventBus) -> Self {
        Self { store, bus }
    }

    /// Block until `task_id` reaches a terminal status, or `timeout`/`cancel`
    /// fires first.
    pub async fn wait_for_task(
        &self,
        task_id: TaskId,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<TaskResult, WaitError> {
        // Subscribe before the consistency check so a terminal transition
        // racing the check is still observed on the channel.
        let mut sub = self.bus.subscribe(Some(TERMINAL_TOPICS));

        if let Some(task) = self.store.get_task(task_id.as_str()) {
            if task.status.is_terminal() {
                return Ok(task);
            }
        }

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(WaitError::Canceled),
                _ = &mut deadline => return Err(WaitError::Timeout),
                event = sub.recv() => {
                    match event {
                        Some(ev) if ev.task_id() == Some(task_id) && ev.is_task_terminal() => {
                            if let Some(task) = self.store.get_task(task_id.as_str()) {
                                return Ok(task);
                            }
                        }
                        Some(_) => continue,
                        None => return Err(WaitError::Canceled),
                    }
                }
            }
        }
    }

    /// Fan out to a per-id waiter for every id in `ids`, concurrently, and
    /// collect every result (no early abort on the first timeout/failure —
    /// §4.6: "Partial failures are returned alongside successes").
    pub async fn wait_for_all(
        &self,
        ids: &[TaskId],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> HashMap<TaskId, Result<TaskResult, WaitError>> {
        let waiters = ids.iter().map(|id| self.wait_for_task(*id, timeout, cancel));
        let results = futures_util::future::join_all(waiters).await;
        ids.iter().copied().zip(results).collect()
    }
}

#[cfg(test)]
#[path = "completion_waiter_tests.rs"]
mod tests;
