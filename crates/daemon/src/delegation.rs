// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delegation & Shared Context (§4.5): the tool-call surface a running
//! task's `Brain` invokes to hand work to another agent, and the
//! last-writer-wins key/value store scoped to a task tree.

use crate::registry::AgentRegistry;
use oj_core::{AgentId, Clock, Error, Event, TaskId, TaskKind};
use oj_engine::CompletionWaiter;
use oj_storage::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Exactly one of these selects the delegate (§4.5 step/invariant 3).
pub enum DelegationTarget {
    Agent(AgentId),
    Capability(String),
}

/// How the caller wants to wait for the delegated task.
pub enum AwaitMode {
    Await { timeout: Duration },
    FireAndForget,
}

/// Result of a delegation call. `FireAndForget` returns immediately with the
/// child id and no outcome; `Await` carries the child's terminal task.
pub enum DelegationOutcome {
    Started { child_task_id: TaskId },
    Completed { child_task_id: TaskId, task: oj_core::Task },
}

pub struct DelegationService<C: Clock> {
    store: Arc<Store<C>>,
    bus: oj_core::EventBus,
    registry: Arc<AgentRegistry<C>>,
    waiter: CompletionWaiter<C>,
}

impl<C: Clock + 'static> DelegationService<C> {
    pub fn new(store: Arc<Store<C>>, bus: oj_core::EventBus, registry: Arc<AgentRegistry<C>>) -> Self {
        let waiter = CompletionWaiter::new(store.clone(), bus.clone());
        Self { store, bus, registry, waiter }
    }

    /// Delegate from `caller_task_id` to `target` with `prompt`. `prompt`
    /// must be non-empty, enforced by the caller's tool-call layer, not
    /// re-validated here.
    pub async fn delegate(
        &self,
        caller_task_id: TaskId,
        target: DelegationTarget,
        prompt: String,
        mode: AwaitMode,
        cancel: &CancellationToken,
    ) -> Result<DelegationOutcome, Error> {
        let caller = self
            .store
            .get_task(caller_task_id.as_str())
            .ok_or_else(|| Error::not_found(format!("delegating task {caller_task_id} not found")))?;

        let caller_agent = self
            .registry
            .get_agent(caller.agent_id)
            .ok_or_else(|| Error::not_found(format!("agent {} not found", caller.agent_id)))?;

        let hops = self.ancestor_depth(caller_task_id);
        if hops >= caller_agent.delegation_max_hops {
            return Err(Error::HopLimit { hops, max_hops: caller_agent.delegation_max_hops });
        }

        let target_agent_id = match target {
            DelegationTarget::Agent(id) => id,
            DelegationTarget::Capability(cap) => {
                let mut candidates = self.registry.find_agents_by_capability(&cap);
                candidates.sort_by(|a, b| a.agent_id.as_str().cmp(b.agent_id.as_str()));
                candidates
                    .into_iter()
                    .next()
                    .map(|cfg| cfg.agent_id)
                    .ok_or_else(|| Error::not_found(format!("no agent advertises capability '{cap}'")))?
            }
        };

        let child = self.store.enqueue_task(
            target_agent_id,
            caller.session_id,
            TaskKind::Chat,
            prompt,
            Some(caller_task_id),
        )?;

        self.bus.publish(Event::DelegationStarted {
            parent_task_id: caller_task_id,
            child_task_id: child.task_id,
            target_agent_id,
        });
        info!(parent = %caller_task_id, child = %child.task_id, %target_agent_id, "delegation started");

        match mode {
            AwaitMode::FireAndForget => Ok(DelegationOutcome::Started { child_task_id: child.task_id }),
            AwaitMode::Await { timeout } => {
                let result = self.waiter.wait_for_task(child.task_id, timeout, cancel).await;
                match result {
                    Ok(task) => {
                        self.bus.publish(Event::DelegationCompleted {
                            parent_task_id: caller_task_id,
                            child_task_id: child.task_id,
                            succeeded: task.status == oj_core::TaskStatus::Succeeded,
                        });
                        Ok(DelegationOutcome::Completed { child_task_id: child.task_id, task })
                    }
                    Err(oj_engine::WaitError::Timeout) => {
                        Err(Error::Timeout(format!("delegation to {child_task_id} timed out", child_task_id = child.task_id)))
                    }
                    Err(oj_engine::WaitError::Canceled) => {
                        Err(Error::invalid_input("delegation wait canceled"))
                    }
                }
            }
        }
    }

    /// Number of ancestors above `task_id` (0 for a root task). Walks the
    /// `parent_task_id` chain through the Store rather than caching depth,
    /// since chains are short (bounded by `delegation_max_hops <= workers -
    /// 1`, §3).
    fn ancestor_depth(&self, task_id: TaskId) -> u32 {
        let mut depth = 0;
        let mut current = task_id;
        while let Some(task) = self.store.get_task(current.as_str()) {
            match task.parent_task_id {
                Some(parent_id) => {
                    depth += 1;
                    current = parent_id;
                }
                None => break,
            }
        }
        depth
    }

    pub fn bus(&self) -> &oj_core::EventBus {
        &self.bus
    }

    pub fn get_task_context(&self, root_task_id: TaskId, key: &str) -> Option<String> {
        self.store.get_task_context(root_task_id, key)
    }

    pub fn set_task_context(&self, root_task_id: TaskId, key: String, value: String) -> Result<(), Error> {
        self.store.set_task_context(root_task_id, key, value)
    }
}

#[cfg(test)]
#[path = "delegation_tests.rs"]
mod tests;
