// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task Queue & Worker Pool (§4.3): a bounded pool of cooperative workers
//! leasing tasks for one agent out of the Store, invoking a [`Brain`] under
//! a deadline, and reporting the result back. Enqueue/backpressure lives on
//! [`oj_storage::Store::enqueue_task`] itself; this module owns only the
//! lease/run/complete loop and its drain.

use oj_adapters::{Brain, BrainError};
use oj_core::{AgentId, Clock, Event, EventTopic, TaskError, TaskId, WorkerId};
use oj_storage::Store;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Fallback poll interval used when no `task.queued` wakeup arrives — covers
/// tasks requeued by lease-recovery, which publish no fresh `task.queued`
/// event of their own (§4.3: "wait on a `Notify`... OR a short poll
/// interval, whichever first").
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct WorkerPoolConfig {
    pub agent_id: AgentId,
    pub workers: u32,
    pub task_timeout_ms: u64,
    pub poll_interval: Duration,
}

impl WorkerPoolConfig {
    pub fn new(agent_id: AgentId, workers: u32, task_timeout_ms: u64) -> Self {
        Self { agent_id, workers, task_timeout_ms, poll_interval: DEFAULT_POLL_INTERVAL }
    }
}

/// A running pool of workers for one agent. Dropping it without calling
/// [`WorkerPool::drain`] aborts all workers immediately, leaving any
/// in-flight tasks `Leased`/`Running` for next-startup recovery.
pub struct WorkerPool {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    leased_count: Arc<AtomicU64>,
}

impl WorkerPool {
    /// Spawn `config.workers` worker loops plus one wakeup task that
    /// forwards `task.queued` events for this agent onto a shared
    /// [`Notify`], so idle workers wake promptly instead of only on the
    /// poll interval.
    pub fn spawn<C: Clock + 'static>(
        store: Arc<Store<C>>,
        bus: oj_core::EventBus,
        brain: Arc<dyn Brain>,
        config: WorkerPoolConfig,
    ) -> Self {
        let cancel = CancellationToken::new();
        let notify = Arc::new(Notify::new());
        let leased_count = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::with_capacity(config.workers as usize + 1);
        handles.push(spawn_wakeup_task(bus, config.agent_id, notify.clone(), cancel.clone()));

        for i in 0..config.workers {
            let worker_id = WorkerId::new();
            handles.push(spawn_worker(
                i,
                worker_id,
                store.clone(),
                brain.clone(),
                config.agent_id,
                config.task_timeout_ms,
                config.poll_interval,
                notify.clone(),
                cancel.clone(),
                leased_count.clone(),
            ));
        }

        WorkerPool { cancel, handles, leased_count }
    }

    /// Number of tasks currently leased by this pool's workers (for the
    /// `doctor` CLI surface and tests).
    pub fn leased_count(&self) -> u64 {
        self.leased_count.load(Ordering::Relaxed)
    }

    /// Stop accepting new leases immediately; give in-flight tasks up to
    /// `drain_timeout` to finish, then abort whatever remains. Remaining
    /// in-flight tasks are left `Leased`/`Running` for recovery at next
    /// startup (§4.3).
    pub async fn drain(self, drain_timeout: Duration) {
        self.cancel.cancel();
        let join_all = futures_util::future::join_all(self.handles);
        if tokio::time::timeout(drain_timeout, join_all).await.is_err() {
            warn!(agent = "pool", "drain timeout elapsed with workers still in flight");
        }
    }
}

fn spawn_wakeup_task(
    bus: oj_core::EventBus,
    agent_id: AgentId,
    notify: Arc<Notify>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sub = bus.subscribe(Some(&[EventTopic::TaskQueued]));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = sub.recv() => {
                    match event {
                        Some(Event::TaskQueued { agent_id: queued_agent, .. }) if queued_agent == agent_id => {
                            notify.notify_waiters();
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
            }
        }
    })
}

#[allow(clippy::too_many_arguments)]
fn spawn_worker<C: Clock + 'static>(
    index: u32,
    worker_id: WorkerId,
    store: Arc<Store<C>>,
    brain: Arc<dyn Brain>,
    agent_id: AgentId,
    task_timeout_ms: u64,
    poll_interval: Duration,
    notify: Arc<Notify>,
    cancel: CancellationToken,
    leased_count: Arc<AtomicU64>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if cancel.is_cancelled() {
                break;
            }

            let leased = match store.lease_next(agent_id, worker_id, task_timeout_ms) {
                Ok(leased) => leased,
                Err(err) => {
                    warn!(?err, %agent_id, worker = index, "lease_next failed");
                    None
                }
            };

            let Some(task) = leased else {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = notify.notified() => {}
                    _ = tokio::time::sleep(poll_interval) => {}
                }
                continue;
            };

            leased_count.fetch_add(1, Ordering::Relaxed);
            run_leased_task(&store, &brain, task.task_id, &task.prompt, task_timeout_ms).await;
            leased_count.fetch_sub(1, Ordering::Relaxed);
        }
    })
}

async fn run_leased_task<C: Clock>(
    store: &Store<C>,
    brain: &Arc<dyn Brain>,
    task_id: TaskId,
    prompt: &str,
    task_timeout_ms: u64,
) {
    if let Err(err) = store.mark_running(task_id) {
        warn!(?err, %task_id, "mark_running failed");
        return;
    }

    let deadline = Duration::from_millis(task_timeout_ms);
    let outcome = tokio::time::timeout(deadline, brain.run(prompt, deadline)).await;

    match outcome {
        Ok(Ok(output)) => {
            if let Err(err) = store.complete_task(task_id, output.text, output.tokens_used, output.cost_usd) {
                warn!(?err, %task_id, "complete_task failed");
            }
        }
        Ok(Err(brain_err)) => fail_with(store, task_id, &brain_err),
        Err(_elapsed) => {
            let timeout_err = TaskError { kind: "timeout".into(), message: "brain call exceeded deadline".into() };
            if let Err(err) = store.fail_task(task_id, timeout_err, true) {
                warn!(?err, %task_id, "fail_task(timeout) failed");
            }
        }
    }
}

fn fail_with<C: Clock>(store: &Store<C>, task_id: TaskId, brain_err: &BrainError) {
    let retry = brain_err.is_retryable();
    let task_err = TaskError::from(brain_err);
    if let Err(err) = store.fail_task(task_id, task_err, retry) {
        warn!(?err, %task_id, "fail_task failed");
    } else {
        info!(%task_id, retry, "task failed, classification applied");
    }
}

#[cfg(test)]
#[path = "worker_pool_tests.rs"]
mod tests;
