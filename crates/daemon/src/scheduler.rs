// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron/Heartbeat Scheduler (§4.8): a single ticker-driven activity owning
//! the retention sweep and per-agent heartbeat-task emission. Both are
//! best-effort — a failure is logged and the next tick still runs.

use oj_core::{AgentId, Clock, CronJobRecord, SessionId, TaskKind};
use oj_storage::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_RETENTION_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub struct SchedulerConfig {
    /// How often the ticker wakes to check for due cron jobs.
    pub tick_interval: Duration,
    /// How often the retention sweep runs.
    pub retention_interval: Duration,
    pub task_retention_days: u64,
    pub plan_retention_days: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            retention_interval: DEFAULT_RETENTION_INTERVAL,
            task_retention_days: 30,
            plan_retention_days: 30,
        }
    }
}

/// Resolves a cron job's heartbeat prompt into a concrete chat task.
/// Separate from the Store/Registry surface since a heartbeat needs its own
/// session per firing (§3: heartbeat tasks are not part of a user session
/// tree).
fn heartbeat_session<C: Clock>(store: &Store<C>, agent_id: AgentId) -> Option<SessionId> {
    match store.create_session(agent_id) {
        Ok(session) => Some(session.session_id),
        Err(err) => {
            warn!(?err, %agent_id, "failed to create heartbeat session");
            None
        }
    }
}

pub struct Scheduler {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Scheduler {
    pub fn spawn<C: Clock + 'static>(store: Arc<Store<C>>, clock: C, config: SchedulerConfig) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(store, clock, config, cancel.clone()));
        Self { cancel, handle }
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

async fn run<C: Clock + 'static>(store: Arc<Store<C>>, clock: C, config: SchedulerConfig, cancel: CancellationToken) {
    let mut tick = tokio::time::interval(config.tick_interval);
    let mut last_fired: HashMap<String, u64> = HashMap::new();
    let mut last_retention_ms: u64 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                let now_ms = clock.epoch_ms();

                if now_ms.saturating_sub(last_retention_ms) >= config.retention_interval.as_millis() as u64 {
                    if let Err(err) = store.run_retention(config.task_retention_days, config.plan_retention_days) {
                        warn!(?err, "retention sweep failed");
                    } else {
                        info!("retention sweep completed");
                    }
                    last_retention_ms = now_ms;
                }

                for cron in store.list_crons() {
                    if !cron.enabled {
                        continue;
                    }
                    let due_since = last_fired.get(&cron.name).copied().unwrap_or(0);
                    if now_ms.saturating_sub(due_since) < cron.interval_ms {
                        continue;
                    }
                    fire_heartbeat(&store, &cron);
                    last_fired.insert(cron.name.clone(), now_ms);
                }
            }
        }
    }
}

fn fire_heartbeat<C: Clock>(store: &Store<C>, cron: &CronJobRecord) {
    let Some(session_id) = heartbeat_session(store, cron.agent_id) else { return };
    match store.enqueue_task(cron.agent_id, session_id, TaskKind::Chat, cron.prompt_template.clone(), None) {
        Ok(task) => info!(cron = %cron.name, task_id = %task.task_id, "heartbeat task enqueued"),
        Err(err) => warn!(?err, cron = %cron.name, "failed to enqueue heartbeat task"),
    }
}

/// Diff `old_list`/`new_list` by name and upsert/remove in the Store,
/// mirroring the Registry's `reconcile` (§4.8: "reconciled... the same way
/// the Registry reconciles agents").
pub fn reconcile_crons<C: Clock>(store: &Store<C>, old_list: &[CronJobRecord], new_list: &[CronJobRecord]) {
    let old_names: std::collections::HashSet<&str> = old_list.iter().map(|c| c.name.as_str()).collect();
    let new_by_name: HashMap<&str, &CronJobRecord> = new_list.iter().map(|c| (c.name.as_str(), c)).collect();

    for name in &old_names {
        if !new_by_name.contains_key(name) {
            if let Err(err) = store.remove_cron(name.to_string()) {
                warn!(?err, cron = name, "failed to remove cron");
            }
        }
    }

    for cron in new_list {
        let changed = match old_list.iter().find(|c| c.name == cron.name) {
            Some(old) => old.materially_differs_from(cron),
            None => true,
        };
        if changed {
            if let Err(err) = store.upsert_cron(cron.clone()) {
                warn!(?err, cron = %cron.name, "failed to upsert cron");
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
