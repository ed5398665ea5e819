// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent Registry (§4.4): the single process-wide owner of running agents
//! and their worker pools. `Brain` construction and agent-provisioning
//! hooks (skills, tool bridges, validators) are injected by the caller —
//! this crate has no concrete provider transport of its own (§9).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use oj_adapters::Brain;
use oj_core::{AgentConfig, AgentId, Clock, Error};
use oj_engine::{WorkerPool, WorkerPoolConfig};
use oj_storage::Store;
use parking_lot::Mutex;
use tracing::{info, warn};

/// Constructs a `Brain` bound to an agent's provider+model+skills.
pub type BrainFactory = Arc<dyn Fn(&AgentConfig) -> Arc<dyn Brain> + Send + Sync>;

/// Fires after an agent's pool has started (attach skills, tool bridges,
/// validators). Infallible by design: provisioning that can fail should
/// happen before `create_agent` is called, not inside the hook.
pub type ProvisionHook = Arc<dyn Fn(&AgentConfig) + Send + Sync>;

const DEFAULT_AGENT_ID: &str = "default";

pub struct AgentRegistry<C: Clock> {
    store: Arc<Store<C>>,
    bus: oj_core::EventBus,
    brain_factory: BrainFactory,
    on_agent_created: ProvisionHook,
    pools: Mutex<HashMap<AgentId, WorkerPool>>,
    /// Serialises hot-reload of skills/plans with provisioning of newly
    /// created agents, so a new agent never observes half-loaded config.
    reload_mutex: tokio::sync::Mutex<()>,
}

impl<C: Clock + 'static> AgentRegistry<C> {
    pub fn new(
        store: Arc<Store<C>>,
        bus: oj_core::EventBus,
        brain_factory: BrainFactory,
        on_agent_created: ProvisionHook,
    ) -> Self {
        Self {
            store,
            bus,
            brain_factory,
            on_agent_created,
            pools: Mutex::new(HashMap::new()),
            reload_mutex: tokio::sync::Mutex::new(()),
        }
    }

    /// Insert/update the durable record, start a worker pool, then fire the
    /// provisioning hook. The durable record is written before the pool
    /// starts; pool startup in this implementation cannot fail (spawning a
    /// worker loop is infallible), so the rollback path never triggers, but
    /// the ordering is kept so a future fallible pool-start still composes
    /// correctly with it.
    pub async fn create_agent(&self, cfg: AgentConfig) -> Result<(), Error> {
        let _reload_guard = self.reload_mutex.lock().await;

        if self.pools.lock().contains_key(&cfg.agent_id) {
            return Err(Error::conflict(format!("agent '{}' is already running", cfg.agent_id)));
        }

        self.store.upsert_agent(cfg.clone())?;

        let brain = (self.brain_factory)(&cfg);
        let pool = WorkerPool::spawn(
            self.store.clone(),
            self.bus.clone(),
            brain,
            WorkerPoolConfig::new(cfg.agent_id, cfg.workers, cfg.task_timeout_ms),
        );
        self.pools.lock().insert(cfg.agent_id, pool);

        (self.on_agent_created)(&cfg);
        info!(agent_id = %cfg.agent_id, "agent created");
        Ok(())
    }

    /// Refuses to remove `default`. Drains the pool before marking the
    /// durable record removed.
    pub async fn remove_agent(&self, agent_id: AgentId, drain_timeout: Duration) -> Result<(), Error> {
        if agent_id.as_str() == DEFAULT_AGENT_ID {
            return Err(Error::invalid_input("the default agent cannot be removed"));
        }

        let pool = self.pools.lock().remove(&agent_id);
        if let Some(pool) = pool {
            pool.drain(drain_timeout).await;
        }
        self.store.remove_agent(agent_id)?;
        info!(%agent_id, "agent removed");
        Ok(())
    }

    /// Re-creates pools for every agent row persisted from prior runs.
    /// Best-effort: a single agent's failure is logged, not fatal to
    /// startup.
    pub async fn restore_persisted_agents(&self) {
        for cfg in self.store.list_runtime_agents() {
            let agent_id = cfg.agent_id;
            if let Err(err) = self.create_agent(cfg).await {
                warn!(%agent_id, %err, "failed to restore persisted agent");
            }
        }
    }

    /// Diff `old_list`/`new_list` by id: add new, remove missing (except
    /// `default`), and for changed entries (any material field differs)
    /// remove-and-recreate. Errors for individual agents are collected
    /// rather than aborting the whole reconcile.
    pub async fn reconcile(&self, old_list: &[AgentConfig], new_list: &[AgentConfig]) -> Vec<Error> {
        let mut errors = Vec::new();
        let old_by_id: HashMap<AgentId, &AgentConfig> = old_list.iter().map(|c| (c.agent_id, c)).collect();
        let new_by_id: HashMap<AgentId, &AgentConfig> = new_list.iter().map(|c| (c.agent_id, c)).collect();

        for (id, _) in &old_by_id {
            if !new_by_id.contains_key(id) && id.as_str() != DEFAULT_AGENT_ID {
                if let Err(err) = self.remove_agent(*id, Duration::from_secs(5)).await {
                    errors.push(err);
                }
            }
        }

        for (id, new_cfg) in &new_by_id {
            match old_by_id.get(id) {
                None => {
                    if let Err(err) = self.create_agent((*new_cfg).clone()).await {
                        errors.push(err);
                    }
                }
                Some(old_cfg) => {
                    if old_cfg.materially_differs_from(new_cfg) {
                        if let Err(err) = self.remove_agent(*id, Duration::from_secs(5)).await {
                            errors.push(err);
                            continue;
                        }
                        if let Err(err) = self.create_agent((*new_cfg).clone()).await {
                            errors.push(err);
                        }
                    }
                }
            }
        }

        errors
    }

    pub fn list_agents(&self) -> Vec<AgentConfig> {
        self.store.list_agents()
    }

    pub fn get_agent(&self, agent_id: AgentId) -> Option<AgentConfig> {
        self.store.list_agents().into_iter().find(|c| c.agent_id == agent_id)
    }

    /// Ids of agents with a live worker pool, lexicographic by id.
    pub fn list_running_agents(&self) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self.pools.lock().keys().copied().collect();
        ids.sort_by_key(|id| id.as_str().to_string());
        ids
    }

    /// Agents (from the durable set) advertising `cap` in their skills,
    /// lexicographic by id for a deterministic delegation tie-break.
    pub fn find_agents_by_capability(&self, cap: &str) -> Vec<AgentConfig> {
        self.store
            .list_agents()
            .into_iter()
            .filter(|c| c.skills.as_ref().is_some_and(|skills| skills.contains(cap)))
            .collect()
    }

    /// Leased-task count for `agent_id`'s pool, for the `doctor` surface.
    pub fn leased_count(&self, agent_id: AgentId) -> Option<u64> {
        self.pools.lock().get(&agent_id).map(|p| p.leased_count())
    }

    /// Parallel drain of every running pool with a single deadline.
    pub async fn drain_all(&self, timeout: Duration) {
        let pools: Vec<WorkerPool> = self.pools.lock().drain().map(|(_, pool)| pool).collect();
        futures_util::future::join_all(pools.into_iter().map(|pool| pool.drain(timeout))).await;
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
