// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared scaffolding for the scenario tests: an in-memory `Store` and a
//! `FakeBrain`-backed `WorkerPool`, the same pairing `crates/engine`'s own
//! test modules use.

use std::sync::Arc;

use oj_core::{AgentConfig, AgentConfigBuilder, AgentId, EventBus, SystemClock};
use oj_engine::{WorkerPool, WorkerPoolConfig};
use oj_storage::{MigrationRegistry, Store};

pub fn open_store(bus: EventBus) -> Arc<Store<SystemClock>> {
    let dir = tempfile::tempdir().expect("tempdir");
    Arc::new(Store::open(dir.path(), bus, SystemClock, &MigrationRegistry::new()).expect("open store"))
}

pub fn agent(name: &str, workers: u32) -> AgentConfig {
    AgentConfigBuilder::default().agent_id(AgentId::named(name)).workers(workers).build()
}

pub fn agent_with_hops(name: &str, workers: u32, max_hops: u32) -> AgentConfig {
    AgentConfigBuilder::default()
        .agent_id(AgentId::named(name))
        .workers(workers)
        .delegation_max_hops(max_hops)
        .build()
}

pub fn spawn_pool(
    store: Arc<Store<SystemClock>>,
    bus: EventBus,
    agent_id: AgentId,
    workers: u32,
) -> (WorkerPool, Arc<oj_adapters::FakeBrain>) {
    let brain = Arc::new(oj_adapters::FakeBrain::new());
    let pool = WorkerPool::spawn(
        store,
        bus,
        brain.clone(),
        WorkerPoolConfig::new(agent_id, workers, 5_000),
    );
    (pool, brain)
}
