// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::registry::{AgentRegistry, BrainFactory, ProvisionHook};
use oj_adapters::FakeBrain;
use oj_core::{AgentConfigBuilder, AgentId, EventBus, SystemClock, TaskKind};
use oj_storage::MigrationRegistry;
use std::collections::HashSet;

fn open_store(bus: EventBus) -> Arc<Store<SystemClock>> {
    let dir = tempfile::tempdir().unwrap();
    Arc::new(Store::open(dir.path(), bus, SystemClock, &MigrationRegistry::new()).unwrap())
}

fn registry(bus: EventBus, store: Arc<Store<SystemClock>>) -> Arc<AgentRegistry<SystemClock>> {
    let brain_factory: BrainFactory = Arc::new(|_cfg| Arc::new(FakeBrain::new()));
    let on_agent_created: ProvisionHook = Arc::new(|_cfg| {});
    Arc::new(AgentRegistry::new(store, bus, brain_factory, on_agent_created))
}

#[tokio::test]
async fn delegate_by_agent_id_fire_and_forget_returns_immediately() {
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    reg.create_agent(AgentConfigBuilder::default().agent_id(AgentId::named("caller")).workers(2).delegation_max_hops(1).build())
        .await
        .unwrap();
    reg.create_agent(AgentConfigBuilder::default().agent_id(AgentId::named("target")).build()).await.unwrap();

    let session = store.create_session(AgentId::named("caller")).unwrap();
    let caller_task = store
        .enqueue_task(AgentId::named("caller"), session.session_id, TaskKind::Chat, "root".into(), None)
        .unwrap();

    let svc = DelegationService::new(store.clone(), bus, reg);
    let cancel = CancellationToken::new();
    let outcome = svc
        .delegate(
            caller_task.task_id,
            DelegationTarget::Agent(AgentId::named("target")),
            "do the thing".into(),
            AwaitMode::FireAndForget,
            &cancel,
        )
        .await
        .unwrap();

    match outcome {
        DelegationOutcome::Started { child_task_id } => {
            let child = store.get_task(child_task_id.as_str()).unwrap();
            assert_eq!(child.parent_task_id, Some(caller_task.task_id));
            assert_eq!(child.root_task_id, caller_task.task_id);
        }
        DelegationOutcome::Completed { .. } => panic!("expected Started"),
    }
}

#[tokio::test]
async fn delegate_await_blocks_until_child_terminates() {
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    reg.create_agent(AgentConfigBuilder::default().agent_id(AgentId::named("caller")).delegation_max_hops(1).build())
        .await
        .unwrap();
    reg.create_agent(AgentConfigBuilder::default().agent_id(AgentId::named("target")).build()).await.unwrap();

    let session = store.create_session(AgentId::named("caller")).unwrap();
    let caller_task = store
        .enqueue_task(AgentId::named("caller"), session.session_id, TaskKind::Chat, "root".into(), None)
        .unwrap();

    let svc = DelegationService::new(store.clone(), bus, reg);
    let cancel = CancellationToken::new();
    let outcome = svc
        .delegate(
            caller_task.task_id,
            DelegationTarget::Agent(AgentId::named("target")),
            "do the thing".into(),
            AwaitMode::Await { timeout: Duration::from_secs(5) },
            &cancel,
        )
        .await
        .unwrap();

    match outcome {
        DelegationOutcome::Completed { task, .. } => {
            assert_eq!(task.status, oj_core::TaskStatus::Succeeded);
        }
        DelegationOutcome::Started { .. } => panic!("expected Completed"),
    }
}

#[tokio::test]
async fn delegate_by_capability_routes_to_lexicographically_first_match() {
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    reg.create_agent(AgentConfigBuilder::default().agent_id(AgentId::named("caller")).delegation_max_hops(1).build())
        .await
        .unwrap();

    let mut skills = HashSet::new();
    skills.insert("search".to_string());
    reg.create_agent(AgentConfigBuilder::default().agent_id(AgentId::named("zeta")).skills(Some(skills.clone())).build())
        .await
        .unwrap();
    reg.create_agent(AgentConfigBuilder::default().agent_id(AgentId::named("alpha")).skills(Some(skills)).build())
        .await
        .unwrap();

    let session = store.create_session(AgentId::named("caller")).unwrap();
    let caller_task = store
        .enqueue_task(AgentId::named("caller"), session.session_id, TaskKind::Chat, "root".into(), None)
        .unwrap();

    let svc = DelegationService::new(store.clone(), bus, reg);
    let cancel = CancellationToken::new();
    let outcome = svc
        .delegate(
            caller_task.task_id,
            DelegationTarget::Capability("search".into()),
            "find it".into(),
            AwaitMode::FireAndForget,
            &cancel,
        )
        .await
        .unwrap();

    let DelegationOutcome::Started { child_task_id } = outcome else { panic!("expected Started") };
    let child = store.get_task(child_task_id.as_str()).unwrap();
    assert_eq!(child.agent_id, AgentId::named("alpha"));
}

#[tokio::test]
async fn delegate_rejects_unknown_capability() {
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    reg.create_agent(AgentConfigBuilder::default().agent_id(AgentId::named("caller")).delegation_max_hops(1).build())
        .await
        .unwrap();

    let session = store.create_session(AgentId::named("caller")).unwrap();
    let caller_task = store
        .enqueue_task(AgentId::named("caller"), session.session_id, TaskKind::Chat, "root".into(), None)
        .unwrap();

    let svc = DelegationService::new(store.clone(), bus, reg);
    let cancel = CancellationToken::new();
    let err = svc
        .delegate(
            caller_task.task_id,
            DelegationTarget::Capability("missing".into()),
            "find it".into(),
            AwaitMode::FireAndForget,
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn delegate_enforces_hop_limit() {
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    reg.create_agent(AgentConfigBuilder::default().agent_id(AgentId::named("caller")).delegation_max_hops(0).build())
        .await
        .unwrap();
    reg.create_agent(AgentConfigBuilder::default().agent_id(AgentId::named("target")).build()).await.unwrap();

    let session = store.create_session(AgentId::named("caller")).unwrap();
    let caller_task = store
        .enqueue_task(AgentId::named("caller"), session.session_id, TaskKind::Chat, "root".into(), None)
        .unwrap();

    let svc = DelegationService::new(store.clone(), bus, reg);
    let cancel = CancellationToken::new();
    let err = svc
        .delegate(
            caller_task.task_id,
            DelegationTarget::Agent(AgentId::named("target")),
            "do the thing".into(),
            AwaitMode::FireAndForget,
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HopLimit { hops: 0, max_hops: 0 }));
}

#[tokio::test]
async fn task_context_is_scoped_to_the_root_task_and_last_writer_wins() {
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    reg.create_agent(AgentConfigBuilder::default().agent_id(AgentId::named("caller")).build()).await.unwrap();

    let session = store.create_session(AgentId::named("caller")).unwrap();
    let root_task = store
        .enqueue_task(AgentId::named("caller"), session.session_id, TaskKind::Chat, "root".into(), None)
        .unwrap();

    let svc = DelegationService::new(store, bus, reg);
    svc.set_task_context(root_task.task_id, "found".into(), "first".into()).unwrap();
    svc.set_task_context(root_task.task_id, "found".into(), "second".into()).unwrap();

    assert_eq!(svc.get_task_context(root_task.task_id, "found"), Some("second".to_string()));
    assert_eq!(svc.get_task_context(root_task.task_id, "missing"), None);
}
