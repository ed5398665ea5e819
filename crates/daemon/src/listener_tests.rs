// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_adapters::FakeBrain;
use oj_core::{AgentConfigBuilder, AgentId, EventBus, SystemClock, TaskKind};
use oj_plan::{Plan, PlanStep};
use oj_storage::MigrationRegistry;
use std::sync::atomic::AtomicUsize;
use tokio::net::UnixStream;

fn open_store(bus: EventBus) -> Arc<Store<SystemClock>> {
    let dir = tempfile::tempdir().unwrap();
    Arc::new(Store::open(dir.path(), bus, SystemClock, &MigrationRegistry::new()).unwrap())
}

fn registry(bus: EventBus, store: Arc<Store<SystemClock>>) -> Arc<AgentRegistry<SystemClock>> {
    let brain_factory: crate::registry::BrainFactory = Arc::new(|_cfg| Arc::new(FakeBrain::new()));
    let on_agent_created: crate::registry::ProvisionHook = Arc::new(|_cfg| {});
    Arc::new(AgentRegistry::new(store, bus, brain_factory, on_agent_created))
}

fn context(
    store: Arc<Store<SystemClock>>,
    bus: EventBus,
    registry: Arc<AgentRegistry<SystemClock>>,
) -> Arc<ListenerContext<SystemClock>> {
    Arc::new(ListenerContext {
        store,
        bus,
        registry,
        plans: Arc::new(PlanRegistry::new()),
        started_at: Instant::now(),
        leases_recovered_at_startup: Arc::new(AtomicUsize::new(0)),
    })
}

async fn roundtrip(socket_path: &Path, request: &Request) -> Response {
    let mut stream = UnixStream::connect(socket_path).await.unwrap();
    oj_wire::write_message(&mut stream, &oj_wire::encode(request).unwrap()).await.unwrap();
    let bytes = oj_wire::read_message(&mut stream).await.unwrap();
    oj_wire::decode(&bytes).unwrap()
}

#[tokio::test]
async fn status_reports_uptime_and_agent_counts() {
    let dir = tempfile::tempdir().unwrap();
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    reg.create_agent(AgentConfigBuilder::default().agent_id(AgentId::named("worker")).build()).await.unwrap();

    let ctx = context(store, bus, reg);
    let listener = Listener::spawn(dir.path(), None, ctx).unwrap();

    match roundtrip(&dir.path().join("daemon.sock"), &Request::Status).await {
        Response::Status(snapshot) => {
            assert_eq!(snapshot.agents_running, 1);
            assert_eq!(snapshot.tasks_queued, 0);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    listener.stop().await;
}

#[tokio::test]
async fn doctor_reports_queue_depths_per_agent() {
    let dir = tempfile::tempdir().unwrap();
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    let agent_id = AgentId::named("worker");
    store.upsert_agent(AgentConfigBuilder::default().agent_id(agent_id).build()).unwrap();

    let session = store.create_session(agent_id).unwrap();
    store.enqueue_task(agent_id, session.session_id, TaskKind::Chat, "hi".into(), None).unwrap();

    let ctx = context(store, bus, reg);
    let listener = Listener::spawn(dir.path(), None, ctx).unwrap();

    match roundtrip(&dir.path().join("daemon.sock"), &Request::Doctor).await {
        Response::Doctor(report) => {
            assert_eq!(report.queue_depths.get("worker"), Some(&1));
            assert_eq!(report.leases_recovered_last_sweep, 0);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    listener.stop().await;
}

#[tokio::test]
async fn create_task_with_no_session_starts_a_fresh_one() {
    let dir = tempfile::tempdir().unwrap();
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    let agent_id = AgentId::named("worker");
    store.upsert_agent(AgentConfigBuilder::default().agent_id(agent_id).build()).unwrap();

    let ctx = context(store.clone(), bus, reg);
    let listener = Listener::spawn(dir.path(), None, ctx).unwrap();

    let request = Request::CreateTask { agent_id, session_id: None, kind: TaskKind::Chat, prompt: "hello".into() };
    let task = match roundtrip(&dir.path().join("daemon.sock"), &request).await {
        Response::Task(task) => *task,
        other => panic!("unexpected response: {other:?}"),
    };
    assert_eq!(task.agent_id, agent_id);
    assert!(store.list_tasks_by_session(task.session_id).iter().any(|t| t.task_id == task.task_id));

    listener.stop().await;
}

#[tokio::test]
async fn get_task_round_trips_an_enqueued_task() {
    let dir = tempfile::tempdir().unwrap();
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    let agent_id = AgentId::named("worker");
    store.upsert_agent(AgentConfigBuilder::default().agent_id(agent_id).build()).unwrap();
    let session = store.create_session(agent_id).unwrap();
    let enqueued = store.enqueue_task(agent_id, session.session_id, TaskKind::Chat, "hi".into(), None).unwrap();

    let ctx = context(store, bus, reg);
    let listener = Listener::spawn(dir.path(), None, ctx).unwrap();

    match roundtrip(&dir.path().join("daemon.sock"), &Request::GetTask { task_id: enqueued.task_id }).await {
        Response::Task(task) => assert_eq!(task.task_id, enqueued.task_id),
        other => panic!("unexpected response: {other:?}"),
    }

    listener.stop().await;
}

#[tokio::test]
async fn get_task_for_unknown_id_returns_not_found_error() {
    let dir = tempfile::tempdir().unwrap();
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    let ctx = context(store, bus, reg);
    let listener = Listener::spawn(dir.path(), None, ctx).unwrap();

    let request = Request::GetTask { task_id: oj_core::TaskId::new() };
    match roundtrip(&dir.path().join("daemon.sock"), &request).await {
        Response::Error { kind, .. } => assert_eq!(kind, "not_found"),
        other => panic!("unexpected response: {other:?}"),
    }

    listener.stop().await;
}

#[tokio::test]
async fn get_session_history_lists_every_task_oldest_first() {
    let dir = tempfile::tempdir().unwrap();
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    let agent_id = AgentId::named("worker");
    store.upsert_agent(AgentConfigBuilder::default().agent_id(agent_id).build()).unwrap();
    let session = store.create_session(agent_id).unwrap();
    let first = store.enqueue_task(agent_id, session.session_id, TaskKind::Chat, "one".into(), None).unwrap();
    let second = store.enqueue_task(agent_id, session.session_id, TaskKind::Chat, "two".into(), None).unwrap();

    let ctx = context(store, bus, reg);
    let listener = Listener::spawn(dir.path(), None, ctx).unwrap();

    let request = Request::GetSessionHistory { session_id: session.session_id };
    match roundtrip(&dir.path().join("daemon.sock"), &request).await {
        Response::Tasks(tasks) => {
            assert_eq!(tasks.len(), 2);
            assert_eq!(tasks[0].task_id, first.task_id);
            assert_eq!(tasks[1].task_id, second.task_id);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    listener.stop().await;
}

#[tokio::test]
async fn list_agents_returns_every_registered_agent() {
    let dir = tempfile::tempdir().unwrap();
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    store.upsert_agent(AgentConfigBuilder::default().agent_id(AgentId::named("worker")).build()).unwrap();

    let ctx = context(store, bus, reg);
    let listener = Listener::spawn(dir.path(), None, ctx).unwrap();

    match roundtrip(&dir.path().join("daemon.sock"), &Request::ListAgents).await {
        Response::Agents(agents) => assert!(agents.iter().any(|a| a.agent_id == AgentId::named("worker"))),
        other => panic!("unexpected response: {other:?}"),
    }

    listener.stop().await;
}

#[tokio::test]
async fn list_plans_reports_name_and_step_count() {
    let dir = tempfile::tempdir().unwrap();
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    let plans = Arc::new(PlanRegistry::new());
    let plan = Plan::new(
        "triage",
        vec![PlanStep { id: "only".into(), agent_id: "worker".into(), prompt: "go".into(), depends_on: Vec::new() }],
    )
    .unwrap();
    plans.replace_all(vec![plan]);

    let ctx = Arc::new(ListenerContext {
        store,
        bus,
        registry: reg,
        plans,
        started_at: Instant::now(),
        leases_recovered_at_startup: Arc::new(AtomicUsize::new(0)),
    });
    let listener = Listener::spawn(dir.path(), None, ctx).unwrap();

    match roundtrip(&dir.path().join("daemon.sock"), &Request::ListPlans).await {
        Response::Plans(plans) => {
            assert_eq!(plans.len(), 1);
            assert_eq!(plans[0].name, "triage");
            assert_eq!(plans[0].step_count, 1);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    listener.stop().await;
}

#[tokio::test]
async fn trigger_plan_for_unknown_name_returns_not_found_error() {
    let dir = tempfile::tempdir().unwrap();
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    let ctx = context(store, bus, reg);
    let listener = Listener::spawn(dir.path(), None, ctx).unwrap();

    let request = Request::TriggerPlan {
        plan_name: "ghost".into(),
        session_id: oj_core::SessionId::new(),
        user_input: "go".into(),
    };
    match roundtrip(&dir.path().join("daemon.sock"), &request).await {
        Response::Error { kind, .. } => assert_eq!(kind, "not_found"),
        other => panic!("unexpected response: {other:?}"),
    }

    listener.stop().await;
}

#[tokio::test]
async fn trigger_plan_runs_its_single_step_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let bus = EventBus::new();
    let store = open_store(bus.clone());
    let reg = registry(bus.clone(), store.clone());
    let agent_id = AgentId::named("worker");
    reg.create_agent(AgentConfigBuilder::default().agent_id(agent_id).build()).await.unwrap();
    let session = store.create_session(agent_id).unwrap();

    let plans = Arc::new(PlanRegistry::new());
    let plan = Plan::new(
        "triage",
        vec![PlanStep {
            id: "only".into(),
            agent_id: "worker".into(),
            prompt: "go {user_input}".into(),
            depends_on: Vec::new(),
        }],
    )
    .unwrap();
    plans.replace_all(vec![plan]);

    let ctx = Arc::new(ListenerContext {
        store: store.clone(),
        bus,
        registry: reg,
        plans,
        started_at: Instant::now(),
        leases_recovered_at_startup: Arc::new(AtomicUsize::new(0)),
    });
    let listener = Listener::spawn(dir.path(), None, ctx).unwrap();

    let request =
        Request::TriggerPlan { plan_name: "triage".into(), session_id: session.session_id, user_input: "ship it".into() };
    let exec_id = match roundtrip(&dir.path().join("daemon.sock"), &request).await {
        Response::PlanStarted { exec_id } => exec_id,
        other => panic!("unexpected response: {other:?}"),
    };

    let exec = store.get_plan_execution(exec_id.as_str()).unwrap();
    assert_eq!(exec.status, oj_core::PlanExecStatus::Succeeded);

    match roundtrip(&dir.path().join("daemon.sock"), &Request::GetPlanExecution { exec_id }).await {
        Response::PlanExecution(exec) => assert_eq!(exec.status, oj_core::PlanExecStatus::Succeeded),
        other => panic!("unexpected response: {other:?}"),
    }

    listener.stop().await;
}
