// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S1. One agent, one worker, unbounded queue: three chat tasks complete
//! in enqueue order, each with its own `task:succeeded` event.

use std::time::Duration;

use oj_adapters::BrainOutput;
use oj_core::{Event, EventBus, EventTopic, TaskId, TaskKind, TaskStatus};

use crate::support;

#[tokio::test]
async fn three_tasks_complete_in_fifo_order() {
    let bus = EventBus::new();
    let store = support::open_store(bus.clone());

    let agent = support::agent("fifo-agent", 1);
    store.upsert_agent(agent.clone()).unwrap();
    let session = store.create_session(agent.agent_id).unwrap();

    let mut subscription = bus.subscribe(Some(&[EventTopic::TaskSucceeded]));

    let (pool, brain) = support::spawn_pool(store.clone(), bus, agent.agent_id, 1);
    brain.push_success(BrainOutput { text: "one".into(), tokens_used: 1, cost_usd: 0.0 });
    brain.push_success(BrainOutput { text: "two".into(), tokens_used: 1, cost_usd: 0.0 });
    brain.push_success(BrainOutput { text: "three".into(), tokens_used: 1, cost_usd: 0.0 });

    let t1 = store.enqueue_task(agent.agent_id, session.session_id, TaskKind::Chat, "first".into(), None).unwrap();
    let t2 = store.enqueue_task(agent.agent_id, session.session_id, TaskKind::Chat, "second".into(), None).unwrap();
    let t3 = store.enqueue_task(agent.agent_id, session.session_id, TaskKind::Chat, "third".into(), None).unwrap();

    let mut order: Vec<TaskId> = Vec::new();
    while order.len() < 3 {
        match tokio::time::timeout(Duration::from_secs(2), subscription.recv()).await {
            Ok(Some(Event::TaskSucceeded { task_id, .. })) => order.push(task_id),
            Ok(Some(_)) => {}
            Ok(None) => panic!("bus closed before three successes"),
            Err(_) => panic!("timed out waiting for task:succeeded events"),
        }
    }
    assert_eq!(order, vec![t1.task_id, t2.task_id, t3.task_id]);

    for (task, expected_output) in [(&t1, "one"), (&t2, "two"), (&t3, "three")] {
        let current = store.get_task(task.task_id.as_str()).unwrap();
        assert_eq!(current.status, TaskStatus::Succeeded);
        assert_eq!(current.output.as_deref(), Some(expected_output));
    }
    let first = store.get_task(t1.task_id.as_str()).unwrap();
    let second = store.get_task(t2.task_id.as_str()).unwrap();
    let third = store.get_task(t3.task_id.as_str()).unwrap();
    assert!(first.started_at_ms.unwrap() < second.started_at_ms.unwrap());
    assert!(second.started_at_ms.unwrap() < third.started_at_ms.unwrap());

    pool.drain(Duration::from_secs(1)).await;
}
