// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S5. A two-step plan (`research` -> `write`, `write` depending on
//! `research`) resolves `write`'s `{research.output}` placeholder from
//! `research`'s actual output and finishes with both steps succeeded.

use std::sync::Arc;
use std::time::Duration;

use oj_adapters::BrainOutput;
use oj_core::{EventBus, PlanExecStatus, PlanStepStatus};
use oj_engine::PlanExecutor;
use oj_plan::{Plan, PlanStep};
use tokio_util::sync::CancellationToken;

use crate::support;

fn step(id: &str, agent_id: &str, depends_on: &[&str], prompt: &str) -> PlanStep {
    PlanStep {
        id: id.to_string(),
        agent_id: agent_id.to_string(),
        prompt: prompt.to_string(),
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
    }
}

#[tokio::test]
async fn write_step_prompt_is_resolved_from_research_output() {
    let bus = EventBus::new();
    let store = support::open_store(bus.clone());

    let researcher = support::agent("researcher", 1);
    let writer = support::agent("writer", 1);
    store.upsert_agent(researcher.clone()).unwrap();
    store.upsert_agent(writer.clone()).unwrap();
    let session = store.create_session(researcher.agent_id).unwrap();

    let (research_pool, research_brain) = support::spawn_pool(store.clone(), bus.clone(), researcher.agent_id, 1);
    research_brain.push_success(BrainOutput { text: "the sun is a star".into(), tokens_used: 4, cost_usd: 0.01 });
    let (write_pool, write_brain) = support::spawn_pool(store.clone(), bus.clone(), writer.agent_id, 1);
    write_brain.push_success(BrainOutput { text: "an article about the sun".into(), tokens_used: 6, cost_usd: 0.02 });

    let plan = Plan::new(
        "content-pipeline",
        vec![
            step("research", "researcher", &[], "research {user_input}"),
            step("write", "writer", &["research"], "write about: {research.output}"),
        ],
    )
    .unwrap();

    let executor = PlanExecutor::new(store.clone(), bus.clone()).with_wave_deadline(Duration::from_secs(2));
    let cancel = CancellationToken::new();
    let exec_id = executor.execute(&plan, session.session_id, "sun", &cancel).await.unwrap();

    let exec = store.get_plan_execution(&exec_id.to_string()).unwrap();
    assert_eq!(exec.status, PlanExecStatus::Succeeded);
    assert_eq!(exec.completed_steps, 2);
    assert_eq!(exec.steps["research"].status, PlanStepStatus::Succeeded);
    assert_eq!(exec.steps["research"].output.as_deref(), Some("the sun is a star"));
    assert_eq!(exec.steps["write"].status, PlanStepStatus::Succeeded);
    assert_eq!(exec.steps["write"].output.as_deref(), Some("an article about the sun"));

    let write_call = write_brain.calls().into_iter().next().expect("write agent was called");
    assert_eq!(write_call.prompt, "write about: the sun is a star");
    let research_call = research_brain.calls().into_iter().next().expect("research agent was called");
    assert_eq!(research_call.prompt, "research sun");

    research_pool.drain(Duration::from_secs(1)).await;
    write_pool.drain(Duration::from_secs(1)).await;
}
