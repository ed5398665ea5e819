// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan Executor (§4.7): wave-by-wave dispatch of a [`Plan`]'s steps,
//! driven by the Completion Waiter, with durable per-step records so a
//! crash mid-plan can resume from the first incomplete wave.

use crate::completion_waiter::CompletionWaiter;
use oj_core::{
    AgentId, Clock, Error, Event, EventBus, PlanExecId, PlanExecStatus, PlanExecution,
    PlanStepRecord, PlanStepStatus, SessionId, TaskId, TaskKind, TaskStatus,
};
use oj_plan::{resolve_prompt, resolve_user_input, Plan};
use oj_storage::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default per-wave deadline (§4.7 step 3).
pub const DEFAULT_WAVE_DEADLINE: Duration = Duration::from_secs(5 * 60);

pub struct PlanExecutor<C: Clock> {
    store: Arc<Store<C>>,
    bus: EventBus,
    waiter: CompletionWaiter<C>,
    wave_deadline: Duration,
}

impl<C: Clock + 'static> PlanExecutor<C> {
    pub fn new(store: Arc<Store<C>>, bus: EventBus) -> Self {
        let waiter = CompletionWaiter::new(store.clone(), bus.clone());
        Self { store, bus, waiter, wave_deadline: DEFAULT_WAVE_DEADLINE }
    }

    pub fn with_wave_deadline(mut self, deadline: Duration) -> Self {
        self.wave_deadline = deadline;
        self
    }

    /// Start a fresh run of `plan` in `session_id`, substituting
    /// `{user_input}` into every step prompt at dispatch time.
    pub async fn execute(
        &self,
        plan: &Plan,
        session_id: SessionId,
        user_input: &str,
        cancel: &CancellationToken,
    ) -> Result<PlanExecId, Error> {
        let exec_id = PlanExecId::new();
        let step_ids: Vec<String> = plan.steps().map(|s| s.id.clone()).collect();
        self.store.create_plan_execution(exec_id, plan.name.clone(), session_id, &step_ids)?;

        let outputs = HashMap::new();
        self.run_waves(plan, exec_id, session_id, user_input, plan.waves()?, outputs, cancel).await
    }

    /// Resume a plan whose execution row is still `Running` after a crash
    /// (§4.7 "Crash resume"): reconstruct already-captured step outputs from
    /// terminal step rows and resume from the first wave with any
    /// non-terminal step. `plan` must be the still-current definition for
    /// `exec.plan_name` — a caller that can't find one transitions the
    /// execution straight to `Failed` via [`Self::fail_missing_definition`].
    pub async fn resume(
        &self,
        plan: &Plan,
        exec: &PlanExecution,
        user_input: &str,
        cancel: &CancellationToken,
    ) -> Result<PlanExecId, Error> {
        let mut outputs = HashMap::new();
        for (step_id, record) in &exec.steps {
            if record.status == PlanStepStatus::Succeeded {
                if let Some(output) = &record.output {
                    outputs.insert(step_id.clone(), output.clone());
                }
            }
        }

        let waves = plan.waves()?;
        let resumable: Vec<Vec<String>> = waves
            .into_iter()
            .skip_while(|wave| {
                wave.iter().all(|id| exec.steps.get(id).is_some_and(|s| s.status.is_terminal()))
            })
            .collect();

        info!(exec_id = %exec.exec_id, remaining_waves = resumable.len(), "resuming plan execution");
        self.run_waves(plan, exec.exec_id, exec.session_id, user_input, resumable, outputs, cancel).await
    }

    /// A plan execution whose definition no longer exists in the live
    /// config (§4.7 "Missing plan definitions transition the execution to
    /// `Failed`").
    pub fn fail_missing_definition(&self, exec_id: PlanExecId) -> Result<(), Error> {
        self.store.complete_plan_execution(exec_id, PlanExecStatus::Failed, 0.0)
    }

    async fn run_waves(
        &self,
        plan: &Plan,
        exec_id: PlanExecId,
        session_id: SessionId,
        user_input: &str,
        waves: Vec<Vec<String>>,
        mut outputs: HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<PlanExecId, Error> {
        let mut total_cost_usd = 0.0;
        let mut plan_failed = false;

        for wave in waves {
            if cancel.is_cancelled() {
                break;
            }

            let mut task_to_step = HashMap::new();
            for step_id in &wave {
                let step = plan
                    .step(step_id)
                    .ok_or_else(|| Error::invalid_input(format!("unknown step '{step_id}' in wave")))?;

                let prompt = resolve_user_input(&resolve_prompt(&step.prompt, &outputs), user_input);
                let agent_id = AgentId::named(&step.agent_id);
                let task = self.store.enqueue_task(agent_id, session_id, TaskKind::Tool, prompt, None)?;

                self.store.upsert_plan_step(exec_id, PlanStepRecord {
                    step_id: step_id.clone(),
                    task_id: Some(task.task_id),
                    status: PlanStepStatus::Running,
                    output: None,
                    started_at_ms: task.created_at_ms.into(),
                    finished_at_ms: None,
                })?;
                self.bus.publish(Event::PlanStepStarted {
                    exec_id,
                    step_id: step_id.clone(),
                    task_id: task.task_id,
                });
                task_to_step.insert(task.task_id, step_id.clone());
            }

            let task_ids: Vec<TaskId> = task_to_step.keys().copied().collect();
            let results = self.waiter.wait_for_all(&task_ids, self.wave_deadline, cancel).await;

            for (task_id, step_id) in &task_to_step {
                let task = results.get(task_id).and_then(|r| r.as_ref().ok());
                let succeeded = task.is_some_and(|t| t.status == TaskStatus::Succeeded);
                if !succeeded {
                    plan_failed = true;
                    warn!(exec_id = %exec_id, step_id, "plan step did not succeed");
                }

                let output = task.and_then(|t| t.output.clone());
                if let Some(output) = &output {
                    outputs.insert(step_id.clone(), output.clone());
                }
                if let Some(task) = task {
                    total_cost_usd += task.cost_usd;
                }

                self.store.upsert_plan_step(exec_id, PlanStepRecord {
                    step_id: step_id.clone(),
                    task_id: Some(*task_id),
                    status: if succeeded { PlanStepStatus::Succeeded } else { PlanStepStatus::Failed },
                    output,
                    started_at_ms: task.and_then(|t| t.started_at_ms),
                    finished_at_ms: task.and_then(|t| t.finished_at_ms),
                })?;
            }

            if plan_failed {
                break;
            }
        }

        let status = if plan_failed { PlanExecStatus::Failed } else { PlanExecStatus::Succeeded };
        self.store.complete_plan_execution(exec_id, status, total_cost_usd)?;
        Ok(exec_id)
    }
}

#[cfg(test)]
#[path = "plan_executor_tests.rs"]
mod tests;
