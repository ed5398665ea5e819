// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Persistence Store (§4.2): the only component that mutates durable
//! state. Every write appends a [`Record`] to the [`Wal`], applies it to the
//! [`MaterializedState`], and publishes the record's bus projection — in
//! that order, so subscribers only ever observe an already-committed view.

use crate::migration::MigrationRegistry;
use crate::record::Record;
use crate::state::MaterializedState;
use crate::wal::Wal;
use oj_core::{
    AgentConfig, AgentId, Clock, CronJobRecord, Error, EventBus, PlanExecId, PlanExecStatus,
    PlanExecution, PlanStepRecord, Result, Session, SessionId, Task, TaskContextEntry, TaskId,
    TaskKind, WorkerId,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Current snapshot schema version. Bump alongside a new [`crate::Migration`]
/// registered by the caller.
pub const SCHEMA_VERSION: u32 = 1;

/// Default retry budget for a freshly enqueued task (§3 Task.max_attempts).
/// Not currently agent-configurable; see DESIGN.md.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const WAL_FILE: &str = "state.db";
const SNAPSHOT_FILE: &str = "state.db.snapshot";

struct Inner {
    wal: Wal,
    state: MaterializedState,
}

/// Single-writer embedded store opened against `<home>/state.db` (§4.2).
pub struct Store<C: Clock> {
    inner: Mutex<Inner>,
    bus: EventBus,
    clock: C,
    snapshot_path: PathBuf,
}

impl<C: Clock> Store<C> {
    /// Open (or create) the store under `home`, replaying the snapshot plus
    /// any WAL entries written since it was taken.
    pub fn open(home: &Path, bus: EventBus, clock: C, migrations: &MigrationRegistry) -> Result<Self> {
        fs::create_dir_all(home).map_err(|e| Error::storage(e.to_string()))?;
        let wal_path = home.join(WAL_FILE);
        let snapshot_path = home.join(SNAPSHOT_FILE);

        let raw_snapshot = match fs::read(&snapshot_path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| Error::storage(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => serde_json::json!({
                "v": SCHEMA_VERSION,
                "seq": 0,
                "state": MaterializedState::default(),
            }),
            Err(e) => return Err(Error::storage(e.to_string())),
        };
        let migrated =
            migrations.migrate_to(raw_snapshot, SCHEMA_VERSION).map_err(|e| Error::storage(e.to_string()))?;
        let processed_seq = migrated.get("seq").and_then(serde_json::Value::as_u64).unwrap_or(0);
        let mut state: MaterializedState = migrated
            .get("state")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| Error::storage(e.to_string()))?
            .unwrap_or_default();

        let mut wal = Wal::open(&wal_path, processed_seq).map_err(|e| Error::storage(e.to_string()))?;
        let mut replayed = 0u64;
        while let Some(entry) = wal.next_unprocessed().map_err(|e| Error::storage(e.to_string()))? {
            state.apply(&entry.record);
            wal.mark_processed(entry.seq);
            replayed += 1;
        }
        if replayed > 0 {
            info!(replayed, "replayed wal entries at startup");
        }

        Ok(Store { inner: Mutex::new(Inner { wal, state }), bus, clock, snapshot_path })
    }

    /// Write a compacted snapshot and drop WAL entries it already covers.
    /// Callers (typically the Cron Scheduler) invoke this periodically; it
    /// is never required for correctness, only to bound `state.db` growth.
    pub fn compact(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        // `write_seq`, not `processed_seq`: the in-memory state already
        // reflects every record through `write_seq` (apply runs inline on
        // every commit), so the snapshot can claim the whole log as covered.
        let seq = inner.wal.write_seq();
        let payload = serde_json::json!({ "v": SCHEMA_VERSION, "seq": seq, "state": &inner.state });
        let tmp = self.snapshot_path.with_extension("tmp");
        let bytes = serde_json::to_vec(&payload).map_err(|e| Error::storage(e.to_string()))?;
        fs::write(&tmp, bytes).map_err(|e| Error::storage(e.to_string()))?;
        fs::rename(&tmp, &self.snapshot_path).map_err(|e| Error::storage(e.to_string()))?;
        inner.wal.truncate_before(seq + 1).map_err(|e| Error::storage(e.to_string()))?;
        Ok(())
    }

    /// Append, apply, and publish one record under the single-writer lock.
    fn commit(&self, inner: &mut Inner, record: Record) -> Result<()> {
        inner.wal.append(&record).map_err(|e| Error::storage(e.to_string()))?;
        inner.wal.flush().map_err(|e| Error::storage(e.to_string()))?;
        inner.state.apply(&record);
        Ok(())
    }

    fn publish(&self, record: &Record) {
        if let Some(event) = record.as_bus_event() {
            self.bus.publish(event);
        }
    }

    // ---- Agents ----------------------------------------------------

    pub fn upsert_agent(&self, config: AgentConfig) -> Result<()> {
        config.validate().map_err(Error::invalid_input)?;
        let mut inner = self.inner.lock();
        let record = Record::AgentUpserted { config };
        self.commit(&mut inner, record.clone())?;
        drop(inner);
        self.publish(&record);
        Ok(())
    }

    pub fn remove_agent(&self, agent_id: AgentId) -> Result<()> {
        let mut inner = self.inner.lock();
        let record = Record::AgentRemoved { agent_id };
        self.commit(&mut inner, record.clone())?;
        drop(inner);
        self.publish(&record);
        Ok(())
    }

    pub fn list_agents(&self) -> Vec<AgentConfig> {
        let inner = self.inner.lock();
        let mut agents: Vec<AgentConfig> = inner.state.agents.values().cloned().collect();
        agents.sort_by(|a, b| a.agent_id.as_str().cmp(b.agent_id.as_str()));
        agents
    }

    /// Same view as [`Store::list_agents`]; named separately per §4.2 so the
    /// Registry's startup restore path reads intent, not implementation.
    pub fn list_runtime_agents(&self) -> Vec<AgentConfig> {
        self.list_agents()
    }

    // ---- Sessions ----------------------------------------------------

    pub fn create_session(&self, agent_id: AgentId) -> Result<Session> {
        let mut inner = self.inner.lock();
        if !inner.state.agents.contains_key(&agent_id) {
            return Err(Error::not_found(format!("agent {agent_id} not found")));
        }
        let session = Session::new(agent_id, self.clock.epoch_ms());
        let record = Record::SessionCreated { session: session.clone() };
        self.commit(&mut inner, record.clone())?;
        drop(inner);
        self.publish(&record);
        Ok(session)
    }

    pub fn get_session(&self, session_id: SessionId) -> Option<Session> {
        self.inner.lock().state.sessions.get(&session_id).cloned()
    }

    // ---- Tasks ----------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn enqueue_task(
        &self,
        agent_id: AgentId,
        session_id: SessionId,
        kind: TaskKind,
        prompt: String,
        parent_task_id: Option<TaskId>,
    ) -> Result<Task> {
        let mut inner = self.inner.lock();
        let agent = inner
            .state
            .agents
            .get(&agent_id)
            .ok_or_else(|| Error::not_found(format!("agent {agent_id} not found")))?
            .clone();

        if agent.max_queue_depth > 0 {
            let pending = inner
                .state
                .tasks
                .values()
                .filter(|t| t.agent_id == agent_id && t.status == oj_core::TaskStatus::Queued)
                .count();
            if pending as u32 >= agent.max_queue_depth {
                return Err(Error::QueueFull { pending, capacity: agent.max_queue_depth as usize });
            }
        }

        let parent = match parent_task_id {
            Some(parent_id) => {
                let parent = inner
                    .state
                    .tasks
                    .get(&parent_id)
                    .ok_or_else(|| Error::not_found(format!("parent task {parent_id} not found")))?;
                Some((parent_id, parent.root_task_id))
            }
            None => None,
        };

        let task_id = TaskId::new();
        let task = Task::new_queued(
            task_id,
            session_id,
            agent_id,
            kind,
            prompt,
            parent,
            DEFAULT_MAX_ATTEMPTS,
            self.clock.epoch_ms(),
        );
        let record = Record::TaskEnqueued { task: task.clone() };
        self.commit(&mut inner, record.clone())?;
        drop(inner);
        self.publish(&record);
        Ok(task)
    }

    pub fn lease_next(&self, agent_id: AgentId, worker_id: WorkerId, lease_duration_ms: u64) -> Result<Option<Task>> {
        let mut inner = self.inner.lock();
        let mut candidates: Vec<&Task> = inner
            .state
            .tasks
            .values()
            .filter(|t| t.agent_id == agent_id && t.status == oj_core::TaskStatus::Queued)
            .collect();
        candidates.sort_by_key(|t| (t.created_at_ms, t.task_id));
        let Some(task_id) = candidates.first().map(|t| t.task_id) else {
            return Ok(None);
        };

        let lease_expires_at_ms = self.clock.epoch_ms() + lease_duration_ms;
        let record = Record::TaskLeased { task_id, agent_id, worker_id, lease_expires_at_ms };
        self.commit(&mut inner, record.clone())?;
        let task = inner.state.tasks.get(&task_id).cloned();
        drop(inner);
        self.publish(&record);
        Ok(task)
    }

    pub fn mark_running(&self, task_id: TaskId) -> Result<()> {
        let mut inner = self.inner.lock();
        let agent_id = self.task_agent_id(&inner, task_id)?;
        let record = Record::TaskMarkedRunning { task_id, agent_id, started_at_ms: self.clock.epoch_ms() };
        self.commit(&mut inner, record.clone())?;
        drop(inner);
        self.publish(&record);
        Ok(())
    }

    pub fn complete_task(&self, task_id: TaskId, output: String, tokens_used: u64, cost_usd: f64) -> Result<()> {
        let mut inner = self.inner.lock();
        let agent_id = self.task_agent_id(&inner, task_id)?;
        let record = Record::TaskCompleted {
            task_id,
            agent_id,
            output,
            tokens_used,
            cost_usd,
            finished_at_ms: self.clock.epoch_ms(),
        };
        self.commit(&mut inner, record.clone())?;
        drop(inner);
        self.publish(&record);
        Ok(())
    }

    /// `retry=true` means the caller classified this as a transient failure;
    /// whether the task actually requeues or dead-letters depends on whether
    /// attempts remain (§4.3 retry policy). A task no longer `Leased`/
    /// `Running` (already resolved by a prior call) is left untouched.
    pub fn fail_task(&self, task_id: TaskId, error: oj_core::TaskError, retry: bool) -> Result<()> {
        let mut inner = self.inner.lock();
        let task = inner
            .state
            .tasks
            .get(&task_id)
            .ok_or_else(|| Error::not_found(format!("task {task_id} not found")))?;
        if !task.status.requires_lease() {
            return Ok(());
        }
        let agent_id = task.agent_id;
        let finished_at_ms = self.clock.epoch_ms();
        let record = if !retry {
            Record::TaskFailed { task_id, agent_id, error, will_retry: false, finished_at_ms }
        } else if task.attempt + 1 < task.max_attempts {
            Record::TaskFailed { task_id, agent_id, error, will_retry: true, finished_at_ms }
        } else {
            Record::TaskDeadLettered {
                task_id,
                agent_id,
                reason: format!("max attempts ({}) exhausted: {}", task.max_attempts, error.message),
                finished_at_ms,
            }
        };
        self.commit(&mut inner, record.clone())?;
        drop(inner);
        self.publish(&record);
        Ok(())
    }

    pub fn cancel_task(&self, task_id: TaskId) -> Result<()> {
        let mut inner = self.inner.lock();
        let task = inner
            .state
            .tasks
            .get(&task_id)
            .ok_or_else(|| Error::not_found(format!("task {task_id} not found")))?;
        if task.status.is_terminal() {
            return Ok(());
        }
        let agent_id = task.agent_id;
        let record = Record::TaskCanceled { task_id, agent_id, finished_at_ms: self.clock.epoch_ms() };
        self.commit(&mut inner, record.clone())?;
        drop(inner);
        self.publish(&record);
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Option<Task> {
        self.inner.lock().state.get_task(id).cloned()
    }

    pub fn list_tasks_by_session(&self, session_id: SessionId) -> Vec<Task> {
        self.inner.lock().state.tasks_by_session(session_id).into_iter().cloned().collect()
    }

    /// Count of `Queued` tasks for `agent_id`, for the `doctor` surface.
    pub fn queue_depth(&self, agent_id: AgentId) -> usize {
        self.inner
            .lock()
            .state
            .tasks
            .values()
            .filter(|t| t.agent_id == agent_id && t.status == oj_core::TaskStatus::Queued)
            .count()
    }

    pub fn set_parent_task(&self, child_id: TaskId, parent_id: TaskId) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.state.tasks.contains_key(&parent_id) {
            return Err(Error::not_found(format!("parent task {parent_id} not found")));
        }
        if !inner.state.tasks.contains_key(&child_id) {
            return Err(Error::not_found(format!("child task {child_id} not found")));
        }
        let record = Record::ParentTaskSet { child_id, parent_id };
        self.commit(&mut inner, record)
    }

    fn task_agent_id(&self, inner: &Inner, task_id: TaskId) -> Result<AgentId> {
        inner
            .state
            .tasks
            .get(&task_id)
            .map(|t| t.agent_id)
            .ok_or_else(|| Error::not_found(format!("task {task_id} not found")))
    }

    // ---- Recovery ----------------------------------------------------

    /// §4.2: any task with `status ∈ {Leased, Running} ∧ lease_expires_at <
    /// now` returns to `Queued` with `attempt` unchanged.
    pub fn requeue_expired_leases(&self, now_ms: u64) -> Result<usize> {
        let mut inner = self.inner.lock();
        let expired = inner.state.expired_leases(now_ms);
        for task_id in &expired {
            let record = Record::TaskRequeued { task_id: *task_id };
            self.commit(&mut inner, record)?;
        }
        if !expired.is_empty() {
            warn!(count = expired.len(), "requeued tasks with expired leases");
        }
        Ok(expired.len())
    }

    pub fn recover_running_plans(&self) -> Vec<PlanExecution> {
        self.inner.lock().state.running_plan_executions().into_iter().cloned().collect()
    }

    // ---- TaskContext ----------------------------------------------------

    pub fn set_task_context(&self, root_task_id: TaskId, key: String, value: String) -> Result<()> {
        let mut inner = self.inner.lock();
        let entry = TaskContextEntry { root_task_id, key, value, updated_at_ms: self.clock.epoch_ms() };
        let record = Record::TaskContextSet { entry };
        self.commit(&mut inner, record)
    }

    pub fn get_task_context(&self, root_task_id: TaskId, key: &str) -> Option<String> {
        self.inner.lock().state.task_context_scope(root_task_id).and_then(|m| m.get(key)).map(|e| e.value.clone())
    }

    pub fn get_all_task_context(&self, root_task_id: TaskId) -> HashMap<String, String> {
        self.inner
            .lock()
            .state
            .task_context_scope(root_task_id)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.value.clone())).collect())
            .unwrap_or_default()
    }

    // ---- Plans ----------------------------------------------------

    pub fn create_plan_execution(
        &self,
        exec_id: PlanExecId,
        plan_name: String,
        session_id: SessionId,
        step_ids: &[String],
    ) -> Result<PlanExecution> {
        let mut inner = self.inner.lock();
        let exec = PlanExecution::new(exec_id, plan_name, session_id, step_ids, self.clock.epoch_ms());
        let record = Record::PlanExecutionCreated { exec: exec.clone() };
        self.commit(&mut inner, record)?;
        Ok(exec)
    }

    pub fn upsert_plan_step(&self, exec_id: PlanExecId, step: PlanStepRecord) -> Result<()> {
        let mut inner = self.inner.lock();
        let record = Record::PlanStepUpserted { exec_id, step };
        self.commit(&mut inner, record.clone())?;
        drop(inner);
        self.publish(&record);
        Ok(())
    }

    pub fn complete_plan_execution(
        &self,
        exec_id: PlanExecId,
        status: PlanExecStatus,
        total_cost_usd: f64,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        let record = Record::PlanExecutionCompleted {
            exec_id,
            status,
            total_cost_usd,
            completed_at_ms: self.clock.epoch_ms(),
        };
        self.commit(&mut inner, record.clone())?;
        drop(inner);
        self.publish(&record);
        Ok(())
    }

    pub fn get_plan_execution(&self, id: &str) -> Option<PlanExecution> {
        self.inner.lock().state.get_plan_execution(id).cloned()
    }

    // ---- Cron ----------------------------------------------------

    pub fn upsert_cron(&self, cron: CronJobRecord) -> Result<()> {
        let mut inner = self.inner.lock();
        self.commit(&mut inner, Record::CronUpserted { cron })
    }

    pub fn remove_cron(&self, name: String) -> Result<()> {
        let mut inner = self.inner.lock();
        self.commit(&mut inner, Record::CronRemoved { name })
    }

    pub fn list_crons(&self) -> Vec<CronJobRecord> {
        let inner = self.inner.lock();
        let mut crons: Vec<CronJobRecord> = inner.state.crons.values().cloned().collect();
        crons.sort_by(|a, b| a.name.cmp(&b.name));
        crons
    }

    // ---- Retention ----------------------------------------------------

    /// Sweeps rows older than each threshold, in days; 0 means keep forever.
    pub fn run_retention(&self, task_days: u64, plan_days: u64) -> Result<()> {
        let now_ms = self.clock.epoch_ms();
        const DAY_MS: u64 = 86_400_000;
        let task_cutoff_ms = if task_days == 0 { 0 } else { now_ms.saturating_sub(task_days * DAY_MS) };
        let plan_cutoff_ms = if plan_days == 0 { 0 } else { now_ms.saturating_sub(plan_days * DAY_MS) };
        let mut inner = self.inner.lock();
        self.commit(&mut inner, Record::RetentionSwept { task_cutoff_ms, plan_cutoff_ms })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
