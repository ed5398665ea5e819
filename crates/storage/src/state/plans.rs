// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan execution record handlers.

use crate::record::Record;

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, record: &Record) {
    match record {
        Record::PlanExecutionCreated { exec } => {
            state.plan_executions.entry(exec.exec_id).or_insert_with(|| exec.clone());
        }

        Record::PlanStepUpserted { exec_id, step } => {
            if let Some(exec) = state.plan_executions.get_mut(exec_id) {
                let was_terminal = exec.steps.get(&step.step_id).is_some_and(|s| s.status.is_terminal());
                exec.steps.insert(step.step_id.clone(), step.clone());
                if !was_terminal && step.status.is_terminal() {
                    exec.completed_steps += 1;
                }
            }
        }

        Record::PlanExecutionCompleted { exec_id, status, total_cost_usd, completed_at_ms } => {
            if let Some(exec) = state.plan_executions.get_mut(exec_id) {
                exec.status = *status;
                exec.total_cost_usd = *total_cost_usd;
                exec.completed_at_ms = Some(*completed_at_ms);
            }
        }

        _ => {}
    }
}
