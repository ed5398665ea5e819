// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared task-tree context handlers (§3 TaskContext, §4.5). Overwrite
//! semantics: last write for a given `(root_task_id, key)` wins.

use crate::record::Record;

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, record: &Record) {
    if let Record::TaskContextSet { entry } = record {
        let scope = state.task_context.entry(entry.root_task_id).or_default();
        match scope.get(&entry.key) {
            Some(existing) if existing.updated_at_ms > entry.updated_at_ms => {}
            _ => {
                scope.insert(entry.key.clone(), entry.clone());
            }
        }
    }
}
