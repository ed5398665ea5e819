// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared task-tree context (§3 TaskContext, §4.5): a `(root_task_id, key)`
//! keyed value store scoped to an entire task tree, last-writer-wins.

use crate::task::TaskId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContextEntry {
    pub root_task_id: TaskId,
    pub key: String,
    pub value: String,
    pub updated_at_ms: u64,
}

#[cfg(test)]
#[path = "task_context_tests.rs"]
mod tests;
