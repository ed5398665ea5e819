// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oj-engine: the coordination core's execution layer — the Task Queue &
//! Worker Pool (§4.3) that runs individual tasks against a [`oj_adapters::Brain`],
//! the Completion Waiter (§4.6) that lets other layers block on task
//! completion without polling, and the Plan Executor (§4.7) that drives a
//! multi-step [`oj_plan::Plan`] wave by wave on top of both.

mod completion_waiter;
mod plan_executor;
mod worker_pool;

pub use completion_waiter::{CompletionWaiter, TaskResult, WaitError};
pub use plan_executor::{PlanExecutor, DEFAULT_WAVE_DEADLINE};
pub use worker_pool::{WorkerPool, WorkerPoolConfig};
