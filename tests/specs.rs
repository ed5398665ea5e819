// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenario tests (§8): each module drives the coordination
//! core's public crates directly, the same way the individual crates'
//! own `*_tests.rs` files do, but across a full agent/session/task (and
//! where relevant, plan or delegation) lifecycle rather than a single
//! component in isolation.

mod support;

mod fifo_single_agent;
mod dag_plan;
