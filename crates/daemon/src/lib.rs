// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination daemon (`ojd`): the Agent Registry, Delegation Service,
//! Cron/Heartbeat Scheduler, Config/File Watcher, and IPC Listener that
//! `main.rs` wires together at startup (§4).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod delegation;
pub mod env;
pub mod listener;
pub mod logging;
pub mod plans;
pub mod registry;
pub mod scheduler;
pub mod watcher;

pub use config::LoadedConfig;
pub use delegation::{AwaitMode, DelegationOutcome, DelegationService, DelegationTarget};
pub use listener::{Listener, ListenerContext};
pub use logging::LoggingGuard;
pub use plans::PlanRegistry;
pub use registry::{AgentRegistry, BrainFactory, ProvisionHook};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use watcher::{AssetChangeHook, ConfigWatcher};
