// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable cron/heartbeat descriptor (§3 CronJobRecord, §4.8). The scheduler
//! is interval-driven rather than calendar-cron, matching "time-driven
//! insertion of tasks" in the distilled spec.

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CronJobRecord {
    pub name: String,
    pub agent_id: AgentId,
    pub interval_ms: u64,
    pub prompt_template: String,
    pub enabled: bool,
}

impl CronJobRecord {
    pub fn materially_differs_from(&self, other: &CronJobRecord) -> bool {
        self != other
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
