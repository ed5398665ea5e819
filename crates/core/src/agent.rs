// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration record.
//!
//! An `Agent` binds a provider + model to a worker pool shape. It is the
//! durable record the Store persists (§3) and the Registry materializes into
//! a running pool of workers bound to a `Brain` (§4.4, §9).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

crate::define_id! {
    /// Unique identifier for an agent. Also the human-chosen config key,
    /// so unlike most ids it is not a random nanoid in practice — but it
    /// is stored in the same fixed-width buffer.
    pub struct AgentId("agt-");
}

impl AgentId {
    /// Agents are usually named directly from config (`agent_id` must match
    /// `[a-z0-9_-]+`, §3), not randomly generated. This bypasses the
    /// `agt-` prefix convention used for nanoid-style ids elsewhere.
    pub fn named(name: &str) -> Self {
        Self::from_string(name)
    }

    pub const DEFAULT: &'static str = "default";

    pub fn is_default(&self) -> bool {
        self.as_str() == Self::DEFAULT
    }
}

/// Validate an agent id against `[a-z0-9_-]+` (§3).
pub fn validate_agent_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("agent id must not be empty".to_string());
    }
    if !id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-') {
        return Err(format!("agent id {id:?} must match [a-z0-9_-]+"));
    }
    Ok(())
}

/// Durable configuration for a single agent (§3 Agent entity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub agent_id: AgentId,
    pub display_name: String,
    pub provider: String,
    pub model: String,
    /// Worker count W ≥ 1.
    pub workers: u32,
    /// Per-task timeout T > 0, in milliseconds.
    pub task_timeout_ms: u64,
    /// Max queue depth Q. 0 = unbounded.
    pub max_queue_depth: u32,
    #[serde(default)]
    pub skills: Option<HashSet<String>>,
    #[serde(default)]
    pub preferred_search: Option<String>,
    /// Upper bound on delegation chain depth this agent may participate in.
    /// Must satisfy `delegation_max_hops <= workers - 1` (§4.3, §8 invariant 5).
    #[serde(default = "default_delegation_max_hops")]
    pub delegation_max_hops: u32,
}

fn default_delegation_max_hops() -> u32 {
    0
}

impl AgentConfig {
    /// Validate the fields that the rest of the system treats as invariants
    /// rather than re-checking at every call site.
    pub fn validate(&self) -> Result<(), String> {
        validate_agent_id(self.agent_id.as_str())?;
        if self.workers == 0 {
            return Err(format!("agent {} must have at least 1 worker", self.agent_id));
        }
        if self.task_timeout_ms == 0 {
            return Err(format!("agent {} must have a positive task timeout", self.agent_id));
        }
        if self.delegation_max_hops > self.workers.saturating_sub(1) {
            return Err(format!(
                "agent {} delegation_max_hops ({}) must be <= workers - 1 ({})",
                self.agent_id,
                self.delegation_max_hops,
                self.workers.saturating_sub(1)
            ));
        }
        Ok(())
    }

    /// Whether this agent advertises the given capability, used by
    /// capability-routed delegation (§4.5 step 3).
    pub fn has_capability(&self, capability: &str) -> bool {
        self.skills.as_ref().is_some_and(|s| s.contains(capability))
            || self.preferred_search.as_deref() == Some(capability)
    }

    /// Fields considered "material" for hot-reload diffing (§4.4 `reconcile`):
    /// any difference here means remove-and-recreate rather than a no-op.
    pub fn materially_differs_from(&self, other: &AgentConfig) -> bool {
        self != other
    }
}

crate::builder! {
    pub struct AgentConfigBuilder => AgentConfig {
        into {
            display_name: String = "Test Agent",
            provider: String = "test-provider",
            model: String = "test-model",
        }
        set {
            agent_id: AgentId = AgentId::named("test-agent"),
            workers: u32 = 1,
            task_timeout_ms: u64 = 600_000,
            max_queue_depth: u32 = 0,
            delegation_max_hops: u32 = 0,
            skills: Option<HashSet<String>> = None,
        }
        option {
            preferred_search: String = None,
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
