// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session entity (§3): an ordered conversation bound to one agent at
//! creation. Immutable thereafter — a session never migrates agents.

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a session.
    pub struct SessionId("ses-");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub agent_id: AgentId,
    pub created_at_ms: u64,
}

impl Session {
    pub fn new(agent_id: AgentId, created_at_ms: u64) -> Self {
        Self { session_id: SessionId::new(), agent_id, created_at_ms }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
