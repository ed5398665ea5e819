// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_session_binds_the_given_agent() {
    let agent = AgentId::named("default");
    let session = Session::new(agent, 1_000);
    assert_eq!(session.agent_id, AgentId::named("default"));
    assert_eq!(session.created_at_ms, 1_000);
}

#[test]
fn two_sessions_get_distinct_ids() {
    let agent = AgentId::named("default");
    let a = Session::new(agent, 0);
    let b = Session::new(agent, 0);
    assert_ne!(a.session_id, b.session_id);
}
