// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable agent config record handlers.

use crate::record::Record;

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, record: &Record) {
    match record {
        Record::AgentUpserted { config } => {
            state.agents.insert(config.agent_id, config.clone());
        }
        Record::AgentRemoved { agent_id } => {
            state.agents.remove(agent_id);
        }
        _ => {}
    }
}
