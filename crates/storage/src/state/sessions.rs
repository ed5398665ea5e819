// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session record handlers.

use crate::record::Record;

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, record: &Record) {
    if let Record::SessionCreated { session } = record {
        state.sessions.entry(session.session_id).or_insert_with(|| session.clone());
    }
}
