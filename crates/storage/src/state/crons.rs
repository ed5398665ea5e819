// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron/heartbeat descriptor record handlers.

use crate::record::Record;

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, record: &Record) {
    match record {
        Record::CronUpserted { cron } => {
            state.crons.insert(cron.name.clone(), cron.clone());
        }
        Record::CronRemoved { name } => {
            state.crons.remove(name);
        }
        _ => {}
    }
}
