// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot schema migration. A snapshot carries its own `v` field; opening
//! an older one walks a chain of registered [`Migration`]s up to the
//! current schema version.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MigrationError {
    #[error("snapshot version {0} is newer than this build supports ({1})")]
    TooNew(u32, u32),
    #[error("no migration path from version {0} to {1}")]
    NoPath(u32, u32),
    #[error("malformed snapshot: {0}")]
    Malformed(String),
}

/// A single schema transformation, applied in place to a snapshot's JSON
/// representation.
pub trait Migration: Send + Sync {
    fn source_version(&self) -> u32;
    fn target_version(&self) -> u32;
    fn migrate(&self, snapshot: &mut Value) -> Result<(), MigrationError>;
}

#[derive(Default)]
pub struct MigrationRegistry {
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        MigrationRegistry { migrations: Vec::new() }
    }

    pub fn register(&mut self, migration: Box<dyn Migration>) {
        self.migrations.push(migration);
    }

    fn version_of(snapshot: &Value) -> Result<u32, MigrationError> {
        snapshot
            .get("v")
            .and_then(Value::as_u64)
            .map(|v| v as u32)
            .ok_or_else(|| MigrationError::Malformed("missing integer \"v\" field".to_string()))
    }

    /// Migrate `snapshot` up to `target_version`, applying registered
    /// migrations one step at a time. A no-op when already at the target
    /// version.
    pub fn migrate_to(&self, mut snapshot: Value, target_version: u32) -> Result<Value, MigrationError> {
        let mut current = Self::version_of(&snapshot)?;
        if current > target_version {
            return Err(MigrationError::TooNew(current, target_version));
        }
        while current < target_version {
            let migration = self
                .migrations
                .iter()
                .find(|m| m.source_version() == current)
                .ok_or(MigrationError::NoPath(current, target_version))?;
            migration.migrate(&mut snapshot)?;
            current = migration.target_version();
            if let Some(obj) = snapshot.as_object_mut() {
                obj.insert("v".into(), current.into());
            }
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
