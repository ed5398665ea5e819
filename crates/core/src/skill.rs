// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Installed-skill provenance record (§3). Opaque to the coordination core:
//! only the Registry's provisioning hook touches this, and only to pass it
//! through to the (external, out-of-scope) skill installer/sandbox.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillSourceKind {
    Git,
    Local,
    Registry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledSkill {
    pub id: String,
    pub source_kind: SkillSourceKind,
    pub source_url: String,
    pub source_ref: String,
}
