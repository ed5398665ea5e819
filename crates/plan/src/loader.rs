// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan Loader (§4.7): parses HCL plan descriptors into validated [`Plan`]s.
//!
//! ```hcl
//! plan "deploy" {
//!   step "build" {
//!     agent_id = "builder"
//!     prompt   = "Build the project"
//!   }
//!   step "test" {
//!     agent_id   = "tester"
//!     prompt     = "Test the output of {build.output}"
//!     depends_on = ["build"]
//!   }
//! }
//! ```
//!
//! Steps referencing an agent id outside `known_agent_ids` are rejected with
//! `Error::InvalidInput`; a plan name already seen in a prior file is
//! rejected with `Error::Conflict`. Validation is total: a file with one
//! invalid plan fails that plan's load without touching its siblings, and a
//! caller loading several files independently keeps siblings from other
//! files intact.

use crate::plan::{Plan, PlanStep};
use indexmap::IndexMap;
use oj_core::Error;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
struct PlanFile {
    #[serde(rename = "plan", default)]
    plans: IndexMap<String, PlanDoc>,
}

#[derive(Debug, Deserialize)]
struct PlanDoc {
    #[serde(rename = "step", default)]
    steps: IndexMap<String, StepDoc>,
}

#[derive(Debug, Deserialize)]
struct StepDoc {
    agent_id: String,
    prompt: String,
    #[serde(default)]
    depends_on: Vec<String>,
}

/// Parse every `plan` block in `content`, validating each against
/// `known_agent_ids` and against the plan names already present in
/// `existing_names` (to catch duplicates across files loaded one at a time).
///
/// Returns the plans successfully parsed from this file; a plan that fails
/// validation is reported via the accompanying error list rather than
/// aborting the whole file.
pub fn load_plans(
    content: &str,
    known_agent_ids: &HashSet<String>,
    existing_names: &HashSet<String>,
) -> (Vec<Plan>, Vec<Error>) {
    let file: PlanFile = match hcl::from_str(content) {
        Ok(file) => file,
        Err(err) => return (Vec::new(), vec![Error::invalid_input(format!("plan file: {err}"))]),
    };

    let mut plans = Vec::new();
    let mut errors = Vec::new();
    let mut seen_in_file = HashSet::new();

    for (name, doc) in file.plans {
        if existing_names.contains(&name) || !seen_in_file.insert(name.clone()) {
            errors.push(Error::conflict(format!("duplicate plan name '{name}'")));
            continue;
        }

        match build_plan(name, doc, known_agent_ids) {
            Ok(plan) => plans.push(plan),
            Err(err) => errors.push(err),
        }
    }

    (plans, errors)
}

fn build_plan(
    name: String,
    doc: PlanDoc,
    known_agent_ids: &HashSet<String>,
) -> Result<Plan, Error> {
    let mut steps = Vec::with_capacity(doc.steps.len());
    for (id, step_doc) in doc.steps {
        if !known_agent_ids.contains(&step_doc.agent_id) {
            return Err(Error::invalid_input(format!(
                "plan '{name}' step '{id}' references unknown agent '{}'",
                step_doc.agent_id
            )));
        }
        steps.push(PlanStep {
            id,
            agent_id: step_doc.agent_id,
            prompt: step_doc.prompt,
            depends_on: step_doc.depends_on,
        });
    }
    Plan::new(name, steps)
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
