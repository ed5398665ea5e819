// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Plan`/`PlanStep` value types (§4.7) and their structural validation:
//! at least one step, unique step ids, `depends_on` referring only to
//! defined steps, and an acyclic dependency graph.

use indexmap::IndexMap;
use oj_core::Error;
use std::collections::HashSet;

/// One step of a [`Plan`]. Steps are immutable once the plan is loaded;
/// `depends_on` ids are always resolved against sibling steps in the same
/// plan, never across plans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    pub id: String,
    pub agent_id: String,
    pub prompt: String,
    pub depends_on: Vec<String>,
}

/// An immutable, validated multi-step execution definition.
///
/// `steps` preserves declaration order (via [`IndexMap`]) so that, absent a
/// dependency constraint, wave computation's lexicographic tie-break has a
/// stable source order to read diffs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub name: String,
    steps: IndexMap<String, PlanStep>,
}

impl Plan {
    /// Build and validate a plan from its steps. Steps may be given in any
    /// order; `depends_on` need not be topologically pre-sorted.
    pub fn new(name: impl Into<String>, steps: Vec<PlanStep>) -> Result<Self, Error> {
        let name = name.into();
        if steps.is_empty() {
            return Err(Error::invalid_input(format!("plan '{name}' has no steps")));
        }

        let mut by_id = IndexMap::new();
        for step in steps {
            if by_id.insert(step.id.clone(), step).is_some() {
                return Err(Error::invalid_input(format!(
                    "plan '{name}' has duplicate step id"
                )));
            }
        }

        for step in by_id.values() {
            for dep in &step.depends_on {
                if !by_id.contains_key(dep) {
                    return Err(Error::invalid_input(format!(
                        "plan '{name}' step '{}' depends on undefined step '{dep}'",
                        step.id
                    )));
                }
            }
        }

        let plan = Plan { name, steps: by_id };
        plan.waves()?;
        Ok(plan)
    }

    pub fn step(&self, id: &str) -> Option<&PlanStep> {
        self.steps.get(id)
    }

    pub fn steps(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps.values()
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Kahn's algorithm: `wave[0]` is every step with no deps; `wave[k+1]` is
    /// every step whose deps are all satisfied by `∪waves[≤k]`. Each wave is
    /// sorted lexicographically by step id for a deterministic dispatch
    /// order. Errors with `Error::InvalidInput` if the graph has a cycle.
    pub fn waves(&self) -> Result<Vec<Vec<String>>, Error> {
        let mut remaining: HashSet<&str> = self.steps.keys().map(String::as_str).collect();
        let mut satisfied: HashSet<&str> = HashSet::new();
        let mut waves = Vec::new();

        while !remaining.is_empty() {
            let mut wave: Vec<&str> = remaining
                .iter()
                .copied()
                .filter(|id| {
                    self.steps[*id].depends_on.iter().all(|dep| satisfied.contains(dep.as_str()))
                })
                .collect();

            if wave.is_empty() {
                return Err(Error::invalid_input(format!(
                    "plan '{}' has a cyclic dependency among: {}",
                    self.name,
                    remaining.iter().copied().collect::<Vec<_>>().join(", ")
                )));
            }

            wave.sort_unstable();
            for id in &wave {
                remaining.remove(id);
                satisfied.insert(id);
            }
            waves.push(wave.into_iter().map(String::from).collect());
        }

        Ok(waves)
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
