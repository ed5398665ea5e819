// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The live set of plan definitions loaded from config (§4.11). Plans have
//! no durable row of their own — unlike agents, which the Store persists —
//! so the process keeps the current set in memory, replaced wholesale on
//! every config reload (§4.9).

use std::collections::HashMap;

use oj_plan::Plan;
use parking_lot::RwLock;

#[derive(Default)]
pub struct PlanRegistry {
    plans: RwLock<HashMap<String, Plan>>,
}

impl PlanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entire set, e.g. after a config reload.
    pub fn replace_all(&self, plans: Vec<Plan>) {
        let mut map = HashMap::with_capacity(plans.len());
        for plan in plans {
            map.insert(plan.name.clone(), plan);
        }
        *self.plans.write() = map;
    }

    pub fn get(&self, name: &str) -> Option<Plan> {
        self.plans.read().get(name).cloned()
    }

    /// Every plan's name and step count, lexicographic by name.
    pub fn list(&self) -> Vec<(String, usize)> {
        let mut out: Vec<(String, usize)> =
            self.plans.read().values().map(|p| (p.name.clone(), p.steps().count())).collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

#[cfg(test)]
#[path = "plans_tests.rs"]
mod tests;
