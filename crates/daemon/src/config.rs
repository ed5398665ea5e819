// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration Layer (§4.11): deserializes the home directory's
//! `config.yaml` into `AgentConfig`/`CronJobRecord` rows and loads the plan
//! files it names, via `oj-plan`. `soul.md`, `agents.md`, and `policy.yaml`
//! are passed through unparsed — this crate has no prompt/policy engine of
//! its own (§9).

use oj_core::{AgentConfig, AgentId, CronJobRecord, Error};
use oj_plan::Plan;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

const KNOWN_TOP_LEVEL_KEYS: &[&str] = &["agents", "crons", "plans"];

fn default_workers() -> u32 {
    1
}

fn default_task_timeout_ms() -> u64 {
    600_000
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct AgentDoc {
    #[serde(default)]
    display_name: Option<String>,
    provider: String,
    model: String,
    #[serde(default = "default_workers")]
    workers: u32,
    #[serde(default = "default_task_timeout_ms")]
    task_timeout_ms: u64,
    #[serde(default)]
    max_queue_depth: u32,
    #[serde(default)]
    skills: Option<HashSet<String>>,
    #[serde(default)]
    preferred_search: Option<String>,
    #[serde(default)]
    delegation_max_hops: u32,
}

#[derive(Debug, Deserialize)]
struct CronDoc {
    agent_id: String,
    interval_ms: u64,
    prompt_template: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

/// Parsed `config.yaml` plus the opaque home-directory text assets and the
/// plans it names.
pub struct LoadedConfig {
    pub agents: Vec<AgentConfig>,
    pub crons: Vec<CronJobRecord>,
    pub plans: Vec<Plan>,
    pub soul: String,
    pub agents_md: String,
    pub policy: String,
}

/// Load `config.yaml`, `soul.md`, `agents.md`, and `policy.yaml` from `home`,
/// and the plan files `config.yaml`'s `plans` list names. Any failure here
/// is a startup-time `Error::Fatal` (§4.10): this is only ever called
/// before the Tokio runtime's workers start.
pub fn load(home: &Path) -> Result<LoadedConfig, Error> {
    let config_path = home.join("config.yaml");
    let raw = std::fs::read_to_string(&config_path)
        .map_err(|err| Error::fatal(format!("reading {}: {err}", config_path.display()), 1))?;
    let doc: serde_yaml::Value = serde_yaml::from_str(&raw)
        .map_err(|err| Error::fatal(format!("parsing {}: {err}", config_path.display()), 1))?;

    warn_on_unknown_top_level_keys(&doc);

    let agent_docs: HashMap<String, AgentDoc> = match doc.get("agents") {
        Some(value) => serde_yaml::from_value(value.clone())
            .map_err(|err| Error::fatal(format!("config.yaml 'agents': {err}"), 1))?,
        None => HashMap::new(),
    };

    let mut agents = Vec::with_capacity(agent_docs.len());
    for (id, doc) in agent_docs {
        let cfg = AgentConfig {
            agent_id: AgentId::named(&id),
            display_name: doc.display_name.unwrap_or_else(|| id.clone()),
            provider: doc.provider,
            model: doc.model,
            workers: doc.workers,
            task_timeout_ms: doc.task_timeout_ms,
            max_queue_depth: doc.max_queue_depth,
            skills: doc.skills,
            preferred_search: doc.preferred_search,
            delegation_max_hops: doc.delegation_max_hops,
        };
        cfg.validate().map_err(|msg| Error::fatal(format!("config.yaml agent '{id}': {msg}"), 1))?;
        agents.push(cfg);
    }
    agents.sort_by(|a, b| a.agent_id.as_str().cmp(b.agent_id.as_str()));

    let cron_docs: HashMap<String, CronDoc> = match doc.get("crons") {
        Some(value) => serde_yaml::from_value(value.clone())
            .map_err(|err| Error::fatal(format!("config.yaml 'crons': {err}"), 1))?,
        None => HashMap::new(),
    };
    let mut crons: Vec<CronJobRecord> = cron_docs
        .into_iter()
        .map(|(name, doc)| CronJobRecord {
            name,
            agent_id: AgentId::named(&doc.agent_id),
            interval_ms: doc.interval_ms,
            prompt_template: doc.prompt_template,
            enabled: doc.enabled,
        })
        .collect();
    crons.sort_by(|a, b| a.name.cmp(&b.name));

    let plan_paths: Vec<String> = match doc.get("plans") {
        Some(value) => serde_yaml::from_value(value.clone())
            .map_err(|err| Error::fatal(format!("config.yaml 'plans': {err}"), 1))?,
        None => Vec::new(),
    };
    let known_agent_ids: HashSet<String> = agents.iter().map(|a| a.agent_id.as_str().to_string()).collect();
    let plans = load_plan_files(home, &plan_paths, &known_agent_ids)?;

    Ok(LoadedConfig {
        agents,
        crons,
        plans,
        soul: read_opaque(home, "soul.md")?,
        agents_md: read_opaque(home, "agents.md")?,
        policy: read_opaque(home, "policy.yaml")?,
    })
}

fn warn_on_unknown_top_level_keys(doc: &serde_yaml::Value) {
    let Some(mapping) = doc.as_mapping() else { return };
    for key in mapping.keys() {
        if let Some(key_str) = key.as_str() {
            if !KNOWN_TOP_LEVEL_KEYS.contains(&key_str) {
                tracing::warn!(key = key_str, "ignoring unrecognised top-level config.yaml key");
            }
        }
    }
}

/// Load every `*.hcl` plan file named in `plan_paths` (relative to `home`),
/// carrying the accumulated plan-name set forward so a duplicate name in a
/// later file is still caught (§4.7: "a plan file with one invalid plan
/// fails that plan's load without affecting sibling plans").
fn load_plan_files(home: &Path, plan_paths: &[String], known_agent_ids: &HashSet<String>) -> Result<Vec<Plan>, Error> {
    let mut plans = Vec::new();
    let mut existing_names: HashSet<String> = HashSet::new();

    for rel_path in plan_paths {
        let path: PathBuf = home.join(rel_path);
        let content = std::fs::read_to_string(&path)
            .map_err(|err| Error::fatal(format!("reading plan file {}: {err}", path.display()), 1))?;
        let (loaded, errors) = oj_plan::load_plans(&content, known_agent_ids, &existing_names);
        for err in &errors {
            tracing::warn!(path = %path.display(), %err, "skipping invalid plan");
        }
        for plan in loaded {
            existing_names.insert(plan.name.clone());
            plans.push(plan);
        }
    }

    Ok(plans)
}

fn read_opaque(home: &Path, name: &str) -> Result<String, Error> {
    match std::fs::read_to_string(home.join(name)) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(Error::fatal(format!("reading {name}: {err}"), 1)),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
