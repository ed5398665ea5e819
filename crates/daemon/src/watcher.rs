// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config/File Watchers (§4.9): watches the home directory for changes to
//! `config.yaml`/plan files (triggers `AgentRegistry::reconcile` + plan
//! rebuild) and `soul.md`/`agents.md`/`policy.yaml` (fires a caller-supplied
//! update hook — a no-op by default, since policy evaluation is out of
//! scope, §9). Debounces/coalesces events over a 150ms window and tolerates
//! rename-and-replace editors, matching `oj-cli`'s existing log-tailing
//! watcher.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use oj_core::{AgentConfig, Clock, Error};
use oj_plan::Plan;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::plans::PlanRegistry;
use crate::registry::AgentRegistry;

pub const DEBOUNCE: Duration = Duration::from_millis(150);

/// Fires when `soul.md`, `agents.md`, or `policy.yaml` changes. A no-op by
/// default: this crate has no prompt/policy engine of its own (§9), the
/// hook exists so a future policy layer has a seam.
pub type AssetChangeHook = Arc<dyn Fn() + Send + Sync>;

pub fn noop_asset_change_hook() -> AssetChangeHook {
    Arc::new(|| {})
}

pub struct ConfigWatcher {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ConfigWatcher {
    /// Spawns a background watcher over `home`. Re-reads `config.yaml` (via
    /// `config::load`) on every debounced change under `home`, diffs the new
    /// agent list against `registry`'s current one via `reconcile`, and
    /// invokes `on_asset_change` whenever `soul.md`/`agents.md`/`policy.yaml`
    /// is among the changed paths.
    pub fn spawn<C: Clock + 'static>(
        home: PathBuf,
        registry: Arc<AgentRegistry<C>>,
        plans: Arc<PlanRegistry>,
        on_asset_change: AssetChangeHook,
    ) -> Result<Self, Error> {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<Vec<PathBuf>>(64);
        let watch_home = home.clone();
        let mut watcher = notify::recommended_watcher(move |res: Result<NotifyEvent, notify::Error>| {
            let Ok(event) = res else { return };
            if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)) {
                return;
            }
            let _ = tx.blocking_send(event.paths);
        })
        .map_err(|err| Error::storage(format!("starting config watcher: {err}")))?;
        watcher
            .watch(&watch_home, RecursiveMode::Recursive)
            .map_err(|err| Error::storage(format!("watching {}: {err}", watch_home.display())))?;

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            // Keep the watcher alive for the task's lifetime; dropping it
            // would stop delivery.
            let _watcher = watcher;
            run(home, registry, plans, on_asset_change, &mut rx, task_cancel).await;
        });

        Ok(Self { cancel, handle })
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

async fn run<C: Clock + 'static>(
    home: PathBuf,
    registry: Arc<AgentRegistry<C>>,
    plans: Arc<PlanRegistry>,
    on_asset_change: AssetChangeHook,
    rx: &mut tokio::sync::mpsc::Receiver<Vec<PathBuf>>,
    cancel: CancellationToken,
) {
    loop {
        let first = tokio::select! {
            _ = cancel.cancelled() => return,
            paths = rx.recv() => match paths {
                Some(paths) => paths,
                None => return,
            },
        };

        let mut changed = first;
        // Coalesce anything else that lands within the debounce window
        // (including the re-add a rename-and-replace editor performs after
        // its initial remove).
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(DEBOUNCE) => break,
                more = rx.recv() => match more {
                    Some(paths) => changed.extend(paths),
                    None => break,
                },
            }
        }

        handle_change(&home, &registry, &plans, &on_asset_change, &changed).await;
    }
}

async fn handle_change<C: Clock + 'static>(
    home: &Path,
    registry: &Arc<AgentRegistry<C>>,
    plans: &Arc<PlanRegistry>,
    on_asset_change: &AssetChangeHook,
    changed: &[PathBuf],
) {
    let touches = |name: &str| changed.iter().any(|p| p.file_name().is_some_and(|f| f == name));

    if touches("config.yaml") || changed.iter().any(|p| p.extension().is_some_and(|e| e == "hcl")) {
        match crate::config::load(home) {
            Ok(loaded) => reload_agents(registry, plans, loaded.agents, loaded.plans).await,
            Err(err) => warn!(%err, "config reload failed, keeping previous configuration"),
        }
    }

    if touches("soul.md") || touches("agents.md") || touches("policy.yaml") {
        info!("asset change detected, firing update hook");
        (on_asset_change)();
    }
}

async fn reload_agents<C: Clock + 'static>(
    registry: &Arc<AgentRegistry<C>>,
    plans: &Arc<PlanRegistry>,
    new_agents: Vec<AgentConfig>,
    new_plans: Vec<Plan>,
) {
    let old_agents = registry.list_agents();
    let errors = registry.reconcile(&old_agents, &new_agents).await;
    for err in &errors {
        warn!(%err, "agent reconcile error during config reload");
    }
    let plan_count = new_plans.len();
    plans.replace_all(new_plans);
    info!(agent_count = new_agents.len(), plan_count, "config reloaded");
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
