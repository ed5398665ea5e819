// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ojd`: the coordination daemon process. Acquires a single-instance lock
//! on `<home>/daemon.pid`, loads `config.yaml`, opens the Store, restores
//! and reconciles agents/crons/plans against it, and spawns the Scheduler,
//! Config/File Watcher, and IPC Listener (§4) before printing `READY` and
//! waiting on SIGTERM/SIGINT for a graceful drain.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use fs2::FileExt;
use oj_adapters::{Brain, ExecBrain, HttpBrain};
use oj_core::{AgentConfig, Clock, EventBus, SystemClock};
use oj_daemon::registry::BrainFactory;
use oj_daemon::{
    config, env, logging, registry, scheduler, watcher, AgentRegistry, ConfigWatcher, Listener,
    ListenerContext, PlanRegistry, Scheduler, SchedulerConfig,
};
use oj_storage::{MigrationRegistry, Store};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-v" => {
                println!("ojd {VERSION}");
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: ojd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let home = env::home_dir();
    std::fs::create_dir_all(&home)?;

    let _lock_file = match acquire_lock(&home) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("ojd is already running ({})", home.join("daemon.pid").display());
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let log_guard = logging::init(&home, &env::log_level())?;
    info!(home = %home.display(), "starting coordination daemon");

    if let Err(err) = run(&home).await {
        error!(%err, "fatal startup error");
        drop(log_guard);
        std::process::exit(err.exit_code());
    }

    Ok(())
}

fn print_help() {
    println!("ojd {VERSION}");
    println!("Coordination daemon for conversational agents");
    println!();
    println!("USAGE:");
    println!("    ojd");
    println!();
    println!("The daemon is started by the `oj` CLI and should not normally be invoked");
    println!("directly. It listens on a Unix socket (and optionally TCP) for requests.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}

/// Exclusive `try_lock` on `<home>/daemon.pid`, written with this process's
/// pid once held. Mirrors the established create-then-lock-then-truncate
/// ordering so a lock-acquisition failure never wipes the running
/// daemon's pid file.
fn acquire_lock(home: &Path) -> std::io::Result<std::fs::File> {
    let lock_path = home.join("daemon.pid");
    let file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&lock_path)?;
    file.try_lock_exclusive()?;
    let mut file = file;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

async fn run(home: &Path) -> Result<(), oj_core::Error> {
    let mut loaded = config::load(home)?;
    apply_env_overrides(&mut loaded.agents);

    let bus = EventBus::new();
    let store = Arc::new(Store::open(home, bus.clone(), SystemClock, &MigrationRegistry::new())?);

    let recovered = store.requeue_expired_leases(SystemClock.epoch_ms())?;
    if recovered > 0 {
        info!(recovered, "requeued expired leases from a prior run");
    }
    let leases_recovered_at_startup = Arc::new(AtomicUsize::new(recovered));

    let brain_factory: BrainFactory = Arc::new(|cfg: &AgentConfig| -> Arc<dyn Brain> {
        match cfg.provider.as_str() {
            "http" => Arc::new(HttpBrain::new(env::brain_http_address(), "/v1/run")),
            provider => Arc::new(ExecBrain::new(env::brain_exec_command(provider))),
        }
    });
    let on_agent_created: registry::ProvisionHook = Arc::new(|cfg| {
        info!(agent_id = %cfg.agent_id, provider = %cfg.provider, "agent provisioned");
    });
    let registry = Arc::new(AgentRegistry::new(store.clone(), bus.clone(), brain_factory, on_agent_created));

    registry.restore_persisted_agents().await;
    let old_agents = registry.list_agents();
    for err in registry.reconcile(&old_agents, &loaded.agents).await {
        warn!(%err, "agent reconcile error during startup");
    }

    let old_crons = store.list_crons();
    scheduler::reconcile_crons(&store, &old_crons, &loaded.crons);

    let plans = Arc::new(PlanRegistry::new());
    plans.replace_all(loaded.plans);

    let sched = Scheduler::spawn(store.clone(), SystemClock, SchedulerConfig::default());
    let watch = ConfigWatcher::spawn(home.to_path_buf(), registry.clone(), plans.clone(), watcher::noop_asset_change_hook())?;

    let listener_ctx = Arc::new(ListenerContext {
        store: store.clone(),
        bus: bus.clone(),
        registry: registry.clone(),
        plans: plans.clone(),
        started_at: std::time::Instant::now(),
        leases_recovered_at_startup,
    });
    let ipc = Listener::spawn(home, env::bind_address(), listener_ctx)?;

    info!("daemon ready");
    println!("READY");

    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| oj_core::Error::fatal(e.to_string(), 1))?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| oj_core::Error::fatal(e.to_string(), 1))?;

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    shutdown(ipc, watch, sched, registry).await;
    Ok(())
}

async fn shutdown<C: Clock + 'static>(
    ipc: Listener,
    watch: ConfigWatcher,
    sched: Scheduler,
    registry: Arc<AgentRegistry<C>>,
) {
    ipc.stop().await;
    watch.stop().await;
    sched.stop().await;
    registry.drain_all(env::drain_timeout()).await;
    info!("shutdown complete");
}

/// Applies `GOCLAW_WORKER_COUNT`/`GOCLAW_TASK_TIMEOUT_SECONDS` uniformly
/// (§6): these override every agent's corresponding field rather than
/// naming a single agent, since they exist for operational overrides
/// (load testing, CI) rather than per-agent tuning.
fn apply_env_overrides(agents: &mut [AgentConfig]) {
    if let Some(workers) = env::worker_count_override() {
        for agent in agents.iter_mut() {
            agent.workers = workers;
        }
    }
    if let Some(timeout_secs) = env::task_timeout_seconds_override() {
        for agent in agents.iter_mut() {
            agent.task_timeout_ms = timeout_secs * 1000;
        }
    }
}
