// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj`: thin CLI client for a running `ojd` (§4.13). Proxies `status` and
//! `doctor` probes, agent/plan/task/session queries, and plan triggers over
//! the daemon's Unix socket; `daemon` subcommands manage the `ojd` process
//! itself via its pid file. Exit codes follow §4.10: 0 = OK, 1 = operational
//! failure, 2 = usage error.

mod client;
mod color;
mod commands;
mod exit_error;
mod output;

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use exit_error::ExitError;
use output::OutputFormat;

use client::DaemonClient;

#[derive(Parser)]
#[command(name = "oj", version, about = "Coordination core CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Render command output as JSON instead of text.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the daemon and print a liveness/activity snapshot.
    Status,
    /// Local diagnostics: bus drop counters, queue depths, lease recovery.
    Doctor,
    /// Agent queries.
    Agent {
        #[command(subcommand)]
        command: AgentCommand,
    },
    /// Plan queries and triggers.
    Plan {
        #[command(subcommand)]
        command: PlanCommand,
    },
    /// Task creation and inspection.
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Session queries.
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },
    /// Daemon process control.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

#[derive(Subcommand)]
enum AgentCommand {
    /// List every configured agent.
    List,
}

#[derive(Subcommand)]
enum PlanCommand {
    /// List every known plan definition.
    List,
    /// Start a run of `plan_name` in `session_id`.
    Trigger { plan_name: String, session_id: String, user_input: String },
    /// Show a running or finished plan execution.
    Show { exec_id: String },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Create a task on `agent_id`.
    Create {
        agent_id: String,
        prompt: String,
        #[arg(long)]
        session: Option<String>,
    },
    /// Show a task by id.
    Show { task_id: String },
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Every task in `session_id`, oldest first.
    History { session_id: String },
}

#[derive(Subcommand)]
enum DaemonCommand {
    /// Start `ojd` in the background.
    Start {
        /// Run in the foreground instead of detaching.
        #[arg(long)]
        foreground: bool,
    },
    /// Stop a running `ojd`.
    Stop,
    /// Stop and restart `ojd`.
    Restart,
    /// Check whether `ojd` is running.
    Status,
}

#[tokio::main]
async fn main() {
    let mut command = <Cli as clap::CommandFactory>::command();
    command = command.styles(color::styles());
    let cli = Cli::from_arg_matches(&command.get_matches()).unwrap_or_else(|e| e.exit());
    if let Err(err) = dispatch(cli).await {
        if let Some(exit_err) = err.downcast_ref::<ExitError>() {
            eprintln!("error: {}", exit_err.message);
            std::process::exit(exit_err.code);
        }
        if let Some(client::ClientError::DaemonError { kind, message }) = err.downcast_ref::<client::ClientError>() {
            eprintln!("error: {kind}: {message}");
            std::process::exit(exit_code_for_kind(kind));
        }
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Mirrors `oj_core::Error::exit_code` (§4.10) for errors that crossed the
/// wire as a `Response::Error { kind, .. }` rather than a live `Error` value.
fn exit_code_for_kind(kind: &str) -> i32 {
    match kind {
        "invalid_input" | "conflict" | "hop_limit" => 2,
        _ => 1,
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let home = oj_daemon::env::home_dir();
    let client = DaemonClient::new(home.clone());
    let format = cli.output;

    match cli.command {
        Command::Status => commands::status::run(&client, format).await,
        Command::Doctor => commands::doctor::run(&client, format).await,
        Command::Agent { command: AgentCommand::List } => commands::agent::list(&client, format).await,
        Command::Plan { command } => match command {
            PlanCommand::List => commands::plan::list(&client, format).await,
            PlanCommand::Trigger { plan_name, session_id, user_input } => {
                commands::plan::trigger(&client, plan_name, session_id, user_input, format).await
            }
            PlanCommand::Show { exec_id } => commands::plan::show(&client, exec_id, format).await,
        },
        Command::Task { command } => match command {
            TaskCommand::Create { agent_id, prompt, session } => {
                commands::task::create(&client, agent_id, session, prompt, format).await
            }
            TaskCommand::Show { task_id } => commands::task::show(&client, task_id, format).await,
        },
        Command::Session { command: SessionCommand::History { session_id } } => {
            commands::session::history(&client, session_id, format).await
        }
        Command::Daemon { command } => match command {
            DaemonCommand::Start { foreground } => commands::daemon::start(&home, foreground).await,
            DaemonCommand::Stop => commands::daemon::stop(&home).await,
            DaemonCommand::Restart => commands::daemon::restart(&home).await,
            DaemonCommand::Status => commands::daemon::status(&client, format).await,
        },
    }
}
