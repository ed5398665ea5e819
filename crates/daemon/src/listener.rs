// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC Listener (§4.13, §6): accepts connections on `<home>/daemon.sock`
//! (plus an optional TCP listener when `GOCLAW_BIND_ADDRESS` is set) and
//! dispatches each `oj_wire::Request` to the Store/Registry/PlanExecutor/
//! DelegationService, replying with a single `oj_wire::Response` per
//! connection. One spawned task per connection so a slow client never
//! blocks another.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use oj_core::{Clock, Error};
use oj_engine::PlanExecutor;
use oj_storage::Store;
use oj_wire::{DoctorReport, PlanSummary, Request, Response, StatusSnapshot};
use tokio::net::{TcpListener, UnixListener};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::plans::PlanRegistry;
use crate::registry::AgentRegistry;

pub struct ListenerContext<C: Clock> {
    pub store: Arc<Store<C>>,
    pub bus: oj_core::EventBus,
    pub registry: Arc<AgentRegistry<C>>,
    pub plans: Arc<PlanRegistry>,
    pub started_at: Instant,
    /// Count from the startup-time lease-recovery sweep (§4.13 `doctor`).
    pub leases_recovered_at_startup: Arc<AtomicUsize>,
}

pub struct Listener {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Listener {
    /// Binds `<home>/daemon.sock`, removing a stale socket file left behind
    /// by an unclean shutdown, plus a TCP listener on `bind_address` when
    /// one is given. Spawns the accept loop and returns immediately.
    pub fn spawn<C: Clock + 'static>(
        home: &Path,
        bind_address: Option<String>,
        ctx: Arc<ListenerContext<C>>,
    ) -> Result<Self, Error> {
        let socket_path = home.join("daemon.sock");
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .map_err(|err| Error::storage(format!("removing stale socket {}: {err}", socket_path.display())))?;
        }
        let unix = UnixListener::bind(&socket_path)
            .map_err(|err| Error::storage(format!("binding {}: {err}", socket_path.display())))?;

        let tcp = match bind_address {
            Some(addr) => {
                let std_listener = std::net::TcpListener::bind(&addr)
                    .map_err(|err| Error::storage(format!("binding {addr}: {err}")))?;
                std_listener
                    .set_nonblocking(true)
                    .map_err(|err| Error::storage(format!("setting {addr} non-blocking: {err}")))?;
                Some(TcpListener::from_std(std_listener).map_err(|err| Error::storage(format!("{err}")))?)
            }
            None => None,
        };

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move { run(unix, tcp, ctx, task_cancel).await });

        Ok(Self { cancel, handle })
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

async fn run<C: Clock + 'static>(
    unix: UnixListener,
    tcp: Option<TcpListener>,
    ctx: Arc<ListenerContext<C>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            accepted = unix.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        let ctx = ctx.clone();
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            handle_connection(reader, writer, ctx).await;
                        });
                    }
                    Err(err) => error!(%err, "unix accept error"),
                }
            }
            accepted = accept_tcp(tcp.as_ref()) => {
                match accepted {
                    Some(Ok((stream, _addr))) => {
                        let ctx = ctx.clone();
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            handle_connection(reader, writer, ctx).await;
                        });
                    }
                    Some(Err(err)) => error!(%err, "tcp accept error"),
                    None => std::future::pending::<()>().await,
                }
            }
        }
    }
}

async fn accept_tcp(
    tcp: Option<&TcpListener>,
) -> Option<std::io::Result<(tokio::net::TcpStream, std::net::SocketAddr)>> {
    match tcp {
        Some(listener) => Some(listener.accept().await),
        None => None,
    }
}

async fn handle_connection<R, W, C>(mut reader: R, mut writer: W, ctx: Arc<ListenerContext<C>>)
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
    C: Clock + 'static,
{
    let request = match oj_wire::read_request(&mut reader).await {
        Ok(request) => request,
        Err(err) => {
            debug!(%err, "failed to read request");
            return;
        }
    };

    debug!(request = ?request, "received request");
    let cancel = CancellationToken::new();
    let response = dispatch(request, &ctx, &cancel).await;

    if let Err(err) = oj_wire::write_response(&mut writer, &response).await {
        debug!(%err, "failed to write response");
    }
}

async fn dispatch<C: Clock + 'static>(
    request: Request,
    ctx: &Arc<ListenerContext<C>>,
    cancel: &CancellationToken,
) -> Response {
    match request {
        Request::Status => Response::Status(status_snapshot(ctx)),
        Request::Doctor => Response::Doctor(doctor_report(ctx)),
        Request::CreateTask { agent_id, session_id, kind, prompt } => {
            let session_id = match session_id {
                Some(id) => id,
                None => match ctx.store.create_session(agent_id) {
                    Ok(session) => session.session_id,
                    Err(err) => return error_response(err),
                },
            };
            match ctx.store.enqueue_task(agent_id, session_id, kind, prompt, None) {
                Ok(task) => Response::Task(Box::new(task)),
                Err(err) => error_response(err),
            }
        }
        Request::GetTask { task_id } => match ctx.store.get_task(task_id.as_str()) {
            Some(task) => Response::Task(Box::new(task)),
            None => error_response(Error::not_found(format!("task {task_id} not found"))),
        },
        Request::GetSessionHistory { session_id } => Response::Tasks(ctx.store.list_tasks_by_session(session_id)),
        Request::ListAgents => Response::Agents(ctx.registry.list_agents()),
        Request::ListPlans => {
            let summaries =
                ctx.plans.list().into_iter().map(|(name, step_count)| PlanSummary { name, step_count }).collect();
            Response::Plans(summaries)
        }
        Request::TriggerPlan { plan_name, session_id, user_input } => {
            trigger_plan(ctx, &plan_name, session_id, &user_input, cancel).await
        }
        Request::GetPlanExecution { exec_id } => match ctx.store.get_plan_execution(exec_id.as_str()) {
            Some(exec) => Response::PlanExecution(Box::new(exec)),
            None => error_response(Error::not_found(format!("plan execution {exec_id} not found"))),
        },
    }
}

async fn trigger_plan<C: Clock + 'static>(
    ctx: &Arc<ListenerContext<C>>,
    plan_name: &str,
    session_id: oj_core::SessionId,
    user_input: &str,
    cancel: &CancellationToken,
) -> Response {
    let Some(plan) = ctx.plans.get(plan_name) else {
        return error_response(Error::not_found(format!("plan '{plan_name}' not found")));
    };

    let executor = PlanExecutor::new(ctx.store.clone(), ctx.bus.clone());
    match executor.execute(&plan, session_id, user_input, cancel).await {
        Ok(exec_id) => Response::PlanStarted { exec_id },
        Err(err) => error_response(err),
    }
}

fn status_snapshot<C: Clock>(ctx: &Arc<ListenerContext<C>>) -> StatusSnapshot {
    let agents = ctx.registry.list_agents();
    let tasks_queued: usize = agents.iter().map(|a| ctx.store.queue_depth(a.agent_id)).sum();
    let tasks_running: usize =
        ctx.registry.list_running_agents().iter().filter_map(|id| ctx.registry.leased_count(*id)).sum::<u64>() as usize;

    StatusSnapshot {
        uptime_secs: ctx.started_at.elapsed().as_secs(),
        agents_running: ctx.registry.list_running_agents().len(),
        tasks_queued,
        tasks_running,
        plans_running: ctx.store.recover_running_plans().len(),
    }
}

fn doctor_report<C: Clock>(ctx: &Arc<ListenerContext<C>>) -> DoctorReport {
    let mut queue_depths = HashMap::new();
    for agent in ctx.registry.list_agents() {
        queue_depths.insert(agent.agent_id.as_str().to_string(), ctx.store.queue_depth(agent.agent_id));
    }
    DoctorReport {
        bus: ctx.bus.metrics(),
        queue_depths,
        leases_recovered_last_sweep: ctx.leases_recovered_at_startup.load(Ordering::Relaxed),
    }
}

fn error_response(err: Error) -> Response {
    Response::Error { kind: err.kind().to_string(), message: err.to_string() }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
