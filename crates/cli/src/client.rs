// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin client to a running `ojd` over its Unix socket (§4.13, §6):
//! connect, send one [`oj_wire::Request`], read back one
//! [`oj_wire::Response`]. One request per connection, matching the
//! daemon listener's one-response-per-connection contract.

use std::path::PathBuf;

use oj_wire::{ProtocolError, Request, Response};
use thiserror::Error;
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon is not running (no socket at {0})")]
    NotRunning(PathBuf),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("daemon returned an error: {kind}: {message}")]
    DaemonError { kind: String, message: String },
    #[error("unexpected response for this request")]
    UnexpectedResponse,
}

impl ClientError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, ClientError::NotRunning(_))
    }
}

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Resolve `<home>/daemon.sock` without connecting yet.
    pub fn new(home: PathBuf) -> Self {
        Self { socket_path: home.join("daemon.sock") }
    }

    /// Probe that the daemon's socket is present and connectable.
    pub async fn connect(&self) -> Result<(), ClientError> {
        UnixStream::connect(&self.socket_path)
            .await
            .map(|_| ())
            .map_err(|_| ClientError::NotRunning(self.socket_path.clone()))
    }

    /// Send `request`, returning the daemon's single reply.
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|_| ClientError::NotRunning(self.socket_path.clone()))?;
        let bytes = oj_wire::encode(request)?;
        oj_wire::write_message(&mut stream, &bytes).await?;
        let response: Response = oj_wire::decode(&oj_wire::read_message(&mut stream).await?)?;
        if let Response::Error { kind, message } = response {
            return Err(ClientError::DaemonError { kind, message });
        }
        Ok(response)
    }
}
