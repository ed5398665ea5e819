// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC wire types consumed by the core (§6): DTOs only — task creation,
//! session history, system status, and plan listing/trigger. Wire format is
//! a 4-byte big-endian length prefix followed by a JSON payload.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod request;
mod response;
mod wire;

pub use request::Request;
pub use response::{DoctorReport, PlanSummary, Response, StatusSnapshot};
pub use wire::{decode, encode, read_message, read_request, write_message, write_response, ProtocolError};
