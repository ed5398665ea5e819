// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oj-adapters: the capability-trait boundary between the coordination core
//! and its external collaborators (§9 REDESIGN FLAGS) — [`Brain`] (LLM
//! providers), [`ShellExecutor`] (tool-invocation transport), [`Channel`]
//! (chat bridges), and desktop notifications. Implementations here are thin
//! transports; none of them implement prompting, tool-call parsing, model
//! selection, or chat-bridge semantics — those are explicit non-goals of
//! the core this crate serves.

pub mod brain;
pub mod channel;
pub mod notify;
pub mod shell;

pub use brain::{Brain, BrainError, BrainOutput, ExecBrain, HttpBrain};
pub use channel::{Channel, ChannelContext};
pub use notify::{DesktopNotifyAdapter, NotifyAdapter, NotifyError};
pub use shell::{ShellError, ShellExecutor, ShellOutput, TokioShellExecutor};

#[cfg(any(test, feature = "test-support"))]
pub use brain::{BrainCall, FakeBrain};
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
#[cfg(any(test, feature = "test-support"))]
pub use shell::{FakeShellExecutor, ShellCall};
