// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Channel` capability trait (§9 REDESIGN FLAGS): `{name, start(ctx)}`.
//! Chat-channel bridges are an explicit non-goal (§1) — this trait exists
//! only as the seam a future bridge implementation would plug into,
//! injected at Registry provisioning alongside [`crate::Brain`] and
//! [`crate::ShellExecutor`]. No concrete channel ships in this crate.

use async_trait::async_trait;
use oj_core::EventBus;

/// What a `Channel` needs to bridge the bus to an external transport.
/// Minimal by design: richer context (auth, routing) belongs to whatever
/// concrete bridge eventually implements this trait, outside this crate.
pub struct ChannelContext {
    pub bus: EventBus,
}

#[async_trait]
pub trait Channel: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn start(&self, ctx: ChannelContext);
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
