// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oj-storage: the single-writer embedded Persistence Store (§4.2) — an
//! append-only [`Wal`] of [`Record`]s plus the [`MaterializedState`] it
//! replays into, tied together by [`Store`], the only component allowed to
//! mutate state.

pub mod migration;
pub mod record;
pub mod state;
pub mod store;
mod wal;

pub use migration::{Migration, MigrationError, MigrationRegistry};
pub use record::Record;
pub use state::MaterializedState;
pub use store::Store;
pub use wal::{Wal, WalEntry, WalError};
