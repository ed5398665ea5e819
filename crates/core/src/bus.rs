// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process event bus (§4.1): typed pub/sub over [`Event`], non-blocking
//! publish, bounded per-subscriber buffers. Modeled on this codebase's
//! WAL-backed bus (wake channel + `try_send`) but fanned out to many
//! independent subscribers instead of one reader, since the Completion
//! Waiter and Cron Scheduler and CLI `watch` surface all need their own
//! view of the stream at once.

use crate::event::{Event, EventTopic};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

const SUBSCRIBER_BUFFER: usize = 256;

struct Subscriber {
    id: u64,
    topics: Option<HashSet<EventTopic>>,
    tx: mpsc::Sender<Event>,
}

/// Snapshot of bus health for the `doctor` CLI surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BusMetrics {
    pub subscriber_count: usize,
    pub published_total: u64,
    pub dropped_total: u64,
}

struct Inner {
    subscribers: Vec<Subscriber>,
    next_id: u64,
    published_total: u64,
    dropped_total: u64,
}

/// Shared handle to the bus. Cheap to clone; all clones see the same
/// subscriber set.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Inner>>,
    dropped_total: Arc<AtomicU64>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                subscribers: Vec::new(),
                next_id: 0,
                published_total: 0,
                dropped_total: 0,
            })),
            dropped_total: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish to every subscriber whose filter matches. Never blocks: a
    /// subscriber whose buffer is full has the event dropped and its drop
    /// counter incremented, rather than stalling the publisher. Callers
    /// that need delivery guarantees persist the event to the Store first
    /// and rely on the bus only for the live-update path.
    pub fn publish(&self, event: Event) {
        let mut inner = self.inner.lock();
        inner.published_total += 1;
        let topic = event.topic();
        for sub in &inner.subscribers {
            if sub.topics.as_ref().is_some_and(|t| !t.contains(&topic)) {
                continue;
            }
            if sub.tx.try_send(event.clone()).is_err() {
                inner.dropped_total += 1;
                self.dropped_total.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Subscribe to a set of topics, or to everything when `topics` is
    /// `None`. The returned [`Subscription`] must be held for as long as
    /// the caller wants to keep receiving; dropping it unsubscribes lazily
    /// (stale entries are pruned on next publish send failure).
    ///
    /// Subscribe *before* reading any state you're about to wait on a
    /// change to — otherwise an event published between your state read
    /// and the subscribe call is missed (the Completion Waiter's core
    /// invariant, §4.6).
    pub fn subscribe(&self, topics: Option<&[EventTopic]>) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push(Subscriber {
            id,
            topics: topics.map(|t| t.iter().copied().collect()),
            tx,
        });
        Subscription { id, rx, bus: self.clone() }
    }

    pub fn metrics(&self) -> BusMetrics {
        let inner = self.inner.lock();
        BusMetrics {
            subscriber_count: inner.subscribers.len(),
            published_total: inner.published_total,
            dropped_total: inner.dropped_total,
        }
    }

    fn unsubscribe(&self, id: u64) {
        let mut inner = self.inner.lock();
        inner.subscribers.retain(|s| s.id != id);
    }
}

/// A live subscription. Drop it to unsubscribe.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<Event>,
    bus: EventBus,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
