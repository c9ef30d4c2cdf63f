// src/core/stats.rs

//! Counters describing what the client has sent and how inbound frames were routed.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ClientStats {
    /// Requests handed to the transport successfully.
    requests_sent: AtomicU64,
    /// Inbound text frames observed, whatever their fate.
    messages_received: AtomicU64,
    /// Frames dropped because they were not a `{...}` object or had no numeric id.
    messages_malformed: AtomicU64,
    /// Frames whose correlation id did not match a tracked request.
    messages_unmatched: AtomicU64,
    /// Frames routed to a tracked request.
    messages_routed: AtomicU64,
    /// Registry entries evicted by the purger.
    requests_expired: AtomicU64,
}

/// A point-in-time copy of [`ClientStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub requests_sent: u64,
    pub messages_received: u64,
    pub messages_malformed: u64,
    pub messages_unmatched: u64,
    pub messages_routed: u64,
    pub requests_expired: u64,
}

impl ClientStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_requests_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_messages_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_messages_malformed(&self) {
        self.messages_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_messages_unmatched(&self) {
        self.messages_unmatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_messages_routed(&self) {
        self.messages_routed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_requests_expired(&self, count: u64) {
        self.requests_expired.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_malformed: self.messages_malformed.load(Ordering::Relaxed),
            messages_unmatched: self.messages_unmatched.load(Ordering::Relaxed),
            messages_routed: self.messages_routed.load(Ordering::Relaxed),
            requests_expired: self.requests_expired.load(Ordering::Relaxed),
        }
    }
}
