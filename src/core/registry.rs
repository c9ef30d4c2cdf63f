// src/core/registry.rs

//! The correlation registry: tracks every outstanding request by its
//! correlation id so inbound responses can be routed back to it.

use crate::core::request::Request;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Correlation ids start at 1 and are never reused.
const FIRST_CORRELATION_ID: u64 = 1;

#[derive(Debug)]
struct RegistryEntry {
    request: Arc<Request>,
    registered_at: Instant,
}

/// Maps correlation ids to the requests that produced them.
///
/// The map is a `DashMap`, so the send path (any caller thread) and the receive
/// path (the transport's inbound task) can touch it concurrently.
#[derive(Debug)]
pub struct CorrelationRegistry {
    next_id: AtomicU64,
    pending: DashMap<u64, RegistryEntry>,
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(FIRST_CORRELATION_ID),
            pending: DashMap::new(),
        }
    }

    /// Returns a fresh correlation id. Concurrent callers never observe the same value.
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Stores `request` under its correlation id, replacing any previous entry.
    pub fn register(&self, request: Arc<Request>) {
        let id = request.id();
        let entry = RegistryEntry {
            request,
            registered_at: Instant::now(),
        };
        if self.pending.insert(id, entry).is_some() {
            debug!(id, "Replaced an existing registry entry");
        }
    }

    /// Looks up the request registered under `id` without removing it.
    pub fn lookup(&self, id: u64) -> Option<Arc<Request>> {
        self.pending.get(&id).map(|entry| Arc::clone(&entry.request))
    }

    /// Removes and returns the request registered under `id`.
    pub fn remove(&self, id: u64) -> Option<Arc<Request>> {
        self.pending.remove(&id).map(|(_, entry)| entry.request)
    }

    /// Evicts every entry that has been registered for longer than `ttl`.
    /// Returns the number of evicted entries.
    pub fn purge_expired(&self, ttl: Duration) -> usize {
        let mut evicted = 0;
        self.pending.retain(|_, entry| {
            let keep = entry.registered_at.elapsed() < ttl;
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
