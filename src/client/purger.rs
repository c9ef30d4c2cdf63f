// src/client/purger.rs

//! A background task that periodically evicts stale entries from the
//! correlation registry.

use crate::client::Client;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

pub struct RegistryPurgerTask {
    client: Arc<Client>,
}

impl RegistryPurgerTask {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// The main run loop for the purger task. Runs until `shutdown_rx` fires.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let Some(ttl) = self.client.registry_config().ttl() else {
            info!("Registry eviction disabled; purger task not started.");
            return;
        };
        let period = self.client.registry_config().purge_interval;
        info!("Registry purger task started (ttl {ttl:?}, every {period:?}).");

        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately; nothing can be stale yet.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.client.purge_expired_requests();
                }
                _ = shutdown_rx.recv() => {
                    info!("Registry purger task shutting down.");
                    return;
                }
            }
        }
    }
}
