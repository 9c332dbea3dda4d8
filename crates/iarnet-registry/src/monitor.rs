//! Liveness monitor — periodic sweep over the node map.
//!
//! A single long-lived task wakes on a ticker, asks the store for one
//! sweep, and stops on the shutdown signal. Two-phase aging keeps a
//! node's identity around briefly after a transient disconnect (so a
//! reconnecting heartbeat reattaches to the same object) while still
//! reclaiming identity from nodes that never come back.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::store::RegistryStore;

/// Default sweep interval.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);
/// Default silence window after which an online node is declared offline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Periodic sweeper turning stale online nodes offline and reclaiming
/// long-offline ones.
pub struct LivenessMonitor {
    store: Arc<RegistryStore>,
    sweep_interval: Duration,
    timeout: Duration,
    evict_after: Duration,
}

impl LivenessMonitor {
    /// Create a monitor with the default thresholds (30 s timeout,
    /// eviction at twice that, 10 s sweep interval).
    pub fn new(store: Arc<RegistryStore>) -> Self {
        Self::with_timeout(store, DEFAULT_TIMEOUT)
    }

    /// Create a monitor with an explicit timeout; the eviction threshold
    /// is always twice the timeout.
    pub fn with_timeout(store: Arc<RegistryStore>, timeout: Duration) -> Self {
        Self {
            store,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            timeout,
            evict_after: timeout * 2,
        }
    }

    /// Override the sweep interval (tests use a short one).
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn evict_after(&self) -> Duration {
        self.evict_after
    }

    /// Run the sweep loop until the shutdown signal fires. In-flight
    /// sweeps complete; their work is bounded by the store size.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval = ?self.sweep_interval,
            timeout = ?self.timeout,
            evict_after = ?self.evict_after,
            "liveness monitor started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {
                    let stats = self.store.sweep(Utc::now(), self.timeout, self.evict_after);
                    if stats.marked_offline > 0 || stats.evicted > 0 {
                        info!(
                            marked_offline = stats.marked_offline,
                            evicted = stats.evicted,
                            "liveness sweep reaped nodes"
                        );
                    } else {
                        debug!("liveness sweep found nothing stale");
                    }
                }
                _ = shutdown.changed() => {
                    info!("liveness monitor stopped");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Domain, Node, NodeStatus, ResourceTags};

    fn seeded_store() -> Arc<RegistryStore> {
        let store = Arc::new(RegistryStore::new());
        let now = Utc::now();
        store
            .add_domain(Domain {
                id: "domain.a".to_string(),
                name: "a".to_string(),
                description: String::new(),
                resource_tags: ResourceTags::default(),
                head_node_id: None,
                node_ids: Vec::new(),
                created_at: now,
                updated_at: now,
            })
            .unwrap();
        store
            .add_node(Node {
                id: "n1".to_string(),
                domain_id: "domain.a".to_string(),
                name: "n1".to_string(),
                address: String::new(),
                is_head: false,
                status: NodeStatus::Online,
                resource_tags: None,
                resource_capacity: None,
                created_at: now,
                updated_at: now,
                // Past the timeout but not the eviction threshold when
                // the monitor first looks.
                last_seen: now - chrono::Duration::seconds(40),
            })
            .unwrap();
        store
    }

    #[test]
    fn eviction_threshold_is_twice_timeout() {
        let monitor = LivenessMonitor::with_timeout(
            Arc::new(RegistryStore::new()),
            Duration::from_secs(45),
        );
        assert_eq!(monitor.timeout(), Duration::from_secs(45));
        assert_eq!(monitor.evict_after(), Duration::from_secs(90));
    }

    #[tokio::test]
    async fn run_sweeps_until_shutdown() {
        let store = seeded_store();
        let monitor = LivenessMonitor::new(store.clone())
            .with_sweep_interval(Duration::from_millis(10));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { monitor.run(shutdown_rx).await });

        // The stale online node is marked offline within a few ticks,
        // but stays in the map (eviction threshold not yet crossed).
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.get_node_status(&"n1".to_string()), NodeStatus::Offline);
        assert_eq!(store.node_count(), 1);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_terminates_promptly() {
        let monitor = LivenessMonitor::new(Arc::new(RegistryStore::new()))
            .with_sweep_interval(Duration::from_secs(3600));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { monitor.run(shutdown_rx).await });

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor did not stop on shutdown")
            .unwrap();
    }
}
