//! Connection liveness tracking.
//!
//! The liveness flag is advisory. It lets counter operations fail fast with
//! `StorageUnavailable` instead of waiting on a pool that cannot connect.

use crate::store::MetadataStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Liveness view of the counter store.
#[async_trait]
pub trait Liveness: Send + Sync {
    /// Cached result of the last probe. No I/O.
    fn is_live(&self) -> bool;

    /// Acquire a connection and ping the store, updating the cached flag.
    /// Never fails; problems are logged and reported as `false`.
    async fn probe(&self) -> bool;

    /// Clear the cached flag after a connection-class failure so the next
    /// caller re-probes before touching the store again.
    fn mark_unavailable(&self);
}

/// Tracks reachability of a [`MetadataStore`] with a cached flag.
pub struct ConnectionMonitor {
    store: Arc<dyn MetadataStore>,
    live: AtomicBool,
}

impl ConnectionMonitor {
    /// Create a monitor. The store counts as unreachable until the first probe.
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self {
            store,
            live: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Liveness for ConnectionMonitor {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    async fn probe(&self) -> bool {
        match self.store.health_check().await {
            Ok(()) => {
                if !self.live.swap(true, Ordering::AcqRel) {
                    tracing::info!("Counter store reachable");
                }
                true
            }
            Err(e) => {
                self.live.store(false, Ordering::Release);
                tracing::error!(error = %e, "Counter store connection check failed");
                false
            }
        }
    }

    fn mark_unavailable(&self) {
        if self.live.swap(false, Ordering::AcqRel) {
            tracing::warn!("Counter store marked unavailable; next call will re-probe");
        }
    }
}
