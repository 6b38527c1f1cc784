//! Application state shared across handlers.

use crate::provisioning::AccountProvisioner;
use portal_core::config::AppConfig;
use portal_metadata::{MetadataStore, QuotaCounterService};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Seat counter over the configured store.
    pub counter: Arc<QuotaCounterService>,
    /// Directory account provisioning.
    pub provisioner: Arc<dyn AccountProvisioner>,
}

impl AppState {
    /// Create application state with a counter service tracking liveness
    /// on `metadata`. The counter still needs
    /// [`QuotaCounterService::initialize`] before it reports ready.
    pub fn new(
        config: AppConfig,
        metadata: Arc<dyn MetadataStore>,
        provisioner: Arc<dyn AccountProvisioner>,
    ) -> Self {
        let counter = Arc::new(QuotaCounterService::with_monitor(
            metadata,
            config.registration.default_limit,
        ));
        Self::with_counter(config, counter, provisioner)
    }

    /// Create application state around an existing counter service.
    pub fn with_counter(
        config: AppConfig,
        counter: Arc<QuotaCounterService>,
        provisioner: Arc<dyn AccountProvisioner>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            counter,
            provisioner,
        }
    }
}
