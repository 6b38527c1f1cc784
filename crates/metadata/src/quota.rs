//! Quota counter service.
//!
//! The only reader and writer of the registration counter record. Every
//! call round-trips to the store; nothing about the count is cached here.
//! Concurrent admissions are serialized by the store's row lock, not by
//! anything in this process.

use crate::error::{CounterError, CounterResult, MetadataError, MetadataResult};
use crate::liveness::{ConnectionMonitor, Liveness};
use crate::repos::{CounterRepo, EnsureOutcome, IncrementOutcome};
use crate::store::MetadataStore;
use portal_core::CounterSnapshot;
use portal_core::counter::validate_limit;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Result of [`QuotaCounterService::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// The counter record was created with the default limit.
    Created,
    /// The record already existed and was left as is.
    AlreadyInitialized,
    /// Storage was unreachable or failed; initialization will be retried
    /// by the next call whose liveness probe succeeds.
    Deferred,
}

/// Transactional seat counter over a [`MetadataStore`].
pub struct QuotaCounterService {
    store: Arc<dyn MetadataStore>,
    liveness: Arc<dyn Liveness>,
    default_limit: i64,
    ready: AtomicBool,
}

impl QuotaCounterService {
    /// Create a service with an explicit liveness tracker.
    pub fn new(store: Arc<dyn MetadataStore>, liveness: Arc<dyn Liveness>, default_limit: i64) -> Self {
        Self {
            store,
            liveness,
            default_limit,
            ready: AtomicBool::new(false),
        }
    }

    /// Create a service that tracks liveness with a [`ConnectionMonitor`] on the same store.
    pub fn with_monitor(store: Arc<dyn MetadataStore>, default_limit: i64) -> Self {
        let monitor = Arc::new(ConnectionMonitor::new(store.clone()));
        Self::new(store, monitor, default_limit)
    }

    /// Whether the counter record has been ensured since startup.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Cached storage liveness.
    pub fn is_live(&self) -> bool {
        self.liveness.is_live()
    }

    /// Ping storage now and refresh the liveness flag.
    pub async fn probe(&self) -> bool {
        self.liveness.probe().await
    }

    /// Limit written into the record when it is first created.
    pub fn default_limit(&self) -> i64 {
        self.default_limit
    }

    /// Probe storage, ensure the schema and the singleton record.
    ///
    /// Safe to run on every start and from several instances at once.
    /// Storage failures never abort startup: they leave the service not
    /// ready and return [`InitOutcome::Deferred`].
    pub async fn initialize(&self) -> InitOutcome {
        if !self.liveness.probe().await {
            self.ready.store(false, Ordering::Release);
            tracing::warn!("Counter store unreachable; initialization deferred");
            return InitOutcome::Deferred;
        }

        match self.ensure_record().await {
            Ok(outcome) => {
                self.ready.store(true, Ordering::Release);
                match outcome {
                    EnsureOutcome::Created => {
                        tracing::info!(limit = self.default_limit, "Registration counter initialized");
                        InitOutcome::Created
                    }
                    EnsureOutcome::AlreadyExists => {
                        tracing::info!("Registration counter already present, skipping insert");
                        InitOutcome::AlreadyInitialized
                    }
                }
            }
            Err(e) => {
                self.ready.store(false, Ordering::Release);
                self.liveness.mark_unavailable();
                tracing::error!(error = %e, "Registration counter initialization failed");
                InitOutcome::Deferred
            }
        }
    }

    async fn ensure_record(&self) -> MetadataResult<EnsureOutcome> {
        self.store.migrate().await?;
        self.store.ensure_counter(self.default_limit).await
    }

    /// Fail fast when storage is known to be down, and finish a deferred
    /// initialization once it comes back.
    async fn ensure_available(&self) -> CounterResult<()> {
        if !self.liveness.is_live() && !self.liveness.probe().await {
            return Err(CounterError::StorageUnavailable);
        }
        if !self.is_ready() && self.initialize().await == InitOutcome::Deferred {
            return Err(CounterError::StorageUnavailable);
        }
        Ok(())
    }

    fn storage_failure(&self, operation: &'static str, err: MetadataError) -> CounterError {
        if err.is_connection_error() {
            self.liveness.mark_unavailable();
        }
        match err {
            MetadataError::NotFound(_) => {
                tracing::error!(operation, "Registration counter record missing");
                CounterError::RecordMissing
            }
            other => {
                tracing::error!(operation, error = %other, "Registration counter operation failed");
                CounterError::Storage(other)
            }
        }
    }

    /// Read the committed count and limit without locking.
    pub async fn read_count_and_limit(&self) -> CounterResult<CounterSnapshot> {
        self.ensure_available().await?;

        match self.store.get_counter().await {
            Ok(Some(row)) => Ok(row.snapshot()),
            Ok(None) => Err(self.storage_failure(
                "read",
                MetadataError::NotFound("registration counter record".to_string()),
            )),
            // Connection loss on a read reports as unavailable, not as a storage error.
            Err(e) if e.is_connection_error() => {
                self.liveness.mark_unavailable();
                tracing::warn!(error = %e, "Counter store became unreachable during read");
                Err(CounterError::StorageUnavailable)
            }
            Err(e) => Err(self.storage_failure("read", e)),
        }
    }

    /// Current number of admitted registrants.
    pub async fn read_count(&self) -> CounterResult<i64> {
        Ok(self.read_count_and_limit().await?.count)
    }

    /// Current seat limit.
    pub async fn read_limit(&self) -> CounterResult<i64> {
        Ok(self.read_count_and_limit().await?.limit)
    }

    /// Take one seat, or fail with [`CounterError::QuotaExceeded`] when full.
    pub async fn increment_count(&self) -> CounterResult<i64> {
        self.ensure_available().await?;

        let store = self.store.clone();
        match run_to_completion(async move { store.increment_count().await }).await {
            Ok(IncrementOutcome::Admitted { count }) => {
                tracing::info!(count, "Registration count incremented");
                Ok(count)
            }
            Ok(IncrementOutcome::Rejected { count, limit }) => {
                tracing::warn!(count, limit, "Registration rejected, quota full");
                Err(CounterError::QuotaExceeded { count, limit })
            }
            Err(e) => Err(self.storage_failure("increment", e)),
        }
    }

    /// Release one seat. The count never goes below zero.
    pub async fn decrement_count(&self) -> CounterResult<i64> {
        self.ensure_available().await?;

        let store = self.store.clone();
        match run_to_completion(async move { store.decrement_count().await }).await {
            Ok(count) => {
                tracing::info!(count, "Registration count decremented");
                Ok(count)
            }
            Err(e) => Err(self.storage_failure("decrement", e)),
        }
    }

    /// Overwrite the seat limit. A limit below the current count is accepted;
    /// the count is left alone and later increments are rejected.
    pub async fn update_limit(&self, new_limit: i64) -> CounterResult<i64> {
        let new_limit = validate_limit(new_limit)?;

        let store = self.store.clone();
        match run_to_completion(async move { store.set_limit(new_limit).await }).await {
            Ok(()) => {
                tracing::info!(limit = new_limit, "Registration limit updated");
                Ok(new_limit)
            }
            Err(e) => Err(self.storage_failure("update_limit", e)),
        }
    }
}

/// Run a store operation on its own task.
///
/// If the caller's future is dropped (client went away), the transaction
/// still commits or rolls back and the connection goes back to the pool.
async fn run_to_completion<T, F>(operation: F) -> MetadataResult<T>
where
    F: Future<Output = MetadataResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(operation)
        .await
        .map_err(|e| MetadataError::Internal(format!("counter task did not complete: {e}")))?
}
