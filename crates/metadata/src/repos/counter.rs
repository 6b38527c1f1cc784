//! Registration counter repository.

use crate::error::MetadataResult;
use crate::models::CounterRow;
use async_trait::async_trait;

/// Result of creating the singleton record at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The record was inserted by this call.
    Created,
    /// The record already existed and was left untouched.
    AlreadyExists,
}

/// Result of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// The seat was taken; `count` is the committed value.
    Admitted { count: i64 },
    /// The record was full. The transaction was rolled back.
    Rejected { count: i64, limit: i64 },
}

/// Repository for the singleton registration counter.
///
/// Each method is its own transaction boundary. A missing record is reported
/// as `MetadataError::NotFound` by the mutating methods.
#[async_trait]
pub trait CounterRepo: Send + Sync {
    /// Insert the record with `count = 0` and `default_limit` unless it exists.
    /// Safe to call concurrently from several starting instances.
    async fn ensure_counter(&self, default_limit: i64) -> MetadataResult<EnsureOutcome>;

    /// Non-locking read of the committed record.
    async fn get_counter(&self) -> MetadataResult<Option<CounterRow>>;

    /// Lock the record, take one seat if `count < limit`, commit.
    async fn increment_count(&self) -> MetadataResult<IncrementOutcome>;

    /// Lock the record, release one seat floored at zero, commit.
    /// Returns the new count.
    async fn decrement_count(&self) -> MetadataResult<i64>;

    /// Overwrite the seat limit without looking at the count.
    async fn set_limit(&self, limit: i64) -> MetadataResult<()>;
}
