//! Seat counter snapshot and limit validation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Committed view of the singleton counter record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Currently admitted registrants.
    pub count: i64,
    /// Configured seat limit.
    pub limit: i64,
}

impl CounterSnapshot {
    /// Create a snapshot from raw record values.
    pub fn new(count: i64, limit: i64) -> Self {
        Self { count, limit }
    }

    /// Seats still available. Zero when the record is at or over its limit.
    pub fn remaining(&self) -> i64 {
        (self.limit - self.count).max(0)
    }

    /// Whether an increment would be rejected.
    ///
    /// A record can sit above its limit after an administrative decrease,
    /// which also counts as full.
    pub fn is_full(&self) -> bool {
        self.count >= self.limit
    }
}

/// Validate a seat limit supplied by a caller.
pub fn validate_limit(limit: i64) -> Result<i64> {
    if limit < 0 {
        return Err(Error::InvalidLimit(format!(
            "limit must be a non-negative integer, got {limit}"
        )));
    }
    Ok(limit)
}

/// Parse a seat limit from its textual form (form fields, env vars).
pub fn parse_limit(raw: &str) -> Result<i64> {
    let trimmed = raw.trim();
    let limit = trimmed
        .parse::<i64>()
        .map_err(|_| Error::InvalidLimit(format!("not an integer: {trimmed:?}")))?;
    validate_limit(limit)
}
