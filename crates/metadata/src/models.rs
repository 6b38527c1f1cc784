//! Database models mapping to the counter schema.

use portal_core::CounterSnapshot;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Singleton registration counter record.
#[derive(Debug, Clone, FromRow)]
pub struct CounterRow {
    pub id: i64,
    pub count: i64,
    pub registration_limit: i64,
    /// Written by the store on every mutation. Informational only.
    pub last_updated: OffsetDateTime,
}

impl CounterRow {
    /// Count and limit as seen by callers.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot::new(self.count, self.registration_limit)
    }
}
