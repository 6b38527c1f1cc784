//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::CounterRepo;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: CounterRepo + Send + Sync {
    /// Create the counter schema if it does not exist.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Acquire a pooled connection and ping the database.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store and apply the schema.
    pub async fn new(path: impl AsRef<Path>, busy_timeout_ms: Option<u64>) -> MetadataResult<Self> {
        let path = path.as_ref();
        let busy_timeout = Duration::from_millis(busy_timeout_ms.unwrap_or(5000));

        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            // SQLite has no row locks. A single connection serializes every
            // counter transaction, which is what keeps read-check-write atomic.
            .max_connections(1)
            .acquire_timeout(busy_timeout)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::debug!(
            path = %path.display(),
            "SQLite counter store opened; counter updates are serialized on one connection"
        );

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

mod sqlite_impl {
    use super::*;
    use crate::models::CounterRow;
    use crate::repos::{EnsureOutcome, IncrementOutcome};
    use portal_core::COUNTER_RECORD_ID;
    use time::OffsetDateTime;

    fn missing() -> MetadataError {
        MetadataError::NotFound("registration counter record".to_string())
    }

    #[async_trait]
    impl CounterRepo for SqliteStore {
        async fn ensure_counter(&self, default_limit: i64) -> MetadataResult<EnsureOutcome> {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO registration_counter (id, count, registration_limit, last_updated) VALUES (?, 0, ?, ?)",
            )
            .bind(COUNTER_RECORD_ID)
            .bind(default_limit)
            .bind(OffsetDateTime::now_utc())
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) if done.rows_affected() == 1 => Ok(EnsureOutcome::Created),
                Ok(_) => Ok(EnsureOutcome::AlreadyExists),
                Err(e) => {
                    let err = MetadataError::from(e);
                    if err.is_unique_violation() {
                        Ok(EnsureOutcome::AlreadyExists)
                    } else {
                        Err(err)
                    }
                }
            }
        }

        async fn get_counter(&self) -> MetadataResult<Option<CounterRow>> {
            let row = sqlx::query_as::<_, CounterRow>(
                "SELECT id, count, registration_limit, last_updated FROM registration_counter WHERE id = ?",
            )
            .bind(COUNTER_RECORD_ID)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn increment_count(&self) -> MetadataResult<IncrementOutcome> {
            let mut tx = self.pool.begin().await?;

            let row: Option<(i64, i64)> = sqlx::query_as(
                "SELECT count, registration_limit FROM registration_counter WHERE id = ?",
            )
            .bind(COUNTER_RECORD_ID)
            .fetch_optional(&mut *tx)
            .await?;

            let Some((count, limit)) = row else {
                tx.rollback().await?;
                return Err(missing());
            };

            if count >= limit {
                tx.rollback().await?;
                return Ok(IncrementOutcome::Rejected { count, limit });
            }

            let new_count: i64 = sqlx::query_scalar(
                "UPDATE registration_counter SET count = ?, last_updated = ? WHERE id = ? RETURNING count",
            )
            .bind(count + 1)
            .bind(OffsetDateTime::now_utc())
            .bind(COUNTER_RECORD_ID)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(IncrementOutcome::Admitted { count: new_count })
        }

        async fn decrement_count(&self) -> MetadataResult<i64> {
            let mut tx = self.pool.begin().await?;

            let count: Option<i64> =
                sqlx::query_scalar("SELECT count FROM registration_counter WHERE id = ?")
                    .bind(COUNTER_RECORD_ID)
                    .fetch_optional(&mut *tx)
                    .await?;

            let Some(count) = count else {
                tx.rollback().await?;
                return Err(missing());
            };

            let new_count: i64 = sqlx::query_scalar(
                "UPDATE registration_counter SET count = ?, last_updated = ? WHERE id = ? RETURNING count",
            )
            .bind((count - 1).max(0))
            .bind(OffsetDateTime::now_utc())
            .bind(COUNTER_RECORD_ID)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(new_count)
        }

        async fn set_limit(&self, limit: i64) -> MetadataResult<()> {
            let result = sqlx::query(
                "UPDATE registration_counter SET registration_limit = ?, last_updated = ? WHERE id = ?",
            )
            .bind(limit)
            .bind(OffsetDateTime::now_utc())
            .bind(COUNTER_RECORD_ID)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(missing());
            }
            Ok(())
        }
    }
}

/// SQLite schema.
const SCHEMA_SQL: &str = r#"
-- Singleton registration counter. The CHECK keeps it a single row.
CREATE TABLE IF NOT EXISTS registration_counter (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    count INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0),
    registration_limit INTEGER NOT NULL CHECK (registration_limit >= 0),
    last_updated TEXT NOT NULL
);
"#;
