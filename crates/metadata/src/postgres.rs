//! PostgreSQL-based metadata store implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::CounterRow;
use crate::repos::{CounterRepo, EnsureOutcome, IncrementOutcome};
use crate::store::MetadataStore;
use async_trait::async_trait;
use portal_core::COUNTER_RECORD_ID;
use portal_core::config::PgSslMode;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use std::time::Duration;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

fn missing() -> MetadataError {
    MetadataError::NotFound("registration counter record".to_string())
}

/// Pool sizing and timeout settings for [`PostgresStore`].
#[derive(Debug, Clone)]
pub struct PgPoolSettings {
    pub max_connections: u32,
    /// How long an operation waits for a pooled connection.
    pub acquire_timeout: Duration,
    /// Server-side `statement_timeout`, in milliseconds.
    pub statement_timeout_ms: Option<u64>,
    /// Server-side `lock_timeout`, in milliseconds. Bounds how long an
    /// increment waits on the counter row lock.
    pub lock_timeout_ms: Option<u64>,
}

impl Default for PgPoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            statement_timeout_ms: Some(30_000),
            lock_timeout_ms: Some(5_000),
        }
    }
}

/// PostgreSQL-based metadata store.
///
/// The pool connects lazily, so the store can be built while the database
/// is down. Schema creation happens in [`MetadataStore::migrate`], which the
/// counter service runs as part of its initialization.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub fn from_url(url: &str, settings: PgPoolSettings) -> MetadataResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        tracing::info!("Configuring PostgreSQL counter store from connection URL");
        Ok(Self::connect_lazy(opts, settings))
    }

    /// Create a new PostgreSQL store from individual connection parameters.
    ///
    /// This allows credentials to be passed separately, enabling better
    /// secret management (e.g., passwords via environment variables).
    pub fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        settings: PgPoolSettings,
    ) -> MetadataResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        if let Some(mode) = ssl_mode {
            let sqlx_mode = match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            };
            opts = opts.ssl_mode(sqlx_mode);
        }

        // Log connection info without password
        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Configuring PostgreSQL counter store with individual parameters"
        );

        Ok(Self::connect_lazy(opts, settings))
    }

    fn connect_lazy(mut opts: PgConnectOptions, settings: PgPoolSettings) -> Self {
        let mut session_options = Vec::new();
        if let Some(timeout_ms) = settings.statement_timeout_ms {
            session_options.push(("statement_timeout", format!("{timeout_ms}ms")));
        }
        if let Some(timeout_ms) = settings.lock_timeout_ms {
            session_options.push(("lock_timeout", format!("{timeout_ms}ms")));
        }
        if !session_options.is_empty() {
            tracing::info!(
                statement_timeout_ms = ?settings.statement_timeout_ms,
                lock_timeout_ms = ?settings.lock_timeout_ms,
                "PostgreSQL session timeouts configured"
            );
            opts = opts.options(session_options);
        }

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_lazy_with(opts);

        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        // PostgreSQL doesn't allow multiple statements in a single prepared statement,
        // so we split the schema and execute each statement separately.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            if let Err(e) = sqlx::query(statement).execute(&self.pool).await {
                // Two instances racing on CREATE TABLE IF NOT EXISTS can collide in
                // the catalog; the loser sees a unique violation for a table that exists.
                let err = MetadataError::from(e);
                if err.is_unique_violation() {
                    tracing::debug!("Counter schema created concurrently by another instance");
                    continue;
                }
                return Err(err);
            }
        }

        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CounterRepo for PostgresStore {
    async fn ensure_counter(&self, default_limit: i64) -> MetadataResult<EnsureOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO registration_counter (id, count, registration_limit, last_updated)
            VALUES ($1, 0, $2, now())
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(COUNTER_RECORD_ID)
        .bind(default_limit)
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
            "SELECT id, count, registration_limit, last_updated FROM registration_counter WHERE id = $1",
        )
        .bind(COUNTER_RECORD_ID)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn increment_count(&self) -> MetadataResult<IncrementOutcome> {
        let mut tx = self.pool.begin().await?;

        // The row lock is held until commit/rollback, so the read, the limit
        // check and the write below are atomic with respect to every other
        // increment and decrement.
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT count, registration_limit FROM registration_counter WHERE id = $1 FOR UPDATE",
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
            "UPDATE registration_counter SET count = $1, last_updated = now() WHERE id = $2 RETURNING count",
        )
        .bind(count + 1)
        .bind(COUNTER_RECORD_ID)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(IncrementOutcome::Admitted { count: new_count })
    }

    async fn decrement_count(&self) -> MetadataResult<i64> {
        let mut tx = self.pool.begin().await?;

        let count: Option<i64> = sqlx::query_scalar(
            "SELECT count FROM registration_counter WHERE id = $1 FOR UPDATE",
        )
        .bind(COUNTER_RECORD_ID)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(count) = count else {
            tx.rollback().await?;
            return Err(missing());
        };

        let new_count: i64 = sqlx::query_scalar(
            "UPDATE registration_counter SET count = $1, last_updated = now() WHERE id = $2 RETURNING count",
        )
        .bind((count - 1).max(0))
        .bind(COUNTER_RECORD_ID)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(new_count)
    }

    async fn set_limit(&self, limit: i64) -> MetadataResult<()> {
        let result = sqlx::query(
            "UPDATE registration_counter SET registration_limit = $1, last_updated = now() WHERE id = $2",
        )
        .bind(limit)
        .bind(COUNTER_RECORD_ID)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(missing());
        }
        Ok(())
    }
}
