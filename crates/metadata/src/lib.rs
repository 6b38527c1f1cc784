//! Counter store abstraction and implementations for the registration portal.
//!
//! This crate owns the persistent registration counter:
//! - The singleton counter record and its schema (SQLite and PostgreSQL)
//! - Transactional increment/decrement/limit updates
//! - Connection liveness tracking
//! - The quota counter service the HTTP layer talks to

pub mod error;
pub mod liveness;
pub mod models;
pub mod postgres;
pub mod quota;
pub mod repos;
pub mod store;

pub use error::{CounterError, CounterResult, MetadataError, MetadataResult};
pub use liveness::{ConnectionMonitor, Liveness};
pub use postgres::{PgPoolSettings, PostgresStore};
pub use quota::{InitOutcome, QuotaCounterService};
pub use store::{MetadataStore, SqliteStore};

use portal_core::config::MetadataConfig;
use std::sync::Arc;
use std::time::Duration;

/// Create a counter store from configuration.
///
/// SQLite stores are opened (and their schema applied) immediately.
/// PostgreSQL pools connect lazily, so an unreachable server does not fail
/// here; it shows up as a failed liveness probe instead.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite {
            path,
            busy_timeout_ms,
        } => {
            let store = SqliteStore::new(path, Some(*busy_timeout_ms)).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
        MetadataConfig::Postgres {
            url,
            host,
            port,
            username,
            password,
            database,
            ssl_mode,
            max_connections,
            acquire_timeout_secs,
            statement_timeout_ms,
            lock_timeout_ms,
        } => {
            let settings = PgPoolSettings {
                max_connections: *max_connections,
                acquire_timeout: Duration::from_secs(*acquire_timeout_secs),
                statement_timeout_ms: *statement_timeout_ms,
                lock_timeout_ms: *lock_timeout_ms,
            };
            let store = if let Some(url) = url {
                // URL takes precedence over individual fields
                PostgresStore::from_url(url, settings)?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                PostgresStore::from_params(
                    host,
                    port.unwrap_or(5432),
                    username.as_deref(),
                    password.as_deref(),
                    database,
                    *ssl_mode,
                    settings,
                )?
            } else {
                return Err(MetadataError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_sqlite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("portal.db");
        let config = MetadataConfig::Sqlite {
            path: db_path.clone(),
            busy_timeout_ms: 1000,
        };

        let store = from_config(&config).await.unwrap();
        store.health_check().await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_from_config_postgres_requires_target() {
        let config = MetadataConfig::Postgres {
            url: None,
            host: None,
            port: None,
            username: None,
            password: None,
            database: Some("portal".to_string()),
            ssl_mode: None,
            max_connections: 2,
            acquire_timeout_secs: 1,
            statement_timeout_ms: Some(1000),
            lock_timeout_ms: Some(1000),
        };

        assert!(matches!(
            from_config(&config).await,
            Err(MetadataError::Config(_))
        ));
    }
}
