//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    /// SECURITY: When enabled, ensure this endpoint is network-restricted
    /// to authorized Prometheus scraper IPs only at the infrastructure level.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Counter store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (testing and single-node deployments).
    ///
    /// SQLite has no row locks; the store uses a single pooled connection so
    /// counter transactions are serialized by the pool instead.
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// How long a statement waits on a locked database before failing, in milliseconds.
        #[serde(default = "default_sqlite_busy_timeout_ms")]
        busy_timeout_ms: u64,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL (optional if using individual fields).
        /// Takes precedence over individual fields if both are provided.
        url: Option<String>,
        /// Database host (e.g., "localhost" or "db.example.com").
        host: Option<String>,
        /// Database port (default: 5432).
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        /// Database username.
        username: Option<String>,
        /// Database password.
        /// WARNING: Prefer PORTAL_METADATA__PASSWORD env var over storing in config.
        password: Option<String>,
        /// Database name.
        database: Option<String>,
        /// SSL mode for connections.
        ssl_mode: Option<PgSslMode>,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// How long a request waits for a pooled connection, in seconds.
        #[serde(default = "default_acquire_timeout_secs")]
        acquire_timeout_secs: u64,
        /// Statement timeout in milliseconds. PostgreSQL cancels statements
        /// that exceed it, which rolls the surrounding transaction back.
        #[serde(default = "default_statement_timeout_ms")]
        statement_timeout_ms: Option<u64>,
        /// Lock timeout in milliseconds for `SELECT ... FOR UPDATE` on the
        /// counter row. Must be set so an abandoned lock can never stall
        /// registrations indefinitely.
        #[serde(default = "default_lock_timeout_ms")]
        lock_timeout_ms: Option<u64>,
    },
}

fn default_sqlite_busy_timeout_ms() -> u64 {
    5000
}

fn default_max_connections() -> u32 {
    10
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_statement_timeout_ms() -> Option<u64> {
    Some(30_000)
}

fn default_lock_timeout_ms() -> Option<u64> {
    Some(5_000)
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/portal.db"),
            busy_timeout_ms: default_sqlite_busy_timeout_ms(),
        }
    }
}

impl MetadataConfig {
    /// Validate metadata configuration invariants.
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite {
                busy_timeout_ms, ..
            } => {
                if *busy_timeout_ms == 0 {
                    return Err(
                        "sqlite busy_timeout_ms cannot be 0; concurrent registrations would fail immediately"
                            .to_string(),
                    );
                }
                Ok(())
            }
            MetadataConfig::Postgres {
                url,
                host,
                database,
                max_connections,
                statement_timeout_ms,
                lock_timeout_ms,
                ..
            } => {
                if *max_connections == 0 {
                    return Err("postgres max_connections must be at least 1".to_string());
                }
                if statement_timeout_ms.is_none() && lock_timeout_ms.is_none() {
                    return Err(
                        "postgres config requires statement_timeout_ms or lock_timeout_ms; \
                         without one a stalled transaction can hold the counter lock forever"
                            .to_string(),
                    );
                }
                // Must have either url OR (host + database)
                match (url.as_ref(), host.as_ref(), database.as_ref()) {
                    (Some(_), _, _) => Ok(()),
                    (None, Some(_), Some(_)) => Ok(()),
                    (None, None, _) => Err(
                        "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                    ),
                    (None, Some(_), None) => Err(
                        "postgres config requires 'database' when using individual fields"
                            .to_string(),
                    ),
                }
            }
        }
    }
}

/// Registration quota configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Seat limit written into the counter record when it is first created.
    /// Ignored once the record exists; change the limit through the admin API.
    #[serde(default = "default_registration_limit")]
    pub default_limit: i64,
    /// Domain appended to usernames to form student mailbox addresses.
    #[serde(default = "default_email_domain")]
    pub email_domain: String,
    /// Prefix of the mailbox alias a student can attach to their account.
    #[serde(default = "default_alias_prefix")]
    pub alias_prefix: String,
}

fn default_registration_limit() -> i64 {
    crate::DEFAULT_REGISTRATION_LIMIT
}

fn default_email_domain() -> String {
    "students.example.edu".to_string()
}

fn default_alias_prefix() -> String {
    "kst_".to_string()
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_registration_limit(),
            email_domain: default_email_domain(),
            alias_prefix: default_alias_prefix(),
        }
    }
}

impl RegistrationConfig {
    /// Validate registration configuration.
    pub fn validate(&self) -> Result<(), String> {
        crate::counter::validate_limit(self.default_limit)
            .map_err(|e| format!("registration.default_limit: {e}"))?;
        let domain = self.email_domain.trim().trim_start_matches('@');
        if domain.is_empty() {
            return Err("registration.email_domain cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Trust-level thresholds applied to the upstream identity assertion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Minimum trust level to register or delete an account.
    #[serde(default = "default_member_trust_level")]
    pub member_trust_level: u32,
    /// Minimum trust level for administrative actions.
    #[serde(default = "default_admin_trust_level")]
    pub admin_trust_level: u32,
}

fn default_member_trust_level() -> u32 {
    3
}

fn default_admin_trust_level() -> u32 {
    5
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            member_trust_level: default_member_trust_level(),
            admin_trust_level: default_admin_trust_level(),
        }
    }
}

impl AuthConfig {
    /// Returns warnings for settings that are allowed but suspicious.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        if self.admin_trust_level < self.member_trust_level {
            return Err(format!(
                "auth.admin_trust_level ({}) must not be lower than auth.member_trust_level ({})",
                self.admin_trust_level, self.member_trust_level
            ));
        }

        let mut warnings = Vec::new();
        if self.member_trust_level == 0 {
            warnings.push(
                "auth.member_trust_level=0 lets any request without a trust level register"
                    .to_string(),
            );
        }
        Ok(warnings)
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Counter store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Registration quota configuration.
    #[serde(default)]
    pub registration: RegistrationConfig,
    /// Trust-level thresholds.
    #[serde(default)]
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses SQLite metadata and the default thresholds.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            metadata: MetadataConfig::default(),
            registration: RegistrationConfig {
                default_limit: 10,
                email_domain: "students.test.edu".to_string(),
                alias_prefix: default_alias_prefix(),
            },
            auth: AuthConfig::default(),
        }
    }

    /// Validate every section. Returns warnings for allowed but risky settings.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        self.metadata.validate()?;
        self.registration.validate()?;
        self.auth.validate()
    }
}
