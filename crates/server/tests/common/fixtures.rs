//! Test fixtures for requests and counter state.

use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique usernames.
static USERNAME_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique username.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub fn unique_username(prefix: &str) -> String {
    let n = USERNAME_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}{n}")
}

/// Cookie header value asserting `username` at `trust_level`.
#[allow(dead_code)]
pub fn identity_cookie(username: &str, trust_level: u32) -> String {
    format!("oauthUsername={username}; oauthTrustLevel={trust_level}")
}

/// Cookie for an ordinary member (trust level 3).
#[allow(dead_code)]
pub fn member_cookie(username: &str) -> String {
    identity_cookie(username, 3)
}

/// Cookie for an administrator (trust level 5).
#[allow(dead_code)]
pub fn admin_cookie() -> String {
    identity_cookie("registrar", 5)
}

/// A complete registration body for `username`.
#[allow(dead_code)]
pub fn registration_body(username: &str) -> Value {
    json!({
        "username": username,
        "full_name": format!("Student {username}"),
        "semester": "Fall 2026",
        "program": "Master of Computer Science",
        "password": "correct-horse-42",
        "personal_email": format!("{username}@example.com"),
    })
}

/// Force the counter record to a given count and limit.
#[allow(dead_code)]
pub async fn set_counter_sqlite(pool: &sqlx::Pool<sqlx::Sqlite>, count: i64, limit: i64) {
    sqlx::query("UPDATE registration_counter SET count = ?, registration_limit = ? WHERE id = 1")
        .bind(count)
        .bind(limit)
        .execute(pool)
        .await
        .expect("Failed to set counter");
}

/// Force the counter record to a given count and limit.
#[allow(dead_code)]
pub async fn set_counter_postgres(pool: &sqlx::Pool<sqlx::Postgres>, count: i64, limit: i64) {
    sqlx::query("UPDATE registration_counter SET count = $1, registration_limit = $2 WHERE id = 1")
        .bind(count)
        .bind(limit)
        .execute(pool)
        .await
        .expect("Failed to set counter");
}
