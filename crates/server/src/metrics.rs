//! Prometheus metrics for the registration portal.
//!
//! Exposes seat usage, admission outcomes and counter storage health.
//!
//! # Security Note
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping.
//! It exposes aggregate seat usage only (no usernames or email addresses),
//! but it should still be network-restricted to the scraper at the
//! infrastructure level.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use portal_core::CounterSnapshot;
use portal_metadata::CounterError;
use prometheus::{self, Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Admission metrics
pub static REGISTRATIONS_ADMITTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "portal_registrations_admitted_total",
        "Total number of registrations that took a seat",
    )
    .expect("metric creation failed")
});

pub static REGISTRATIONS_REJECTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "portal_registrations_rejected_total",
        "Total number of registrations rejected because the quota was full",
    )
    .expect("metric creation failed")
});

pub static REGISTRATIONS_EXISTING: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "portal_registrations_existing_total",
        "Total number of registration attempts for accounts that already existed",
    )
    .expect("metric creation failed")
});

pub static SEATS_RELEASED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "portal_seats_released_total",
        "Total number of seats released by account deletion",
    )
    .expect("metric creation failed")
});

pub static LIMIT_UPDATES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "portal_limit_updates_total",
        "Total number of administrative seat limit changes",
    )
    .expect("metric creation failed")
});

// Error metrics
pub static COUNTER_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "portal_counter_errors_total",
            "Total counter service failures by kind",
        ),
        &["kind"],
    )
    .expect("metric creation failed")
});

// Current state gauges
pub static SEATS_TAKEN: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "portal_seats_taken",
        "Registration count at the last observed read or mutation",
    )
    .expect("metric creation failed")
});

pub static SEAT_LIMIT: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "portal_seat_limit",
        "Registration limit at the last observed read or update",
    )
    .expect("metric creation failed")
});

pub static STORAGE_LIVE: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "portal_counter_storage_live",
        "1 if the counter store answered its last liveness probe, 0 otherwise",
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// This function is idempotent - subsequent calls after the first are no-ops.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(REGISTRATIONS_ADMITTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REGISTRATIONS_REJECTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REGISTRATIONS_EXISTING.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SEATS_RELEASED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(LIMIT_UPDATES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(COUNTER_ERRORS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SEATS_TAKEN.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SEAT_LIMIT.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(STORAGE_LIVE.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Update the seat gauges from a committed snapshot.
pub fn observe_snapshot(snapshot: &CounterSnapshot) {
    SEATS_TAKEN.set(snapshot.count);
    SEAT_LIMIT.set(snapshot.limit);
}

/// Record the liveness flag as a gauge.
pub fn observe_liveness(live: bool) {
    STORAGE_LIVE.set(i64::from(live));
}

/// Record a counter failure by kind.
pub fn record_counter_error(err: &CounterError) {
    let kind = match err {
        CounterError::StorageUnavailable => "unavailable",
        CounterError::RecordMissing => "record_missing",
        CounterError::QuotaExceeded { .. } => {
            REGISTRATIONS_REJECTED.inc();
            return;
        }
        CounterError::Storage(_) => "storage",
        CounterError::InvalidArgument(_) => "invalid_argument",
    };
    COUNTER_ERRORS.with_label_values(&[kind]).inc();
}
