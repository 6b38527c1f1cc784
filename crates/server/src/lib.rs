//! HTTP API server for student portal registration.
//!
//! This crate provides the HTTP surface over the seat counter:
//! - Seat availability and student registration
//! - Account deletion (seat release)
//! - Administrative seat limit changes
//! - Health and Prometheus metrics

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod provisioning;
pub mod routes;
pub mod state;

pub use auth::{Caller, TraceId};
pub use error::ApiError;
pub use provisioning::{AccountProvisioner, LoggingProvisioner};
pub use routes::create_router;
pub use state::AppState;
