//! Core domain types for the student portal registration service.
//!
//! This crate defines the data model shared by the other crates:
//! - Service configuration
//! - Upstream identity and trust levels
//! - Seat counter snapshots

pub mod config;
pub mod counter;
pub mod error;
pub mod identity;

pub use counter::CounterSnapshot;
pub use error::{Error, Result};
pub use identity::{AliasAddresses, Identity, TrustLevel, alias_addresses, student_email};

/// Seat limit used when no `registration.default_limit` is configured.
pub const DEFAULT_REGISTRATION_LIMIT: i64 = 200;

/// Fixed key of the singleton counter record.
pub const COUNTER_RECORD_ID: i64 = 1;
