//! Repository traits for metadata operations.

pub mod counter;

pub use counter::{CounterRepo, EnsureOutcome, IncrementOutcome};
