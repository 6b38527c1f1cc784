//! HTTP request handlers.

pub mod account;
pub mod admin;
pub mod aliases;
pub mod health;
pub mod registration;

pub use account::*;
pub use admin::*;
pub use aliases::*;
pub use health::*;
pub use registration::*;
