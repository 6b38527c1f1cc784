//! Upstream identity assertions.
//!
//! The OAuth layer in front of the portal authenticates users and attaches a
//! username and a trust level to every request. This module only models that
//! assertion; it does not verify it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Privilege level asserted by the upstream OAuth provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustLevel(pub u32);

impl TrustLevel {
    /// Parse a trust level from its cookie value.
    ///
    /// Missing or malformed values map to level 0 so they never clear a gate.
    pub fn parse_lossy(raw: Option<&str>) -> Self {
        raw.and_then(|v| v.trim().parse::<u32>().ok())
            .map(Self)
            .unwrap_or_default()
    }

    /// Whether this level meets `required`.
    pub fn meets(self, required: u32) -> bool {
        self.0 >= required
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated caller as asserted upstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub trust_level: TrustLevel,
}

impl Identity {
    /// Build an identity, rejecting blank usernames.
    pub fn new(username: impl Into<String>, trust_level: TrustLevel) -> Result<Self> {
        let username = username.into();
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::InvalidIdentity("username is empty".to_string()));
        }
        Ok(Self {
            username: username.to_string(),
            trust_level,
        })
    }
}

/// Build a student mailbox address.
///
/// Usernames that already contain `@` are used as-is. Otherwise the
/// configured domain is appended, with a leading `@` added when the
/// configuration omits it.
pub fn student_email(username: &str, domain: &str) -> Result<String> {
    let username = username.trim();
    if username.contains('@') {
        return Ok(username.to_string());
    }
    let bare = bare_domain(domain)?;
    Ok(format!("{username}@{bare}"))
}

fn bare_domain(domain: &str) -> Result<&str> {
    let domain = domain.trim();
    let bare = domain.strip_prefix('@').unwrap_or(domain);
    if bare.is_empty() || bare.contains('@') {
        return Err(Error::InvalidEmailDomain(domain.to_string()));
    }
    Ok(bare)
}

/// A student's primary mailbox and the alias attached to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasAddresses {
    pub primary: String,
    pub alias: String,
}

impl AliasAddresses {
    /// Whether the alias would name the primary mailbox itself.
    pub fn alias_is_primary(&self) -> bool {
        self.alias.eq_ignore_ascii_case(&self.primary)
    }
}

/// Build the primary and alias addresses for `username`.
///
/// Only the local part of the username is used, so `bob@other.edu` maps to
/// `bob@<domain>` and `<prefix>bob@<domain>`.
pub fn alias_addresses(username: &str, domain: &str, prefix: &str) -> Result<AliasAddresses> {
    let local = username.trim().split('@').next().unwrap_or_default();
    if local.is_empty() {
        return Err(Error::InvalidIdentity(format!(
            "username {username:?} has no local part"
        )));
    }
    let bare = bare_domain(domain)?;
    Ok(AliasAddresses {
        primary: format!("{local}@{bare}"),
        alias: format!("{}{local}@{bare}", prefix.trim()),
    })
}
