//! Mailbox alias management.

use crate::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use portal_core::{AliasAddresses, alias_addresses};
use serde::Serialize;

/// Response after adding or removing an alias.
#[derive(Debug, Serialize)]
pub struct AliasResponse {
    pub message: String,
    pub primary: String,
    pub alias: String,
}

fn caller_addresses(state: &AppState, caller: &Caller) -> ApiResult<AliasAddresses> {
    let identity = caller.require(state.config.auth.member_trust_level)?;
    let registration = &state.config.registration;
    Ok(alias_addresses(
        &identity.username,
        &registration.email_domain,
        &registration.alias_prefix,
    )?)
}

/// POST /v1/aliases/add - Attach the caller's alias to their mailbox.
pub async fn add_alias(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<AliasResponse>> {
    let addrs = caller_addresses(&state, &caller)?;

    state
        .provisioner
        .add_alias(&addrs.primary, &addrs.alias)
        .await?;
    tracing::info!(primary = %addrs.primary, alias = %addrs.alias, "Alias added");

    Ok(Json(AliasResponse {
        message: format!("alias {} added", addrs.alias),
        primary: addrs.primary,
        alias: addrs.alias,
    }))
}

/// POST /v1/aliases/delete - Detach the caller's alias from their mailbox.
///
/// Refuses to touch the primary address, even when the configured alias
/// prefix makes the two coincide.
pub async fn delete_alias(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<AliasResponse>> {
    let addrs = caller_addresses(&state, &caller)?;

    if addrs.alias_is_primary() {
        tracing::warn!(primary = %addrs.primary, "Refused to delete primary address as an alias");
        return Err(ApiError::BadRequest(
            "the primary address cannot be deleted".to_string(),
        ));
    }

    state
        .provisioner
        .delete_alias(&addrs.primary, &addrs.alias)
        .await?;
    tracing::info!(primary = %addrs.primary, alias = %addrs.alias, "Alias deleted");

    Ok(Json(AliasResponse {
        message: format!("alias {} deleted", addrs.alias),
        primary: addrs.primary,
        alias: addrs.alias,
    }))
}
