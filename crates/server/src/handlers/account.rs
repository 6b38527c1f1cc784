//! Account deletion.

use crate::auth::Caller;
use crate::error::ApiResult;
use crate::metrics;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use portal_core::student_email;
use serde::Serialize;

/// Response after deleting an account.
#[derive(Debug, Serialize)]
pub struct DeleteAccountResponse {
    pub message: &'static str,
    /// Registration count after the seat was released.
    pub count: i64,
}

/// POST /v1/account/delete - Delete the caller's account and release its seat.
pub async fn delete_account(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<DeleteAccountResponse>> {
    let identity = caller.require(state.config.auth.member_trust_level)?;
    let email = student_email(&identity.username, &state.config.registration.email_domain)?;

    state.provisioner.delete_account(&email).await?;

    let count = state.counter.decrement_count().await?;
    metrics::SEATS_RELEASED.inc();
    metrics::SEATS_TAKEN.set(count);
    tracing::info!(email = %email, count, "Student account deleted");

    Ok(Json(DeleteAccountResponse {
        message: "account deleted",
        count,
    }))
}
