//! Administrative endpoints.

use crate::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use portal_core::counter::parse_limit;
use serde::{Deserialize, Serialize};

/// A limit sent either as a JSON number or as a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LimitValue {
    Number(i64),
    Text(String),
}

impl LimitValue {
    fn resolve(self) -> ApiResult<i64> {
        match self {
            Self::Number(n) => Ok(n),
            Self::Text(s) => Ok(parse_limit(&s)?),
        }
    }
}

/// Request to change the seat limit.
#[derive(Debug, Deserialize)]
pub struct UpdateLimitRequest {
    pub limit: LimitValue,
}

/// Response after changing the seat limit.
#[derive(Debug, Serialize)]
pub struct UpdateLimitResponse {
    pub message: &'static str,
    pub new_limit: i64,
}

/// POST /v1/admin/limit - Overwrite the seat limit.
///
/// Zero is a valid limit and closes registration. A limit below the current
/// count is accepted; existing registrants keep their seats.
pub async fn update_limit(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<UpdateLimitRequest>, JsonRejection>,
) -> ApiResult<Json<UpdateLimitResponse>> {
    let identity = caller.require(state.config.auth.admin_trust_level)?;
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let requested = request.limit.resolve()?;

    let new_limit = state.counter.update_limit(requested).await?;
    metrics::LIMIT_UPDATES.inc();
    metrics::SEAT_LIMIT.set(new_limit);
    tracing::info!(admin = %identity.username, new_limit, "Registration limit changed");

    Ok(Json(UpdateLimitResponse {
        message: "registration limit updated",
        new_limit,
    }))
}
