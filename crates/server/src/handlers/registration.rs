//! Seat availability and student registration.

use crate::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::provisioning::NewAccount;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Form, FromRequest, Request, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::response::{IntoResponse, Response};
use portal_core::student_email;
use portal_metadata::CounterError;
use serde::{Deserialize, Serialize};

/// Where successful and repeated registrations are sent.
pub const STUDENT_PORTAL_PATH: &str = "/student-portal";

/// Seat availability for rendering the registration page.
#[derive(Debug, Serialize)]
pub struct RegistrationStatusResponse {
    pub count: i64,
    pub limit: i64,
    pub remaining: i64,
    pub open: bool,
}

/// GET /v1/registration - Current seat usage.
pub async fn registration_status(
    State(state): State<AppState>,
) -> ApiResult<Json<RegistrationStatusResponse>> {
    let snapshot = state.counter.read_count_and_limit().await?;
    metrics::observe_snapshot(&snapshot);

    Ok(Json(RegistrationStatusResponse {
        count: snapshot.count,
        limit: snapshot.limit,
        remaining: snapshot.remaining(),
        open: !snapshot.is_full(),
    }))
}

/// Registration form fields. Accepts snake_case and the camelCase names
/// used by the HTML form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: Option<String>,
    #[serde(alias = "fullName")]
    pub full_name: Option<String>,
    pub semester: Option<String>,
    pub program: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "personalEmail")]
    pub personal_email: Option<String>,
}

impl RegisterRequest {
    /// Every field present and non-blank, or a 400.
    fn into_fields(self) -> ApiResult<RegisterFields> {
        fn required(value: Option<String>, name: &str) -> ApiResult<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ApiError::BadRequest(format!("missing required field: {name}")))
        }

        Ok(RegisterFields {
            username: required(self.username, "username")?,
            full_name: required(self.full_name, "full_name")?,
            semester: required(self.semester, "semester")?,
            program: required(self.program, "program")?,
            // Passwords are not trimmed.
            password: self
                .password
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ApiError::BadRequest("missing required field: password".to_string()))?,
            personal_email: required(self.personal_email, "personal_email")?,
        })
    }
}

struct RegisterFields {
    username: String,
    full_name: String,
    semester: String,
    program: String,
    password: String,
    personal_email: String,
}

/// Registration body, either JSON or a urlencoded form post.
pub struct RegisterBody(pub RegisterRequest);

impl<S> FromRequest<S> for RegisterBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        if is_json {
            let Json(body) = Json::<RegisterRequest>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(Self(body))
        } else {
            let Form(body) = Form::<RegisterRequest>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(Self(body))
        }
    }
}

fn redirect_to_portal() -> Response {
    (StatusCode::FOUND, [(LOCATION, STUDENT_PORTAL_PATH)]).into_response()
}

/// POST /v1/register - Provision a student account and take a seat.
///
/// The account is created before the seat is counted. The capacity
/// pre-check only avoids obviously doomed provisioning; the increment is
/// the authoritative admission decision.
pub async fn register(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<RegisterBody, ApiError>,
) -> ApiResult<Response> {
    let identity = caller.require(state.config.auth.member_trust_level)?;
    let RegisterBody(body) = body?;
    let fields = body.into_fields()?;

    if fields.username != identity.username {
        return Err(ApiError::Forbidden(
            "username does not match the signed-in user".to_string(),
        ));
    }

    let email = student_email(&fields.username, &state.config.registration.email_domain)?;

    if state.provisioner.find_account(&email).await?.is_some() {
        tracing::info!(email = %email, "Account already exists, redirecting to portal");
        metrics::REGISTRATIONS_EXISTING.inc();
        return Ok(redirect_to_portal());
    }

    let snapshot = state.counter.read_count_and_limit().await?;
    metrics::observe_snapshot(&snapshot);
    if snapshot.is_full() {
        metrics::REGISTRATIONS_REJECTED.inc();
        return Err(ApiError::QuotaExceeded {
            count: snapshot.count,
            limit: snapshot.limit,
        });
    }

    let account = NewAccount {
        email: email.clone(),
        full_name: fields.full_name,
        semester: fields.semester,
        program: fields.program,
        password: fields.password,
        personal_email: fields.personal_email,
    };
    state.provisioner.create_account(&account).await?;

    match state.counter.increment_count().await {
        Ok(count) => {
            metrics::REGISTRATIONS_ADMITTED.inc();
            metrics::SEATS_TAKEN.set(count);
            tracing::info!(email = %email, count, "Student registered");
            Ok(redirect_to_portal())
        }
        Err(CounterError::QuotaExceeded { count, limit }) => {
            // Lost the race for the last seat after provisioning.
            tracing::warn!(
                email = %email,
                count,
                limit,
                "Account provisioned but quota filled before the seat was counted"
            );
            Err(CounterError::QuotaExceeded { count, limit }.into())
        }
        Err(e) => Err(e.into()),
    }
}
