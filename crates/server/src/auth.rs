//! Upstream identity extraction and request tracing middleware.
//!
//! The OAuth gateway in front of the portal sets the `oauthUsername` and
//! `oauthTrustLevel` cookies. They are taken at face value here; trust-level
//! thresholds come from `AuthConfig`.

use crate::error::{ApiError, ApiResult};
use axum::extract::{FromRequestParts, Request};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;
use portal_core::{Identity, TrustLevel};
use std::convert::Infallible;
use tracing::Instrument;
use uuid::Uuid;

/// Cookie carrying the upstream username.
pub const USERNAME_COOKIE: &str = "oauthUsername";

/// Cookie carrying the upstream trust level.
pub const TRUST_LEVEL_COOKIE: &str = "oauthTrustLevel";

/// Maximum length for trace IDs.
/// Longer trace IDs are truncated to prevent log bloat and potential log injection.
const MAX_TRACE_ID_LEN: usize = 128;

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value.
    /// Truncated to MAX_TRACE_ID_LEN characters with non-printable characters removed.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    /// Get the trace ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extract trace ID from X-Trace-Id header or generate a new one.
fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// Assign a trace ID and run the request inside a span carrying it.
pub async fn trace_middleware(mut req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(&req);
    let trace_id_str = trace_id.0.clone();
    req.extensions_mut().insert(trace_id);

    next.run(req)
        .instrument(tracing::info_span!("request", trace_id = %trace_id_str))
        .await
}

/// Look up a cookie value across every `Cookie` header.
///
/// Values are percent-decoded, so `alice%40uni.edu` reads as `alice@uni.edu`.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|cookie| cookie.value().trim().trim_matches('"').to_string())
}

/// Caller as asserted by the upstream cookies. Never rejects; use
/// [`Caller::require`] to enforce a trust level.
#[derive(Clone, Debug, Default)]
pub struct Caller {
    pub username: Option<String>,
    pub trust_level: TrustLevel,
}

impl Caller {
    /// Read the caller from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let username = cookie_value(headers, USERNAME_COOKIE).filter(|v| !v.is_empty());
        let trust_level =
            TrustLevel::parse_lossy(cookie_value(headers, TRUST_LEVEL_COOKIE).as_deref());
        Self {
            username,
            trust_level,
        }
    }

    /// Require a username and at least `min_trust_level`.
    pub fn require(&self, min_trust_level: u32) -> ApiResult<Identity> {
        let Some(username) = self.username.as_deref() else {
            return Err(ApiError::Forbidden("missing identity".to_string()));
        };
        if !self.trust_level.meets(min_trust_level) {
            tracing::warn!(
                username,
                trust_level = %self.trust_level,
                required = min_trust_level,
                "Request rejected, trust level too low"
            );
            return Err(ApiError::Forbidden(format!(
                "trust level {} is below the required {}",
                self.trust_level, min_trust_level
            )));
        }
        Ok(Identity::new(username, self.trust_level)?)
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
