//! Admin bearer-token authentication.
//!
//! Every route except `/health` takes an [`AdminAuth`] extractor, which checks
//! `Authorization: Bearer <token>` against `ADMIN_API_TOKEN`. With no token
//! configured all admin requests are rejected.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use cqc_common::error::AppError;

use crate::state::AppState;

/// Marker for a request that presented the admin token.
///
/// ```ignore
/// async fn handler(_auth: AdminAuth) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

/// Compare without short-circuiting on the first differing byte.
fn tokens_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Check an `Authorization` header value against the configured admin token.
pub fn authorize(header: Option<&str>, expected: Option<&str>) -> Result<AdminAuth, AppError> {
    let Some(expected) = expected else {
        return Err(AppError::Auth("Admin API is disabled: ADMIN_API_TOKEN is not set".to_string()));
    };

    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Auth("Missing or invalid Authorization header. Use 'Bearer <token>'".to_string())
        })?;

    if tokens_match(token.trim(), expected) {
        Ok(AdminAuth)
    } else {
        Err(AppError::Auth("Invalid admin token".to_string()))
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let result = authorize(header, state.config.admin_api_token.as_deref());

        if result.is_err() {
            tracing::debug!(path = %parts.uri.path(), "Rejected unauthenticated admin request");
        }

        async move { result }
    }
}
