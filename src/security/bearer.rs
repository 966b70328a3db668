//! Bearer-token verification for protected routes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, Extensions},
    middleware::Next,
    response::Response,
};

use crate::http::error::ApiError;
use crate::security::token::TokenKeys;

/// Verified caller identity, attached to the request by [`require_bearer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

/// Look up the verified identity for the current request.
pub fn identity(extensions: &Extensions) -> Option<&Identity> {
    extensions.get::<Identity>()
}

/// Extract the credentials of a `Bearer` authorization value. The scheme is
/// matched case-insensitively.
fn bearer_credentials(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Reject requests without a valid `Authorization: Bearer <token>` header.
pub async fn require_bearer(
    State(keys): State<Arc<TokenKeys>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_string();

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_credentials)
        .ok_or_else(|| {
            tracing::debug!(path = %path, "Missing or malformed Authorization header");
            ApiError::Auth("missing bearer token".to_string())
        })?;

    let claims = keys.verify(token).map_err(|e| {
        tracing::warn!(path = %path, error = %e, "Token verification failed");
        ApiError::Auth("invalid or expired token".to_string())
    })?;

    request.extensions_mut().insert(Identity {
        user_id: claims.user_id,
    });

    Ok(next.run(request).await)
}
