//! Authentication Middleware
//!
//! Bearer-token gate for the admin notification hooks.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::application::services::Role;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authenticated caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub subject: String,
    pub role: Role,
}

/// Extract the bearer token from the `Authorization` header.
fn bearer_token(request: &Request) -> Result<&str, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".into()))
}

/// Require a valid token with the admin role.
///
/// Missing or invalid tokens are rejected with 401, valid non-admin tokens
/// with 403.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = state
        .tokens
        .verify(bearer_token(&request)?)
        .map_err(|e| match e {
            AppError::Token(e)
                if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature) =>
            {
                AppError::Unauthorized("Token expired".into())
            }
            _ => AppError::Unauthorized("Invalid token".into()),
        })?;

    if !claims.is_admin() {
        return Err(AppError::Forbidden("Admin access required".into()));
    }

    request.extensions_mut().insert(AuthUser {
        subject: claims.sub,
        role: claims.role,
    });

    Ok(next.run(request).await)
}
