//! services/functions/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::web::state::AppState;

/// The verified caller, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: Uuid,
    pub token: String,
}

/// Middleware that validates the bearer token and resolves the caller.
///
/// If valid, inserts an `AuthedUser` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Extract the bearer token
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_string();

    // 2. Resolve the token to an identity at the provider
    let identity = state
        .verifier
        .identity_for_token(&token)
        .await
        .map_err(|e| {
            warn!("Failed to verify access token: {:?}", e);
            StatusCode::UNAUTHORIZED
        })?;

    // 3. Insert the verified caller into request extensions
    req.extensions_mut().insert(AuthedUser {
        id: identity.id,
        token: token.to_string(),
    });

    // 4. Continue to the handler
    Ok(next.run(req).await)
}
