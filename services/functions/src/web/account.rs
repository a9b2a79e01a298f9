//! services/functions/src/web/account.rs
//!
//! The privileged account-deletion endpoint. This is the only place in the
//! system that touches identities with the service-role credential.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::AuthedUser;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct DeleteAccountRequest {
    pub user_id: Uuid,
}

/// Reports both halves of the deletion so the caller can distinguish a clean
/// removal from a partial one.
#[derive(Serialize, ToSchema)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub profile_removed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /account/delete - Permanently remove the caller's account
///
/// Deletes the profile row first, then the identity at the provider. A
/// profile failure is reported but never stops the identity deletion.
#[utoipa::path(
    post,
    path = "/account/delete",
    request_body = DeleteAccountRequest,
    responses(
        (status = 200, description = "Identity deleted; profile outcome reported alongside", body = DeleteAccountResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "The target account is not the caller's own", body = ErrorResponse),
        (status = 500, description = "Identity deletion failed", body = DeleteAccountResponse)
    ),
    params(
        ("authorization" = String, Header, description = "Bearer access token of the caller.")
    )
)]
pub async fn delete_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthedUser>,
    Json(req): Json<DeleteAccountRequest>,
) -> Response {
    // 1. Only the account owner may ask for its removal.
    if req.user_id != caller.id {
        warn!(
            "Refused deletion of {} requested by {}",
            req.user_id, caller.id
        );
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "You can only delete your own account".to_string(),
            }),
        )
            .into_response();
    }

    // 2. Remove the profile row with the service-role credential. Row-level
    //    security would block the user's own token once the identity is gone.
    let service_key = state.config.supabase_service_role_key.clone();
    let profile_removed = match state.profiles.delete(&service_key, req.user_id).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to delete profile for {}: {:?}", req.user_id, e);
            false
        }
    };

    // 3. Remove the identity at the provider.
    match state.admin.admin_delete_identity(req.user_id).await {
        Ok(()) => {
            let response = DeleteAccountResponse {
                success: true,
                profile_removed,
                error: None,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to delete identity {}: {:?}", req.user_id, e);
            let response = DeleteAccountResponse {
                success: false,
                profile_removed,
                error: Some(format!("Identity deletion failed: {e}")),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response()
        }
    }
}
