pub mod account;
pub mod middleware;
pub mod recipes;
pub mod rest;
pub mod state;

// Re-export the pieces the binaries and tests need to build the server.
pub use middleware::require_auth;
pub use rest::ApiDoc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use state::AppState;
use std::sync::Arc;

/// Builds the API router. Every route sits behind the auth middleware.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/account/delete", post(account::delete_account_handler))
        .route("/recipes/search", get(recipes::search_recipes_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ))
        .with_state(state)
}
