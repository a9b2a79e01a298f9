//! services/functions/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use herbwise_core::ports::{IdentityProvider, ProfileStore, RecipeSource};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Resolves caller tokens to identities, constructed with the anon key.
    pub verifier: Arc<dyn IdentityProvider>,
    /// Provider constructed with the service-role key; only its admin
    /// operation is ever used here.
    pub admin: Arc<dyn IdentityProvider>,
    /// Profile table access with the service-role key.
    pub profiles: Arc<dyn ProfileStore>,
    pub recipes: Arc<dyn RecipeSource>,
}
