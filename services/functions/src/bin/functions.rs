//! services/functions/src/bin/functions.rs

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use functions_lib::{
    adapters::SpoonacularAdapter,
    config::Config,
    error::FunctionsError,
    web::{api_router, rest::ApiDoc, state::AppState},
};
use herbwise_client::{GoTrueProvider, PostgrestStore};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), FunctionsError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Upstream Adapters ---
    let verifier = Arc::new(GoTrueProvider::new(
        config.supabase_url.clone(),
        config.supabase_anon_key.clone(),
    ));
    let admin = Arc::new(GoTrueProvider::new(
        config.supabase_url.clone(),
        config.supabase_service_role_key.clone(),
    ));
    let profiles = Arc::new(PostgrestStore::new(
        config.supabase_url.clone(),
        config.supabase_service_role_key.clone(),
    ));
    let recipes = Arc::new(SpoonacularAdapter::new(
        config.spoonacular_base_url.clone(),
        config.spoonacular_api_key.clone(),
    ));

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        verifier,
        admin,
        profiles,
        recipes,
    });

    let allowed_origin = config
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| FunctionsError::Internal(format!("Invalid ALLOWED_ORIGIN: {e}")))?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    let app = Router::new()
        .merge(api_router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
