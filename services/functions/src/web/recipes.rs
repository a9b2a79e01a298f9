//! services/functions/src/web/recipes.rs
//!
//! The authenticated recipe-search proxy. Keeps the vendor API key on the
//! server while letting signed-in users search.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use herbwise_core::domain::{Recipe, RecipeQuery};
use herbwise_core::recipes::{DEFAULT_SEARCH_TERM, DEFAULT_SUGGESTION_COUNT};

use crate::web::middleware::AuthedUser;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// Query parameters accepted by the search proxy.
#[derive(Deserialize, IntoParams)]
pub struct SearchParams {
    /// Free-text search term.
    pub query: Option<String>,
    /// Comma-separated diets, e.g. `vegan,gluten free`.
    pub diet: Option<String>,
    /// Comma-separated intolerances, e.g. `peanut,shellfish`.
    pub intolerances: Option<String>,
    /// Maximum number of results.
    pub number: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct RecipeResult {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_in_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl From<Recipe> for RecipeResult {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            image: recipe.image,
            ready_in_minutes: recipe.ready_in_minutes,
            servings: recipe.servings,
            summary: recipe.summary,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SearchResponse {
    pub results: Vec<RecipeResult>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /recipes/search - Search recipes through the server-held vendor key
#[utoipa::path(
    get,
    path = "/recipes/search",
    params(
        SearchParams,
        ("authorization" = String, Header, description = "Bearer access token of the caller.")
    ),
    responses(
        (status = 200, description = "Search results", body = SearchResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 502, description = "The vendor recipe API failed")
    )
)]
pub async fn search_recipes_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthedUser>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let query = RecipeQuery {
        query: params
            .query
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SEARCH_TERM.to_string()),
        diet: params.diet.unwrap_or_default(),
        intolerances: params.intolerances.unwrap_or_default(),
        number: params.number.unwrap_or(DEFAULT_SUGGESTION_COUNT),
    };

    match state.recipes.search(&caller.token, &query).await {
        Ok(recipes) => {
            let response = SearchResponse {
                results: recipes.into_iter().map(RecipeResult::from).collect(),
            };
            Ok((StatusCode::OK, Json(response)))
        }
        Err(e) => {
            error!("Recipe search failed: {:?}", e);
            Err((StatusCode::BAD_GATEWAY, "Recipe search failed".to_string()))
        }
    }
}
