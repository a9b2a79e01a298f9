//! services/functions/src/adapters/spoonacular.rs
//!
//! This module contains the adapter for the Spoonacular recipe API.
//! It implements the `RecipeSource` port from the `core` crate.

use async_trait::async_trait;
use serde::Deserialize;

use herbwise_core::domain::{Recipe, RecipeQuery};
use herbwise_core::ports::{PortError, PortResult, RecipeSource};

//=========================================================================================
// Wire-Format Structs
//=========================================================================================

/// A single result as Spoonacular returns it (camelCase fields).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpoonacularRecipe {
    id: i64,
    title: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    ready_in_minutes: Option<u32>,
    #[serde(default)]
    servings: Option<u32>,
    #[serde(default)]
    summary: Option<String>,
}

impl SpoonacularRecipe {
    fn into_domain(self) -> Recipe {
        Recipe {
            id: self.id,
            title: self.title,
            image: self.image,
            ready_in_minutes: self.ready_in_minutes,
            servings: self.servings,
            summary: self.summary,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    results: Vec<SpoonacularRecipe>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `RecipeSource` port using the Spoonacular
/// complex-search API.
#[derive(Clone)]
pub struct SpoonacularAdapter {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl SpoonacularAdapter {
    /// Creates a new `SpoonacularAdapter`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }
}

//=========================================================================================
// `RecipeSource` Trait Implementation
//=========================================================================================

#[async_trait]
impl RecipeSource for SpoonacularAdapter {
    /// Runs the search upstream. The caller's token plays no part here; the
    /// vendor authenticates with the server-held API key instead.
    async fn search(&self, _token: &str, query: &RecipeQuery) -> PortResult<Vec<Recipe>> {
        let mut params: Vec<(&str, String)> = vec![
            ("apiKey", self.api_key.clone()),
            ("query", query.query.clone()),
            ("number", query.number.to_string()),
            ("addRecipeInformation", "true".to_string()),
        ];
        if !query.diet.is_empty() {
            params.push(("diet", query.diet.clone()));
        }
        if !query.intolerances.is_empty() {
            params.push(("intolerances", query.intolerances.clone()));
        }

        let response = self
            .http
            .get(format!("{}/recipes/complexSearch", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "recipe search failed with status {status}: {body}"
            )));
        }

        let payload: SearchPayload = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("could not decode response: {e}")))?;

        Ok(payload
            .results
            .into_iter()
            .map(SpoonacularRecipe::into_domain)
            .collect())
    }
}
