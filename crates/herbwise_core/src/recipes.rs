//! crates/herbwise_core/src/recipes.rs
//!
//! Recipe suggestions tailored to the signed-in user: enabled dietary
//! preferences become the diet filter, allergies become intolerances.

use std::sync::Arc;

use crate::domain::{Allergy, DietaryPreference, Recipe, RecipeQuery};
use crate::outcome::{OpError, Outcome};
use crate::ports::RecipeSource;
use crate::session::SessionTracker;

/// How many suggestions a search asks for.
pub const DEFAULT_SUGGESTION_COUNT: u32 = 12;

/// Fallback search term when the user didn't type one.
pub const DEFAULT_SEARCH_TERM: &str = "healthy";

/// Folds the user's records into a recipe search. Only enabled preferences
/// count; allergy names are lowercased to match the upstream's intolerance
/// vocabulary. A blank search term falls back to a generic one.
pub fn build_query(
    preferences: &[DietaryPreference],
    allergies: &[Allergy],
    search: Option<&str>,
) -> RecipeQuery {
    let diet = preferences
        .iter()
        .filter(|p| p.enabled)
        .map(|p| p.preference.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let intolerances = allergies
        .iter()
        .map(|a| a.name.to_lowercase())
        .collect::<Vec<_>>()
        .join(",");
    let query = search
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .unwrap_or(DEFAULT_SEARCH_TERM)
        .to_string();

    RecipeQuery { query, diet, intolerances, number: DEFAULT_SUGGESTION_COUNT }
}

#[derive(Clone)]
pub struct RecipeService {
    source: Arc<dyn RecipeSource>,
    tracker: SessionTracker,
}

impl RecipeService {
    pub fn new(source: Arc<dyn RecipeSource>, tracker: SessionTracker) -> Self {
        Self { source, tracker }
    }

    pub async fn suggestions(
        &self,
        preferences: &[DietaryPreference],
        allergies: &[Allergy],
        search: Option<&str>,
    ) -> Outcome<Vec<Recipe>> {
        let Some(token) = self.tracker.access_token() else {
            return Outcome::Failure(OpError::not_signed_in());
        };
        let query = build_query(preferences, allergies, search);
        self.source.search(&token, &query).await.into()
    }
}
