//! crates/herbwise_client/src/functions.rs
//!
//! Client for the server-side functions service, which fronts the privileged
//! operations the app itself must never perform: permanent account deletion
//! and recipe searches with the server-held upstream API key.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use herbwise_core::domain::{PurgeReport, Recipe, RecipeQuery};
use herbwise_core::ports::{AccountAdmin, PortError, PortResult, RecipeSource};

use crate::http::{decode, error_from, transport, trim_base};

#[derive(Debug, Deserialize)]
struct DeleteAccountPayload {
    success: bool,
    #[serde(default)]
    profile_removed: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecipeRow {
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

impl RecipeRow {
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
    results: Vec<RecipeRow>,
}

pub struct FunctionsClient {
    base_url: String,
    http: reqwest::Client,
}

impl FunctionsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self { base_url: trim_base(base_url), http }
    }
}

#[async_trait]
impl AccountAdmin for FunctionsClient {
    async fn purge(&self, access_token: &str, user_id: Uuid) -> PortResult<PurgeReport> {
        let response = self
            .http
            .post(format!("{}/account/delete", self.base_url))
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "user_id": user_id }))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(error_from(response).await);
        }

        // Failed purges still answer with a report body, so parse it at any
        // status before falling back to a plain error.
        let body = response.text().await.map_err(transport)?;
        match serde_json::from_str::<DeleteAccountPayload>(&body) {
            Ok(payload) => Ok(PurgeReport {
                identity_removed: payload.success,
                profile_removed: payload.profile_removed,
                error: payload.error,
            }),
            Err(_) => Err(PortError::Unexpected(format!(
                "unrecognized delete response ({status}): {body}"
            ))),
        }
    }
}

#[async_trait]
impl RecipeSource for FunctionsClient {
    async fn search(&self, token: &str, query: &RecipeQuery) -> PortResult<Vec<Recipe>> {
        let mut params =
            vec![("query", query.query.clone()), ("number", query.number.to_string())];
        if !query.diet.is_empty() {
            params.push(("diet", query.diet.clone()));
        }
        if !query.intolerances.is_empty() {
            params.push(("intolerances", query.intolerances.clone()));
        }

        let response = self
            .http
            .get(format!("{}/recipes/search", self.base_url))
            .bearer_auth(token)
            .query(&params)
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        let payload: SearchPayload = response.json().await.map_err(decode)?;
        Ok(payload.results.into_iter().map(RecipeRow::into_domain).collect())
    }
}
