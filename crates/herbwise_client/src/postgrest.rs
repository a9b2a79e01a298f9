//! crates/herbwise_client/src/postgrest.rs
//!
//! Data adapter for a PostgREST-compatible record store. One struct serves the
//! profile table and all four health-record tables. Every query carries an
//! explicit user-id filter on top of whatever row-level security the server
//! enforces.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use herbwise_core::domain::{
    Allergy, AllergyDraft, DietaryPreference, Medication, MedicationDraft, Profile, ProfileDraft,
    Supplement, SupplementDraft,
};
use herbwise_core::ports::{PortError, PortResult, ProfileStore, RecordStore};

use crate::http::{decode, error_from, transport, trim_base};

//=========================================================================================
// Row formats
//=========================================================================================

#[derive(Debug, Deserialize)]
struct ProfileRow {
    user_id: Uuid,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    dietary_goals: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
    #[serde(default)]
    deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl ProfileRow {
    fn into_domain(self) -> Profile {
        Profile {
            user_id: self.user_id,
            display_name: self.display_name.unwrap_or_default(),
            dietary_goals: self.dietary_goals,
            avatar_url: self.avatar_url,
            deleted_at: self.deleted_at,
            updated_at: self.updated_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MedicationRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    #[serde(default)]
    dose: Option<String>,
    #[serde(default)]
    frequency: Option<String>,
    #[serde(default)]
    food_interactions: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl MedicationRow {
    fn into_domain(self) -> Medication {
        Medication {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            dose: self.dose.unwrap_or_default(),
            frequency: self.frequency.unwrap_or_default(),
            food_interactions: self.food_interactions.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupplementRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    #[serde(default)]
    dosage: Option<String>,
    #[serde(default)]
    frequency: Option<String>,
    #[serde(default)]
    benefits: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl SupplementRow {
    fn into_domain(self) -> Supplement {
        Supplement {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            dosage: self.dosage.unwrap_or_default(),
            frequency: self.frequency.unwrap_or_default(),
            benefits: self.benefits.unwrap_or_default(),
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AllergyRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl AllergyRow {
    fn into_domain(self) -> Allergy {
        Allergy {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            severity: self.severity.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PreferenceRow {
    id: Uuid,
    user_id: Uuid,
    preference: String,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl PreferenceRow {
    fn into_domain(self) -> DietaryPreference {
        DietaryPreference {
            id: self.id,
            user_id: self.user_id,
            preference: self.preference,
            enabled: self.enabled,
            updated_at: self.updated_at.unwrap_or_else(Utc::now),
        }
    }
}

//=========================================================================================
// Adapter
//=========================================================================================

pub struct PostgrestStore {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl PostgrestStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(base_url, api_key, reqwest::Client::new())
    }

    pub fn with_client(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self { base_url: trim_base(base_url), api_key: api_key.into(), http }
    }

    fn table_request(&self, method: Method, token: &str, table: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/rest/v1/{table}", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        token: &str,
        table: &str,
        filters: &[(&str, String)],
    ) -> PortResult<Vec<T>> {
        let response = self
            .table_request(Method::GET, token, table)
            .query(filters)
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        response.json().await.map_err(decode)
    }

    async fn insert<T, B>(&self, token: &str, table: &str, body: &B) -> PortResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self
            .table_request(Method::POST, token, table)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        let mut rows: Vec<T> = response.json().await.map_err(decode)?;
        if rows.is_empty() {
            return Err(PortError::Unexpected(format!("insert into {table} returned no row")));
        }
        Ok(rows.remove(0))
    }

    async fn update<T, B>(
        &self,
        token: &str,
        table: &str,
        filters: &[(&str, String)],
        body: &B,
    ) -> PortResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self
            .table_request(Method::PATCH, token, table)
            .header("Prefer", "return=representation")
            .query(filters)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        let mut rows: Vec<T> = response.json().await.map_err(decode)?;
        if rows.is_empty() {
            return Err(PortError::NotFound(format!("no matching row in {table}")));
        }
        Ok(rows.remove(0))
    }

    async fn remove(
        &self,
        token: &str,
        table: &str,
        filters: &[(&str, String)],
    ) -> PortResult<()> {
        let response = self
            .table_request(Method::DELETE, token, table)
            .query(filters)
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        Ok(())
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl ProfileStore for PostgrestStore {
    async fn fetch(&self, token: &str, user_id: Uuid) -> PortResult<Option<Profile>> {
        let rows: Vec<ProfileRow> = self
            .select(
                token,
                "profiles",
                &[("user_id", eq(user_id)), ("select", "*".to_string())],
            )
            .await?;
        Ok(rows.into_iter().next().map(ProfileRow::into_domain))
    }

    async fn upsert(
        &self,
        token: &str,
        user_id: Uuid,
        draft: &ProfileDraft,
    ) -> PortResult<Profile> {
        let body = serde_json::json!([{
            "user_id": user_id,
            "display_name": draft.display_name,
            "dietary_goals": draft.dietary_goals,
            "avatar_url": draft.avatar_url,
            "updated_at": Utc::now(),
        }]);
        let response = self
            .table_request(Method::POST, token, "profiles")
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        let mut rows: Vec<ProfileRow> = response.json().await.map_err(decode)?;
        if rows.is_empty() {
            return Err(PortError::Unexpected("profile upsert returned no row".to_string()));
        }
        Ok(rows.remove(0).into_domain())
    }

    async fn set_deleted(
        &self,
        token: &str,
        user_id: Uuid,
        deleted_at: Option<DateTime<Utc>>,
    ) -> PortResult<Profile> {
        let row: ProfileRow = self
            .update(
                token,
                "profiles",
                &[("user_id", eq(user_id))],
                &serde_json::json!({ "deleted_at": deleted_at, "updated_at": Utc::now() }),
            )
            .await?;
        Ok(row.into_domain())
    }

    async fn delete(&self, token: &str, user_id: Uuid) -> PortResult<()> {
        self.remove(token, "profiles", &[("user_id", eq(user_id))]).await
    }
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn list_medications(&self, token: &str, user_id: Uuid) -> PortResult<Vec<Medication>> {
        let rows: Vec<MedicationRow> = self
            .select(
                token,
                "medications",
                &[
                    ("user_id", eq(user_id)),
                    ("select", "*".to_string()),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(MedicationRow::into_domain).collect())
    }

    async fn insert_medication(
        &self,
        token: &str,
        user_id: Uuid,
        draft: &MedicationDraft,
    ) -> PortResult<Medication> {
        let body = serde_json::json!({
            "user_id": user_id,
            "name": draft.name,
            "dose": draft.dose,
            "frequency": draft.frequency,
            "food_interactions": draft.food_interactions,
            "notes": draft.notes,
        });
        let row: MedicationRow = self.insert(token, "medications", &body).await?;
        Ok(row.into_domain())
    }

    async fn update_medication(
        &self,
        token: &str,
        user_id: Uuid,
        id: Uuid,
        draft: &MedicationDraft,
    ) -> PortResult<Medication> {
        let body = serde_json::json!({
            "name": draft.name,
            "dose": draft.dose,
            "frequency": draft.frequency,
            "food_interactions": draft.food_interactions,
            "notes": draft.notes,
        });
        let row: MedicationRow = self
            .update(token, "medications", &[("id", eq(id)), ("user_id", eq(user_id))], &body)
            .await?;
        Ok(row.into_domain())
    }

    async fn delete_medication(&self, token: &str, user_id: Uuid, id: Uuid) -> PortResult<()> {
        self.remove(token, "medications", &[("id", eq(id)), ("user_id", eq(user_id))]).await
    }

    async fn list_supplements(&self, token: &str, user_id: Uuid) -> PortResult<Vec<Supplement>> {
        let rows: Vec<SupplementRow> = self
            .select(
                token,
                "supplements",
                &[
                    ("user_id", eq(user_id)),
                    ("select", "*".to_string()),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(SupplementRow::into_domain).collect())
    }

    async fn insert_supplement(
        &self,
        token: &str,
        user_id: Uuid,
        draft: &SupplementDraft,
    ) -> PortResult<Supplement> {
        let body = serde_json::json!({
            "user_id": user_id,
            "name": draft.name,
            "dosage": draft.dosage,
            "frequency": draft.frequency,
            "benefits": draft.benefits,
        });
        let row: SupplementRow = self.insert(token, "supplements", &body).await?;
        Ok(row.into_domain())
    }

    async fn update_supplement(
        &self,
        token: &str,
        user_id: Uuid,
        id: Uuid,
        draft: &SupplementDraft,
    ) -> PortResult<Supplement> {
        let body = serde_json::json!({
            "name": draft.name,
            "dosage": draft.dosage,
            "frequency": draft.frequency,
            "benefits": draft.benefits,
        });
        let row: SupplementRow = self
            .update(token, "supplements", &[("id", eq(id)), ("user_id", eq(user_id))], &body)
            .await?;
        Ok(row.into_domain())
    }

    async fn delete_supplement(&self, token: &str, user_id: Uuid, id: Uuid) -> PortResult<()> {
        self.remove(token, "supplements", &[("id", eq(id)), ("user_id", eq(user_id))]).await
    }

    async fn list_allergies(&self, token: &str, user_id: Uuid) -> PortResult<Vec<Allergy>> {
        let rows: Vec<AllergyRow> = self
            .select(
                token,
                "allergies",
                &[
                    ("user_id", eq(user_id)),
                    ("select", "*".to_string()),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(AllergyRow::into_domain).collect())
    }

    async fn insert_allergy(
        &self,
        token: &str,
        user_id: Uuid,
        draft: &AllergyDraft,
    ) -> PortResult<Allergy> {
        let body = serde_json::json!({
            "user_id": user_id,
            "name": draft.name,
            "severity": draft.severity,
            "notes": draft.notes,
        });
        let row: AllergyRow = self.insert(token, "allergies", &body).await?;
        Ok(row.into_domain())
    }

    async fn update_allergy(
        &self,
        token: &str,
        user_id: Uuid,
        id: Uuid,
        draft: &AllergyDraft,
    ) -> PortResult<Allergy> {
        let body = serde_json::json!({
            "name": draft.name,
            "severity": draft.severity,
            "notes": draft.notes,
        });
        let row: AllergyRow = self
            .update(token, "allergies", &[("id", eq(id)), ("user_id", eq(user_id))], &body)
            .await?;
        Ok(row.into_domain())
    }

    async fn delete_allergy(&self, token: &str, user_id: Uuid, id: Uuid) -> PortResult<()> {
        self.remove(token, "allergies", &[("id", eq(id)), ("user_id", eq(user_id))]).await
    }

    async fn list_preferences(
        &self,
        token: &str,
        user_id: Uuid,
    ) -> PortResult<Vec<DietaryPreference>> {
        let rows: Vec<PreferenceRow> = self
            .select(
                token,
                "dietary_preferences",
                &[
                    ("user_id", eq(user_id)),
                    ("select", "*".to_string()),
                    ("order", "preference.asc".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(PreferenceRow::into_domain).collect())
    }

    async fn set_preference_enabled(
        &self,
        token: &str,
        user_id: Uuid,
        id: Uuid,
        enabled: bool,
    ) -> PortResult<DietaryPreference> {
        let row: PreferenceRow = self
            .update(
                token,
                "dietary_preferences",
                &[("id", eq(id)), ("user_id", eq(user_id))],
                &serde_json::json!({ "enabled": enabled, "updated_at": Utc::now() }),
            )
            .await?;
        Ok(row.into_domain())
    }
}
