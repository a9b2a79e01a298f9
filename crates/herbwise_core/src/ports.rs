//! crates/herbwise_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete identity provider, record store, and recipe APIs.

use async_trait::async_trait;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use crate::domain::{
    Allergy, AllergyDraft, AuthSession, DietaryPreference, Identity, IdentityUpdate, Medication,
    MedicationDraft, Profile, ProfileDraft, PurgeReport, Recipe, RecipeQuery, SessionEvent,
    SignUpReceipt, Supplement, SupplementDraft,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., backend, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Rejected by the provider: {0}")]
    Rejected(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    // --- Registration and credential exchange ---
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<SignUpReceipt>;

    /// Exchanges credentials for a session without publishing it anywhere.
    /// Callers decide whether the session is adopted or thrown away.
    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession>;

    /// Makes `session` the provider's current session: persists it locally
    /// and announces it on the change feed.
    async fn adopt_session(&self, session: &AuthSession) -> PortResult<()>;

    /// Revokes the given token. When it belongs to the current session, the
    /// local session is cleared and a sign-out is announced even if the
    /// provider round trip fails.
    async fn sign_out(&self, access_token: &str) -> PortResult<()>;

    // --- Session state ---
    async fn current_session(&self) -> PortResult<Option<AuthSession>>;

    /// Subscribes to session changes. Events carry the full replacement state,
    /// so a dropped event is recovered by the next one.
    fn change_feed(&self) -> broadcast::Receiver<SessionEvent>;

    // --- Credential maintenance ---
    async fn send_password_reset(&self, email: &str, redirect_to: Option<&str>) -> PortResult<()>;

    async fn identity_for_token(&self, access_token: &str) -> PortResult<Identity>;

    async fn update_identity(
        &self,
        access_token: &str,
        update: &IdentityUpdate,
    ) -> PortResult<Identity>;

    // --- Privileged ---
    /// Permanently destroys the identity. Requires elevated credentials and is
    /// only ever called from the server side.
    async fn admin_delete_identity(&self, user_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch(&self, token: &str, user_id: Uuid) -> PortResult<Option<Profile>>;

    /// Creates or replaces the profile row for `user_id`. Must be idempotent
    /// so a retried registration cannot fail on a duplicate row.
    async fn upsert(&self, token: &str, user_id: Uuid, draft: &ProfileDraft) -> PortResult<Profile>;

    /// Sets or clears the soft-delete marker and returns the updated row.
    async fn set_deleted(
        &self,
        token: &str,
        user_id: Uuid,
        deleted_at: Option<DateTime<Utc>>,
    ) -> PortResult<Profile>;

    async fn delete(&self, token: &str, user_id: Uuid) -> PortResult<()>;
}

/// Server-side account destruction, reached through a privileged endpoint
/// because the elevated key must never live in the app itself.
#[async_trait]
pub trait AccountAdmin: Send + Sync {
    async fn purge(&self, access_token: &str, user_id: Uuid) -> PortResult<PurgeReport>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    // --- Medications ---
    async fn list_medications(&self, token: &str, user_id: Uuid) -> PortResult<Vec<Medication>>;

    async fn insert_medication(
        &self,
        token: &str,
        user_id: Uuid,
        draft: &MedicationDraft,
    ) -> PortResult<Medication>;

    async fn update_medication(
        &self,
        token: &str,
        user_id: Uuid,
        id: Uuid,
        draft: &MedicationDraft,
    ) -> PortResult<Medication>;

    async fn delete_medication(&self, token: &str, user_id: Uuid, id: Uuid) -> PortResult<()>;

    // --- Supplements ---
    async fn list_supplements(&self, token: &str, user_id: Uuid) -> PortResult<Vec<Supplement>>;

    async fn insert_supplement(
        &self,
        token: &str,
        user_id: Uuid,
        draft: &SupplementDraft,
    ) -> PortResult<Supplement>;

    async fn update_supplement(
        &self,
        token: &str,
        user_id: Uuid,
        id: Uuid,
        draft: &SupplementDraft,
    ) -> PortResult<Supplement>;

    async fn delete_supplement(&self, token: &str, user_id: Uuid, id: Uuid) -> PortResult<()>;

    // --- Allergies ---
    async fn list_allergies(&self, token: &str, user_id: Uuid) -> PortResult<Vec<Allergy>>;

    async fn insert_allergy(
        &self,
        token: &str,
        user_id: Uuid,
        draft: &AllergyDraft,
    ) -> PortResult<Allergy>;

    async fn update_allergy(
        &self,
        token: &str,
        user_id: Uuid,
        id: Uuid,
        draft: &AllergyDraft,
    ) -> PortResult<Allergy>;

    async fn delete_allergy(&self, token: &str, user_id: Uuid, id: Uuid) -> PortResult<()>;

    // --- Dietary preferences ---
    async fn list_preferences(&self, token: &str, user_id: Uuid)
        -> PortResult<Vec<DietaryPreference>>;

    async fn set_preference_enabled(
        &self,
        token: &str,
        user_id: Uuid,
        id: Uuid,
        enabled: bool,
    ) -> PortResult<DietaryPreference>;
}

#[async_trait]
pub trait RecipeSource: Send + Sync {
    /// Runs a recipe search shaped by the user's preferences and allergies.
    async fn search(&self, token: &str, query: &RecipeQuery) -> PortResult<Vec<Recipe>>;
}
