//! crates/herbwise_core/src/records.rs
//!
//! Per-user health records: medications, supplements, allergies, and dietary
//! preferences. Thin orchestration over the record store; every call scopes
//! itself to the signed-in user taken from the session tracker at call time.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::domain::{
    Allergy, AllergyDraft, DietaryPreference, Medication, MedicationDraft, Supplement,
    SupplementDraft,
};
use crate::outcome::{OpError, Outcome};
use crate::ports::RecordStore;
use crate::session::SessionTracker;

#[derive(Clone)]
pub struct RecordsService {
    store: Arc<dyn RecordStore>,
    tracker: SessionTracker,
}

impl RecordsService {
    pub fn new(store: Arc<dyn RecordStore>, tracker: SessionTracker) -> Self {
        Self { store, tracker }
    }

    fn scope(&self) -> Result<(String, Uuid), OpError> {
        match self.tracker.snapshot().session {
            Some(session) => Ok((session.access_token, session.identity.id)),
            None => Err(OpError::not_signed_in()),
        }
    }

    // --- Medications ---

    pub async fn medications(&self) -> Outcome<Vec<Medication>> {
        let (token, user_id) = match self.scope() {
            Ok(scope) => scope,
            Err(e) => return Outcome::Failure(e),
        };
        self.store.list_medications(&token, user_id).await.into()
    }

    /// Inserts a new medication, or updates `existing` in place.
    pub async fn save_medication(
        &self,
        draft: &MedicationDraft,
        existing: Option<Uuid>,
    ) -> Outcome<Medication> {
        let (token, user_id) = match self.scope() {
            Ok(scope) => scope,
            Err(e) => return Outcome::Failure(e),
        };
        let saved = match existing {
            Some(id) => self.store.update_medication(&token, user_id, id, draft).await,
            None => self.store.insert_medication(&token, user_id, draft).await,
        };
        if let Err(e) = &saved {
            warn!("Saving medication failed: {e}");
        }
        saved.into()
    }

    pub async fn delete_medication(&self, id: Uuid) -> Outcome<()> {
        let (token, user_id) = match self.scope() {
            Ok(scope) => scope,
            Err(e) => return Outcome::Failure(e),
        };
        self.store.delete_medication(&token, user_id, id).await.into()
    }

    // --- Supplements ---

    pub async fn supplements(&self) -> Outcome<Vec<Supplement>> {
        let (token, user_id) = match self.scope() {
            Ok(scope) => scope,
            Err(e) => return Outcome::Failure(e),
        };
        self.store.list_supplements(&token, user_id).await.into()
    }

    pub async fn save_supplement(
        &self,
        draft: &SupplementDraft,
        existing: Option<Uuid>,
    ) -> Outcome<Supplement> {
        let (token, user_id) = match self.scope() {
            Ok(scope) => scope,
            Err(e) => return Outcome::Failure(e),
        };
        let saved = match existing {
            Some(id) => self.store.update_supplement(&token, user_id, id, draft).await,
            None => self.store.insert_supplement(&token, user_id, draft).await,
        };
        if let Err(e) = &saved {
            warn!("Saving supplement failed: {e}");
        }
        saved.into()
    }

    pub async fn delete_supplement(&self, id: Uuid) -> Outcome<()> {
        let (token, user_id) = match self.scope() {
            Ok(scope) => scope,
            Err(e) => return Outcome::Failure(e),
        };
        self.store.delete_supplement(&token, user_id, id).await.into()
    }

    // --- Allergies ---

    pub async fn allergies(&self) -> Outcome<Vec<Allergy>> {
        let (token, user_id) = match self.scope() {
            Ok(scope) => scope,
            Err(e) => return Outcome::Failure(e),
        };
        self.store.list_allergies(&token, user_id).await.into()
    }

    pub async fn save_allergy(
        &self,
        draft: &AllergyDraft,
        existing: Option<Uuid>,
    ) -> Outcome<Allergy> {
        let (token, user_id) = match self.scope() {
            Ok(scope) => scope,
            Err(e) => return Outcome::Failure(e),
        };
        let saved = match existing {
            Some(id) => self.store.update_allergy(&token, user_id, id, draft).await,
            None => self.store.insert_allergy(&token, user_id, draft).await,
        };
        if let Err(e) = &saved {
            warn!("Saving allergy failed: {e}");
        }
        saved.into()
    }

    pub async fn delete_allergy(&self, id: Uuid) -> Outcome<()> {
        let (token, user_id) = match self.scope() {
            Ok(scope) => scope,
            Err(e) => return Outcome::Failure(e),
        };
        self.store.delete_allergy(&token, user_id, id).await.into()
    }

    // --- Dietary preferences ---

    pub async fn preferences(&self) -> Outcome<Vec<DietaryPreference>> {
        let (token, user_id) = match self.scope() {
            Ok(scope) => scope,
            Err(e) => return Outcome::Failure(e),
        };
        self.store.list_preferences(&token, user_id).await.into()
    }

    /// Flips one preference and returns the stored row.
    pub async fn toggle_preference(
        &self,
        preference: &DietaryPreference,
    ) -> Outcome<DietaryPreference> {
        let (token, user_id) = match self.scope() {
            Ok(scope) => scope,
            Err(e) => return Outcome::Failure(e),
        };
        self.store
            .set_preference_enabled(&token, user_id, preference.id, !preference.enabled)
            .await
            .into()
    }
}
