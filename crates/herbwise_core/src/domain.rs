//! crates/herbwise_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any backend provider or serialization format.

use uuid::Uuid;
use chrono::{DateTime, Utc};


// Represents an account at the identity provider - used throughout app
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub email: Option<String>,  // Optional because anonymous identities won't have it
    pub created_at: DateTime<Utc>,
}

/// An authenticated session issued by the identity provider.
/// The access token authorizes record-store calls on behalf of the identity.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity: Identity,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// What the identity provider hands back from a registration call.
/// Providers that require email confirmation return no session; the
/// identity only becomes usable after the user clicks the emailed link.
#[derive(Debug, Clone)]
pub struct SignUpReceipt {
    pub identity: Option<Identity>,
    pub session: Option<AuthSession>,
}

impl SignUpReceipt {
    pub fn confirmation_pending(&self) -> bool {
        self.session.is_none()
    }
}

// Only used for credential changes - carries sensitive data, never stored
#[derive(Debug, Clone, Default)]
pub struct IdentityUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl IdentityUpdate {
    pub fn email(address: impl Into<String>) -> Self {
        Self { email: Some(address.into()), password: None }
    }

    pub fn password(secret: impl Into<String>) -> Self {
        Self { email: None, password: Some(secret.into()) }
    }
}

/// Application-level account data, stored alongside the provider identity.
/// `deleted_at` doubles as the soft-delete marker: a set timestamp means the
/// account is deactivated but recoverable.
#[derive(Debug, Clone)]
pub struct Profile {
    pub user_id: Uuid,
    pub display_name: String,
    pub dietary_goals: Option<String>,
    pub avatar_url: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_soft_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// The writable half of a profile, keyed externally by user id.
#[derive(Debug, Clone)]
pub struct ProfileDraft {
    pub display_name: String,
    pub dietary_goals: Option<String>,
    pub avatar_url: Option<String>,
}

/// What a privileged purge reported back. Identity and profile are removed by
/// separate systems, so each half gets its own flag.
#[derive(Debug, Clone)]
pub struct PurgeReport {
    pub identity_removed: bool,
    pub profile_removed: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteOptions {
    pub soft_delete: bool,
}

impl DeleteOptions {
    pub fn soft() -> Self {
        Self { soft_delete: true }
    }

    pub fn hard() -> Self {
        Self { soft_delete: false }
    }
}

/// A session-change notification from the identity provider.
/// `seq` is the provider adapter's monotonic counter; consumers drop any
/// event whose seq is not newer than the last one they applied.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub seq: u64,
    pub kind: SessionEventKind,
}

#[derive(Debug, Clone)]
pub enum SessionEventKind {
    SignedIn(AuthSession),
    TokenRefreshed(AuthSession),
    SignedOut,
}

/// A medication the user takes, with free-text dosing details.
#[derive(Debug, Clone)]
pub struct Medication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub dose: String,
    pub frequency: String,
    pub food_interactions: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MedicationDraft {
    pub name: String,
    pub dose: String,
    pub frequency: String,
    pub food_interactions: String,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct Supplement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub benefits: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SupplementDraft {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub benefits: String,
}

#[derive(Debug, Clone)]
pub struct Allergy {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub severity: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AllergyDraft {
    pub name: String,
    pub severity: String,
    pub notes: String,
}

/// A named diet (vegan, gluten free, ...) the user can switch on or off.
/// Enabled preferences feed straight into recipe searches.
#[derive(Debug, Clone)]
pub struct DietaryPreference {
    pub id: Uuid,
    pub user_id: Uuid,
    pub preference: String,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}

/// A recipe suggestion as returned by the recipe search upstream.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub image: Option<String>,
    pub ready_in_minutes: Option<u32>,
    pub servings: Option<u32>,
    pub summary: Option<String>,
}

/// A recipe search, already folded down from the user's records.
#[derive(Debug, Clone)]
pub struct RecipeQuery {
    pub query: String,
    pub diet: String,
    pub intolerances: String,
    pub number: u32,
}
