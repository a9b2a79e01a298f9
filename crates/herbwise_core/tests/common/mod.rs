//! Shared in-memory fakes for the core service tests. Each fake counts its
//! calls so tests can assert that an operation made (or skipped) the provider
//! round trips it is supposed to.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use herbwise_core::domain::{
    Allergy, AllergyDraft, AuthSession, DietaryPreference, Identity, IdentityUpdate, Medication,
    MedicationDraft, Profile, ProfileDraft, PurgeReport, Recipe, RecipeQuery, SessionEvent,
    SessionEventKind, SignUpReceipt, Supplement, SupplementDraft,
};
use herbwise_core::ports::{
    AccountAdmin, IdentityProvider, PortError, PortResult, ProfileStore, RecipeSource, RecordStore,
};
use herbwise_core::session::{ListenerGuard, SessionSnapshot, SessionTracker};
use herbwise_core::{AccountService, RecipeService, RecordsService};

//=========================================================================================
// Identity provider fake
//=========================================================================================

#[derive(Clone)]
struct FakeAccount {
    id: Uuid,
    email: String,
    password: String,
    created_at: DateTime<Utc>,
}

pub struct FakeIdentityProvider {
    confirmation_required: bool,
    network_down: AtomicBool,
    accounts: Mutex<Vec<FakeAccount>>,
    live_tokens: Mutex<HashMap<String, Uuid>>,
    recovery_tokens: Mutex<HashMap<String, Uuid>>,
    current: Mutex<Option<AuthSession>>,
    events: broadcast::Sender<SessionEvent>,
    seq: AtomicU64,
    token_counter: AtomicU64,
    pub sign_up_calls: AtomicUsize,
    pub sign_in_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub adopt_calls: AtomicUsize,
    pub reset_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub current_session_calls: AtomicUsize,
}

impl FakeIdentityProvider {
    pub fn new() -> Arc<Self> {
        Self::with_confirmation(false)
    }

    pub fn with_confirmation(confirmation_required: bool) -> Arc<Self> {
        let (events, _) = broadcast::channel(32);
        Arc::new(Self {
            confirmation_required,
            network_down: AtomicBool::new(false),
            accounts: Mutex::new(Vec::new()),
            live_tokens: Mutex::new(HashMap::new()),
            recovery_tokens: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            events,
            seq: AtomicU64::new(0),
            token_counter: AtomicU64::new(0),
            sign_up_calls: AtomicUsize::new(0),
            sign_in_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            adopt_calls: AtomicUsize::new(0),
            reset_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            current_session_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_network_down(&self, down: bool) {
        self.network_down.store(down, Ordering::SeqCst);
    }

    fn check_network(&self) -> PortResult<()> {
        if self.network_down.load(Ordering::SeqCst) {
            return Err(PortError::Network("connection refused".to_string()));
        }
        Ok(())
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn emit(&self, kind: SessionEventKind) {
        let _ = self.events.send(SessionEvent { seq: self.next_seq(), kind });
    }

    fn mint_session(&self, account: &FakeAccount) -> AuthSession {
        let token = format!("tok-{}", self.token_counter.fetch_add(1, Ordering::SeqCst));
        self.live_tokens.lock().unwrap().insert(token.clone(), account.id);
        AuthSession {
            identity: Identity {
                id: account.id,
                email: Some(account.email.clone()),
                created_at: account.created_at,
            },
            access_token: token,
            refresh_token: Some(format!("refresh-{}", account.id)),
            expires_at: Utc::now() + ChronoDuration::hours(1),
        }
    }

    /// Registers an account directly, bypassing the service layer.
    pub fn seed_account(&self, email: &str, password: &str) -> Uuid {
        let account = FakeAccount {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password: password.to_string(),
            created_at: Utc::now(),
        };
        let id = account.id;
        self.accounts.lock().unwrap().push(account);
        id
    }

    /// Makes `email`'s session the persisted one, as if left over from an
    /// earlier run.
    pub fn persist_session_for(&self, email: &str) -> AuthSession {
        let account = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == email)
            .cloned()
            .expect("no such account");
        let session = self.mint_session(&account);
        *self.current.lock().unwrap() = Some(session.clone());
        session
    }

    pub fn issue_recovery_token(&self, email: &str) -> String {
        let id = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == email)
            .map(|a| a.id)
            .expect("no such account");
        let token = format!("recovery-{}", self.token_counter.fetch_add(1, Ordering::SeqCst));
        self.recovery_tokens.lock().unwrap().insert(token.clone(), id);
        token
    }

    pub fn has_account(&self, email: &str) -> bool {
        self.accounts.lock().unwrap().iter().any(|a| a.email == email)
    }

    pub fn email_of(&self, user_id: Uuid) -> Option<String> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == user_id)
            .map(|a| a.email.clone())
    }

    pub fn token_is_live(&self, access_token: &str) -> bool {
        self.live_tokens.lock().unwrap().contains_key(access_token)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<SignUpReceipt> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        self.check_network()?;
        if self.has_account(email) {
            return Err(PortError::Rejected("User already registered".to_string()));
        }
        let account = FakeAccount {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password: password.to_string(),
            created_at: Utc::now(),
        };
        self.accounts.lock().unwrap().push(account.clone());
        let identity = Identity {
            id: account.id,
            email: Some(account.email.clone()),
            created_at: account.created_at,
        };
        let session =
            if self.confirmation_required { None } else { Some(self.mint_session(&account)) };
        Ok(SignUpReceipt { identity: Some(identity), session })
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.check_network()?;
        let account = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == email && a.password == password)
            .cloned();
        match account {
            Some(account) => Ok(self.mint_session(&account)),
            None => Err(PortError::Rejected("Invalid login credentials".to_string())),
        }
    }

    async fn adopt_session(&self, session: &AuthSession) -> PortResult<()> {
        self.adopt_calls.fetch_add(1, Ordering::SeqCst);
        *self.current.lock().unwrap() = Some(session.clone());
        self.emit(SessionEventKind::SignedIn(session.clone()));
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> PortResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.live_tokens.lock().unwrap().remove(access_token);
        let was_current = {
            let mut current = self.current.lock().unwrap();
            let matches = current.as_ref().is_some_and(|s| s.access_token == access_token);
            if matches {
                *current = None;
            }
            matches
        };
        if was_current {
            self.emit(SessionEventKind::SignedOut);
        }
        Ok(())
    }

    async fn current_session(&self) -> PortResult<Option<AuthSession>> {
        self.current_session_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.current.lock().unwrap().clone())
    }

    fn change_feed(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn send_password_reset(&self, email: &str, _redirect_to: Option<&str>) -> PortResult<()> {
        self.reset_calls.fetch_add(1, Ordering::SeqCst);
        self.check_network()?;
        if !self.has_account(email) {
            return Err(PortError::Rejected("User not found".to_string()));
        }
        Ok(())
    }

    async fn identity_for_token(&self, access_token: &str) -> PortResult<Identity> {
        let user_id = self
            .live_tokens
            .lock()
            .unwrap()
            .get(access_token)
            .copied()
            .ok_or(PortError::Unauthorized)?;
        let accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter()
            .find(|a| a.id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("identity {user_id}")))?;
        Ok(Identity {
            id: account.id,
            email: Some(account.email.clone()),
            created_at: account.created_at,
        })
    }

    async fn update_identity(
        &self,
        access_token: &str,
        update: &IdentityUpdate,
    ) -> PortResult<Identity> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_network()?;
        let user_id = self
            .live_tokens
            .lock()
            .unwrap()
            .get(access_token)
            .copied()
            .or_else(|| self.recovery_tokens.lock().unwrap().get(access_token).copied())
            .ok_or_else(|| {
                PortError::Rejected("Invalid token: token is expired or invalid".to_string())
            })?;
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter_mut()
            .find(|a| a.id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("identity {user_id}")))?;
        if let Some(password) = &update.password {
            account.password = password.clone();
        }
        if let Some(email) = &update.email {
            account.email = email.clone();
        }
        Ok(Identity {
            id: account.id,
            email: Some(account.email.clone()),
            created_at: account.created_at,
        })
    }

    async fn admin_delete_identity(&self, user_id: Uuid) -> PortResult<()> {
        let mut accounts = self.accounts.lock().unwrap();
        let before = accounts.len();
        accounts.retain(|a| a.id != user_id);
        if accounts.len() == before {
            return Err(PortError::NotFound(format!("identity {user_id}")));
        }
        self.live_tokens.lock().unwrap().retain(|_, id| *id != user_id);
        Ok(())
    }
}

//=========================================================================================
// Profile store fake
//=========================================================================================

pub struct FakeProfileStore {
    rows: Mutex<HashMap<Uuid, Profile>>,
    fail_upserts: AtomicBool,
    pub fetch_calls: AtomicUsize,
    pub upsert_calls: AtomicUsize,
}

impl FakeProfileStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(HashMap::new()),
            fail_upserts: AtomicBool::new(false),
            fetch_calls: AtomicUsize::new(0),
            upsert_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub fn row(&self, user_id: Uuid) -> Option<Profile> {
        self.rows.lock().unwrap().get(&user_id).cloned()
    }

    pub fn is_soft_deleted(&self, user_id: Uuid) -> bool {
        self.row(user_id).map(|p| p.is_soft_deleted()).unwrap_or(false)
    }
}

#[async_trait]
impl ProfileStore for FakeProfileStore {
    async fn fetch(&self, _token: &str, user_id: Uuid) -> PortResult<Option<Profile>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().unwrap().get(&user_id).cloned())
    }

    async fn upsert(
        &self,
        _token: &str,
        user_id: Uuid,
        draft: &ProfileDraft,
    ) -> PortResult<Profile> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("profile write refused".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        let deleted_at = rows.get(&user_id).and_then(|p| p.deleted_at);
        let profile = Profile {
            user_id,
            display_name: draft.display_name.clone(),
            dietary_goals: draft.dietary_goals.clone(),
            avatar_url: draft.avatar_url.clone(),
            deleted_at,
            updated_at: Utc::now(),
        };
        rows.insert(user_id, profile.clone());
        Ok(profile)
    }

    async fn set_deleted(
        &self,
        _token: &str,
        user_id: Uuid,
        deleted_at: Option<DateTime<Utc>>,
    ) -> PortResult<Profile> {
        let mut rows = self.rows.lock().unwrap();
        let profile = rows
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("profile {user_id}")))?;
        profile.deleted_at = deleted_at;
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn delete(&self, _token: &str, user_id: Uuid) -> PortResult<()> {
        self.rows.lock().unwrap().remove(&user_id);
        Ok(())
    }
}

//=========================================================================================
// Admin (purge) fake
//=========================================================================================

#[derive(Debug, Clone, Copy)]
pub enum PurgeMode {
    Full,
    ProfileRemovalFails,
    IdentityRemovalFails,
}

pub struct FakeAdmin {
    provider: Arc<FakeIdentityProvider>,
    profiles: Arc<FakeProfileStore>,
    mode: Mutex<PurgeMode>,
    pub purge_calls: AtomicUsize,
}

impl FakeAdmin {
    pub fn new(provider: Arc<FakeIdentityProvider>, profiles: Arc<FakeProfileStore>) -> Arc<Self> {
        Arc::new(Self {
            provider,
            profiles,
            mode: Mutex::new(PurgeMode::Full),
            purge_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_mode(&self, mode: PurgeMode) {
        *self.mode.lock().unwrap() = mode;
    }
}

#[async_trait]
impl AccountAdmin for FakeAdmin {
    async fn purge(&self, access_token: &str, user_id: Uuid) -> PortResult<PurgeReport> {
        self.purge_calls.fetch_add(1, Ordering::SeqCst);
        let mode = *self.mode.lock().unwrap();

        let profile_removed = match mode {
            PurgeMode::ProfileRemovalFails => false,
            _ => {
                self.profiles.delete(access_token, user_id).await?;
                true
            }
        };
        let identity_removed = match mode {
            PurgeMode::IdentityRemovalFails => false,
            _ => {
                self.provider.admin_delete_identity(user_id).await?;
                true
            }
        };
        let error = match mode {
            PurgeMode::Full => None,
            PurgeMode::ProfileRemovalFails => {
                Some("profile row could not be removed".to_string())
            }
            PurgeMode::IdentityRemovalFails => Some("identity deletion rejected".to_string()),
        };
        Ok(PurgeReport { identity_removed, profile_removed, error })
    }
}

//=========================================================================================
// Record store and recipe fakes
//=========================================================================================

pub struct FakeRecordStore {
    medications: Mutex<Vec<Medication>>,
    supplements: Mutex<Vec<Supplement>>,
    allergies: Mutex<Vec<Allergy>>,
    preferences: Mutex<Vec<DietaryPreference>>,
    pub calls: AtomicUsize,
}

impl FakeRecordStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            medications: Mutex::new(Vec::new()),
            supplements: Mutex::new(Vec::new()),
            allergies: Mutex::new(Vec::new()),
            preferences: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn seed_preference(&self, user_id: Uuid, preference: &str, enabled: bool) -> Uuid {
        let row = DietaryPreference {
            id: Uuid::new_v4(),
            user_id,
            preference: preference.to_string(),
            enabled,
            updated_at: Utc::now() - ChronoDuration::days(1),
        };
        let id = row.id;
        self.preferences.lock().unwrap().push(row);
        id
    }
}

#[async_trait]
impl RecordStore for FakeRecordStore {
    async fn list_medications(&self, _token: &str, user_id: Uuid) -> PortResult<Vec<Medication>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .medications
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_medication(
        &self,
        _token: &str,
        user_id: Uuid,
        draft: &MedicationDraft,
    ) -> PortResult<Medication> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let row = Medication {
            id: Uuid::new_v4(),
            user_id,
            name: draft.name.clone(),
            dose: draft.dose.clone(),
            frequency: draft.frequency.clone(),
            food_interactions: draft.food_interactions.clone(),
            notes: draft.notes.clone(),
            created_at: Utc::now(),
        };
        self.medications.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn update_medication(
        &self,
        _token: &str,
        user_id: Uuid,
        id: Uuid,
        draft: &MedicationDraft,
    ) -> PortResult<Medication> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.medications.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|m| m.id == id && m.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("medication {id}")))?;
        row.name = draft.name.clone();
        row.dose = draft.dose.clone();
        row.frequency = draft.frequency.clone();
        row.food_interactions = draft.food_interactions.clone();
        row.notes = draft.notes.clone();
        Ok(row.clone())
    }

    async fn delete_medication(&self, _token: &str, user_id: Uuid, id: Uuid) -> PortResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.medications.lock().unwrap().retain(|m| !(m.id == id && m.user_id == user_id));
        Ok(())
    }

    async fn list_supplements(&self, _token: &str, user_id: Uuid) -> PortResult<Vec<Supplement>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .supplements
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_supplement(
        &self,
        _token: &str,
        user_id: Uuid,
        draft: &SupplementDraft,
    ) -> PortResult<Supplement> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let row = Supplement {
            id: Uuid::new_v4(),
            user_id,
            name: draft.name.clone(),
            dosage: draft.dosage.clone(),
            frequency: draft.frequency.clone(),
            benefits: draft.benefits.clone(),
            created_at: Utc::now(),
        };
        self.supplements.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn update_supplement(
        &self,
        _token: &str,
        user_id: Uuid,
        id: Uuid,
        draft: &SupplementDraft,
    ) -> PortResult<Supplement> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.supplements.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|s| s.id == id && s.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("supplement {id}")))?;
        row.name = draft.name.clone();
        row.dosage = draft.dosage.clone();
        row.frequency = draft.frequency.clone();
        row.benefits = draft.benefits.clone();
        Ok(row.clone())
    }

    async fn delete_supplement(&self, _token: &str, user_id: Uuid, id: Uuid) -> PortResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.supplements.lock().unwrap().retain(|s| !(s.id == id && s.user_id == user_id));
        Ok(())
    }

    async fn list_allergies(&self, _token: &str, user_id: Uuid) -> PortResult<Vec<Allergy>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .allergies
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_allergy(
        &self,
        _token: &str,
        user_id: Uuid,
        draft: &AllergyDraft,
    ) -> PortResult<Allergy> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let row = Allergy {
            id: Uuid::new_v4(),
            user_id,
            name: draft.name.clone(),
            severity: draft.severity.clone(),
            notes: draft.notes.clone(),
            created_at: Utc::now(),
        };
        self.allergies.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn update_allergy(
        &self,
        _token: &str,
        user_id: Uuid,
        id: Uuid,
        draft: &AllergyDraft,
    ) -> PortResult<Allergy> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.allergies.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|a| a.id == id && a.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("allergy {id}")))?;
        row.name = draft.name.clone();
        row.severity = draft.severity.clone();
        row.notes = draft.notes.clone();
        Ok(row.clone())
    }

    async fn delete_allergy(&self, _token: &str, user_id: Uuid, id: Uuid) -> PortResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.allergies.lock().unwrap().retain(|a| !(a.id == id && a.user_id == user_id));
        Ok(())
    }

    async fn list_preferences(
        &self,
        _token: &str,
        user_id: Uuid,
    ) -> PortResult<Vec<DietaryPreference>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .preferences
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn set_preference_enabled(
        &self,
        _token: &str,
        user_id: Uuid,
        id: Uuid,
        enabled: bool,
    ) -> PortResult<DietaryPreference> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.preferences.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|p| p.id == id && p.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("preference {id}")))?;
        row.enabled = enabled;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }
}

pub struct FakeRecipeSource {
    pub last_token: Mutex<Option<String>>,
    pub last_query: Mutex<Option<RecipeQuery>>,
    pub search_calls: AtomicUsize,
}

impl FakeRecipeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            last_token: Mutex::new(None),
            last_query: Mutex::new(None),
            search_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl RecipeSource for FakeRecipeSource {
    async fn search(&self, token: &str, query: &RecipeQuery) -> PortResult<Vec<Recipe>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = Some(token.to_string());
        *self.last_query.lock().unwrap() = Some(query.clone());
        Ok(vec![Recipe {
            id: 101,
            title: "Herbed Lentil Bowl".to_string(),
            image: Some("https://img.example/101.jpg".to_string()),
            ready_in_minutes: Some(35),
            servings: Some(4),
            summary: Some("A hearty bowl.".to_string()),
        }])
    }
}

//=========================================================================================
// Harness
//=========================================================================================

pub struct Harness {
    pub provider: Arc<FakeIdentityProvider>,
    pub profiles: Arc<FakeProfileStore>,
    pub admin: Arc<FakeAdmin>,
    pub store: Arc<FakeRecordStore>,
    pub recipe_source: Arc<FakeRecipeSource>,
    pub tracker: SessionTracker,
    pub account: AccountService,
    pub records: RecordsService,
    pub recipes: RecipeService,
    listener: Option<ListenerGuard>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::build(false).await
    }

    pub async fn with_confirmation() -> Self {
        Self::build(true).await
    }

    async fn build(confirmation_required: bool) -> Self {
        let provider = FakeIdentityProvider::with_confirmation(confirmation_required);
        let profiles = FakeProfileStore::new();
        let admin = FakeAdmin::new(provider.clone(), profiles.clone());
        let store = FakeRecordStore::new();
        let recipe_source = FakeRecipeSource::new();

        let tracker = SessionTracker::new();
        tracker.initialize(provider.as_ref()).await;
        let listener = tracker.attach(provider.change_feed());

        let account = AccountService::new(
            provider.clone(),
            profiles.clone(),
            admin.clone(),
            tracker.clone(),
        );
        let records = RecordsService::new(store.clone(), tracker.clone());
        let recipes = RecipeService::new(recipe_source.clone(), tracker.clone());

        Self {
            provider,
            profiles,
            admin,
            store,
            recipe_source,
            tracker,
            account,
            records,
            recipes,
            listener: Some(listener),
        }
    }

    pub fn detach_listener(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.detach();
        }
    }
}

/// Blocks until the tracker state satisfies `cond`, or panics after 2s.
pub async fn wait_until(tracker: &SessionTracker, cond: impl Fn(&SessionSnapshot) -> bool) {
    let mut rx = tracker.watch();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if cond(&snapshot) {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    })
    .await
    .expect("session state never reached the expected shape");
}

/// Registers through the service and waits for the tracker to pick the
/// session up.
pub async fn sign_up_and_wait(h: &Harness, email: &str, password: &str) -> Identity {
    let outcome = h.account.sign_up(email, password, None).await;
    let identity = outcome.value().expect("sign-up should succeed");
    wait_until(&h.tracker, |s| s.is_signed_in()).await;
    identity
}
