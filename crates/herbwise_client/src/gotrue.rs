//! crates/herbwise_client/src/gotrue.rs
//!
//! Identity provider adapter for a GoTrue-compatible auth API. Owns the
//! locally persisted session and the change feed: sessions only become
//! "current" through `adopt_session`, which is what lets the account service
//! inspect a fresh session before anything observable happens.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use herbwise_core::domain::{
    AuthSession, Identity, IdentityUpdate, SessionEvent, SessionEventKind, SignUpReceipt,
};
use herbwise_core::ports::{IdentityProvider, PortError, PortResult};

use crate::http::{decode, error_from, transport, trim_base};

//=========================================================================================
// Wire formats
//=========================================================================================

/// The user object as the auth API returns it.
#[derive(Debug, Deserialize)]
struct UserRecord {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    fn into_domain(self) -> Identity {
        Identity {
            id: self.id,
            email: self.email,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Response of the signup and token endpoints. Signup answers with a bare
/// user object (top-level `id`) when email confirmation is still pending,
/// and with a full session otherwise.
#[derive(Debug, Deserialize)]
struct SessionPayload {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<UserRecord>,
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl SessionPayload {
    fn into_session(self) -> Option<AuthSession> {
        match (self.access_token, self.user) {
            (Some(access_token), Some(user)) => {
                let expires_at = self
                    .expires_at
                    .and_then(|secs| DateTime::from_timestamp(secs, 0))
                    .unwrap_or_else(|| {
                        Utc::now() + ChronoDuration::seconds(self.expires_in.unwrap_or(3600))
                    });
                Some(AuthSession {
                    identity: user.into_domain(),
                    access_token,
                    refresh_token: self.refresh_token,
                    expires_at,
                })
            }
            _ => None,
        }
    }

    fn into_receipt(self) -> SignUpReceipt {
        if self.access_token.is_some() && self.user.is_some() {
            let session = self.into_session();
            let identity = session.as_ref().map(|s| s.identity.clone());
            SignUpReceipt { identity, session }
        } else {
            let identity = self.id.map(|id| Identity {
                id,
                email: self.email,
                created_at: self.created_at.unwrap_or_else(Utc::now),
            });
            SignUpReceipt { identity, session: None }
        }
    }
}

/// On-disk shape of a remembered session.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    user_id: Uuid,
    email: Option<String>,
    user_created_at: DateTime<Utc>,
    access_token: String,
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
}

impl PersistedSession {
    fn from_domain(session: &AuthSession) -> Self {
        Self {
            user_id: session.identity.id,
            email: session.identity.email.clone(),
            user_created_at: session.identity.created_at,
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.expires_at,
        }
    }

    fn into_domain(self) -> AuthSession {
        AuthSession {
            identity: Identity {
                id: self.user_id,
                email: self.email,
                created_at: self.user_created_at,
            },
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_at,
        }
    }
}

fn load_persisted(path: &Path) -> Option<AuthSession> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<PersistedSession>(&raw) {
        Ok(saved) => Some(saved.into_domain()),
        Err(e) => {
            warn!("Ignoring unreadable session file: {e}");
            None
        }
    }
}

//=========================================================================================
// Adapter
//=========================================================================================

pub struct GoTrueProvider {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
    state: Mutex<Option<AuthSession>>,
    persist_path: Option<PathBuf>,
    events: broadcast::Sender<SessionEvent>,
    seq: AtomicU64,
}

impl GoTrueProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(base_url, api_key, reqwest::Client::new())
    }

    pub fn with_client(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            base_url: trim_base(base_url),
            api_key: api_key.into(),
            http,
            state: Mutex::new(None),
            persist_path: None,
            events,
            seq: AtomicU64::new(0),
        }
    }

    /// Remembers the session in `path` across runs. An existing file is
    /// loaded immediately; `current_session` refreshes it if it has expired.
    pub fn with_persistence(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(saved) = load_persisted(&path) {
            *self.state.get_mut().unwrap() = Some(saved);
        }
        self.persist_path = Some(path);
        self
    }

    fn auth_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/auth/v1{path}", self.base_url))
            .header("apikey", &self.api_key)
    }

    fn emit(&self, kind: SessionEventKind) {
        let event = SessionEvent { seq: self.seq.fetch_add(1, Ordering::SeqCst) + 1, kind };
        if self.events.send(event).is_err() {
            debug!("No session listeners attached");
        }
    }

    fn persist_file(&self, session: &AuthSession) {
        let Some(path) = &self.persist_path else { return };
        match serde_json::to_string_pretty(&PersistedSession::from_domain(session)) {
            Ok(contents) => {
                if let Err(e) = std::fs::write(path, contents) {
                    warn!("Could not persist the session: {e}");
                }
            }
            Err(e) => warn!("Could not serialize the session: {e}"),
        }
    }

    fn remove_file(&self) {
        let Some(path) = &self.persist_path else { return };
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove the session file: {e}");
            }
        }
    }

    fn store_current(&self, session: &AuthSession) {
        *self.state.lock().unwrap() = Some(session.clone());
        self.persist_file(session);
    }

    /// Clears the current session if `access_token` belongs to it. Returns
    /// whether anything was cleared.
    fn drop_current(&self, access_token: &str) -> bool {
        let was_current = {
            let mut state = self.state.lock().unwrap();
            let matches = state.as_ref().is_some_and(|s| s.access_token == access_token);
            if matches {
                *state = None;
            }
            matches
        };
        if was_current {
            self.remove_file();
        }
        was_current
    }

    /// Trades a refresh token for a new session and announces the rotation.
    pub async fn refresh_session(&self, refresh_token: &str) -> PortResult<AuthSession> {
        let response = self
            .auth_request(Method::POST, "/token")
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        let payload: SessionPayload = response.json().await.map_err(decode)?;
        let session = payload.into_session().ok_or_else(|| {
            PortError::Unexpected("refresh response held no session".to_string())
        })?;
        self.store_current(&session);
        self.emit(SessionEventKind::TokenRefreshed(session.clone()));
        Ok(session)
    }
}

#[async_trait]
impl IdentityProvider for GoTrueProvider {
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<SignUpReceipt> {
        let response = self
            .auth_request(Method::POST, "/signup")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        let payload: SessionPayload = response.json().await.map_err(decode)?;
        Ok(payload.into_receipt())
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let response = self
            .auth_request(Method::POST, "/token")
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        let payload: SessionPayload = response.json().await.map_err(decode)?;
        payload
            .into_session()
            .ok_or_else(|| PortError::Unexpected("token response held no session".to_string()))
    }

    async fn adopt_session(&self, session: &AuthSession) -> PortResult<()> {
        self.store_current(session);
        self.emit(SessionEventKind::SignedIn(session.clone()));
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> PortResult<()> {
        let result =
            self.auth_request(Method::POST, "/logout").bearer_auth(access_token).send().await;

        // Whatever the server said, this token is no longer ours.
        if self.drop_current(access_token) {
            self.emit(SessionEventKind::SignedOut);
        }

        match result {
            Ok(response) if response.status().is_success() => Ok(()),
            // A token the server no longer recognizes is as signed out as it gets.
            Ok(response)
                if matches!(
                    response.status(),
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
                ) =>
            {
                Ok(())
            }
            Ok(response) => Err(error_from(response).await),
            Err(e) => Err(transport(e)),
        }
    }

    async fn current_session(&self) -> PortResult<Option<AuthSession>> {
        let stored = self.state.lock().unwrap().clone();
        let Some(session) = stored else { return Ok(None) };

        // Leave a margin so callers never receive a token about to lapse.
        if session.expires_at > Utc::now() + ChronoDuration::seconds(30) {
            return Ok(Some(session));
        }

        match session.refresh_token.as_deref() {
            Some(refresh) => match self.refresh_session(refresh).await {
                Ok(fresh) => Ok(Some(fresh)),
                Err(e) => {
                    warn!("Stored session could not be refreshed: {e}");
                    self.drop_current(&session.access_token);
                    Ok(None)
                }
            },
            None => {
                self.drop_current(&session.access_token);
                Ok(None)
            }
        }
    }

    fn change_feed(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn send_password_reset(&self, email: &str, redirect_to: Option<&str>) -> PortResult<()> {
        let mut request = self
            .auth_request(Method::POST, "/recover")
            .json(&serde_json::json!({ "email": email }));
        if let Some(redirect) = redirect_to {
            request = request.query(&[("redirect_to", redirect)]);
        }
        let response = request.send().await.map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        Ok(())
    }

    async fn identity_for_token(&self, access_token: &str) -> PortResult<Identity> {
        let response = self
            .auth_request(Method::GET, "/user")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        let record: UserRecord = response.json().await.map_err(decode)?;
        Ok(record.into_domain())
    }

    async fn update_identity(
        &self,
        access_token: &str,
        update: &IdentityUpdate,
    ) -> PortResult<Identity> {
        let mut body = serde_json::Map::new();
        if let Some(email) = &update.email {
            body.insert("email".to_string(), serde_json::Value::String(email.clone()));
        }
        if let Some(password) = &update.password {
            body.insert("password".to_string(), serde_json::Value::String(password.clone()));
        }

        let response = self
            .auth_request(Method::PUT, "/user")
            .bearer_auth(access_token)
            .json(&serde_json::Value::Object(body))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        let record: UserRecord = response.json().await.map_err(decode)?;
        let identity = record.into_domain();

        // Keep the current session's identity in step when it was the one
        // being updated.
        let refreshed = {
            let mut state = self.state.lock().unwrap();
            match state.as_mut() {
                Some(session) if session.access_token == access_token => {
                    session.identity = identity.clone();
                    Some(session.clone())
                }
                _ => None,
            }
        };
        if let Some(session) = refreshed {
            self.persist_file(&session);
            self.emit(SessionEventKind::TokenRefreshed(session));
        }

        Ok(identity)
    }

    /// Requires construction with the service-role key; the anonymous key is
    /// refused by the server.
    async fn admin_delete_identity(&self, user_id: Uuid) -> PortResult<()> {
        let response = self
            .auth_request(Method::DELETE, &format!("/admin/users/{user_id}"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        Ok(())
    }
}
