//! crates/herbwise_core/src/account.rs
//!
//! Account lifecycle operations: registration, sign-in/out, password reset,
//! soft and hard deletion, restore, and profile maintenance. Every operation
//! returns an `Outcome` and reads the session state it needs at call time.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::domain::{DeleteOptions, Identity, IdentityUpdate, Profile, ProfileDraft};
use crate::outcome::{ErrorKind, OpError, Outcome};
use crate::ports::{AccountAdmin, IdentityProvider, PortError, ProfileStore};
use crate::session::SessionTracker;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Shown when registration succeeded but the provider wants the email
/// confirmed before the first sign-in.
pub const CONFIRMATION_PENDING_MESSAGE: &str =
    "Signup successful! Please check your email to confirm your account before logging in.";

/// Shown when sign-in is refused because the account is soft-deleted.
pub const ACCOUNT_DELETED_MESSAGE: &str = "This account has been deleted.";

//=========================================================================================
// Local validation
//=========================================================================================

fn validate_email(email: &str) -> Result<(), String> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Enter a valid email address.".to_string());
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err("Enter a valid email address.".to_string());
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("Password must be at least {MIN_PASSWORD_LEN} characters."));
    }
    Ok(())
}

/// Pulls the recovery token out of a reset link. Accepts a bare token, a
/// `?access_token=...` query parameter, or the `#access_token=...` fragment
/// some providers use for the emailed link.
pub fn reset_token_from_link(link_or_token: &str) -> Option<String> {
    let trimmed = link_or_token.trim();
    if trimmed.is_empty() {
        return None;
    }
    if !trimmed.contains('?') && !trimmed.contains('#') {
        return Some(trimmed.to_string());
    }
    for section in trimmed.split(|c| c == '?' || c == '#').skip(1) {
        for pair in section.split('&') {
            if let Some(value) = pair.strip_prefix("access_token=") {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

//=========================================================================================
// Account service
//=========================================================================================

#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    admin: Arc<dyn AccountAdmin>,
    tracker: SessionTracker,
    reset_redirect: Option<String>,
}

impl AccountService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        admin: Arc<dyn AccountAdmin>,
        tracker: SessionTracker,
    ) -> Self {
        Self { identity, profiles, admin, tracker, reset_redirect: None }
    }

    /// Where the emailed password-reset link should send the user.
    pub fn with_reset_redirect(mut self, url: impl Into<String>) -> Self {
        self.reset_redirect = Some(url.into());
        self
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Registers a new account and, when the provider signs it straight in,
    /// writes its profile row. A provider that wants email confirmation first
    /// yields `Pending` and no session.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Outcome<Identity> {
        if let Err(reason) = validate_email(email) {
            return Outcome::failure(ErrorKind::Validation, reason);
        }
        if let Err(reason) = validate_password(password) {
            return Outcome::failure(ErrorKind::Validation, reason);
        }

        let receipt = match self.identity.sign_up(email, password).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!("Sign-up rejected: {e}");
                return Outcome::Failure(e.into());
            }
        };

        let Some(session) = receipt.session else {
            info!("Sign-up accepted; waiting on email confirmation");
            return Outcome::pending(CONFIRMATION_PENDING_MESSAGE);
        };

        let who = session.identity.clone();
        if let Err(e) = self.identity.adopt_session(&session).await {
            warn!("Session for the new account could not be adopted: {e}");
            return Outcome::Failure(e.into());
        }

        // The identity exists either way. A failed profile write leaves a
        // signed-in account that `save_profile` can still repair, so it is
        // reported as partial rather than rolled back.
        let draft = ProfileDraft {
            display_name: display_name.unwrap_or(email).to_string(),
            dietary_goals: None,
            avatar_url: None,
        };
        if let Err(e) = self.profiles.upsert(&session.access_token, who.id, &draft).await {
            warn!("Account {} created but its profile was not: {e}", who.id);
            return Outcome::failure(
                ErrorKind::PartialFailure,
                format!("Account created, but setting up your profile failed: {e}"),
            );
        }

        info!("Account {} registered", who.id);
        Outcome::Success(who)
    }

    /// Exchanges credentials for a session, then checks the soft-delete marker
    /// before the session is adopted anywhere. A soft-deleted account gets its
    /// fresh session revoked immediately and never shows up as signed in.
    pub async fn sign_in(&self, email: &str, password: &str) -> Outcome<Identity> {
        let session = match self.identity.sign_in(email, password).await {
            Ok(session) => session,
            Err(e) => {
                info!("Sign-in rejected");
                return Outcome::Failure(e.into());
            }
        };

        let profile = match self.profiles.fetch(&session.access_token, session.identity.id).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Profile lookup during sign-in failed: {e}");
                self.revoke_quietly(&session.access_token).await;
                return Outcome::Failure(e.into());
            }
        };

        if profile.as_ref().is_some_and(Profile::is_soft_deleted) {
            info!("Sign-in refused for soft-deleted account {}", session.identity.id);
            self.revoke_quietly(&session.access_token).await;
            return Outcome::failure(ErrorKind::SoftDeleted, ACCOUNT_DELETED_MESSAGE);
        }

        let who = session.identity.clone();
        if let Err(e) = self.identity.adopt_session(&session).await {
            warn!("Sign-in succeeded but the session could not be adopted: {e}");
            return Outcome::Failure(e.into());
        }

        info!("Account {} signed in", who.id);
        Outcome::Success(who)
    }

    /// Signs the current session out. A no-op success when nobody is signed
    /// in. Provider failures are logged and swallowed: the local session is
    /// gone regardless, and the token expires on its own.
    pub async fn sign_out(&self) -> Outcome<()> {
        let Some(token) = self.tracker.access_token() else {
            return Outcome::Success(());
        };
        if let Err(e) = self.identity.sign_out(&token).await {
            warn!("Provider sign-out failed; local session cleared anyway: {e}");
        }
        Outcome::Success(())
    }

    /// Asks the provider to email a reset link. Whether the address is
    /// registered must not be observable: provider rejections are logged and
    /// reported as success, and only transport failures surface.
    pub async fn request_password_reset(&self, email: &str) -> Outcome<()> {
        match self.identity.send_password_reset(email, self.reset_redirect.as_deref()).await {
            Ok(()) => Outcome::Success(()),
            Err(PortError::Network(message)) => Outcome::failure(ErrorKind::Network, message),
            Err(e) => {
                warn!("Password reset rejected by the provider: {e}");
                Outcome::Success(())
            }
        }
    }

    /// Completes a reset begun from an emailed link. The two password copies
    /// are compared locally before the recovery token is ever used, so an
    /// expired link cannot be consumed by a typo.
    pub async fn complete_password_reset(
        &self,
        link_or_token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Outcome<()> {
        if new_password != confirm_password {
            return Outcome::failure(ErrorKind::Validation, "Passwords do not match.");
        }
        if let Err(reason) = validate_password(new_password) {
            return Outcome::failure(ErrorKind::Validation, reason);
        }
        let Some(token) = reset_token_from_link(link_or_token) else {
            return Outcome::failure(ErrorKind::Validation, "Invalid reset link.");
        };

        let update = IdentityUpdate::password(new_password);
        match self.identity.update_identity(&token, &update).await {
            Ok(_) => {
                info!("Password reset completed");
                Outcome::Success(())
            }
            Err(e) => {
                info!("Password reset token rejected: {e}");
                Outcome::Failure(e.into())
            }
        }
    }

    /// Deletes the signed-in account. Soft deletion marks the profile and
    /// signs out; the account stays recoverable through `restore_account`.
    /// Hard deletion goes through the privileged purge endpoint and is final.
    pub async fn delete_account(&self, options: DeleteOptions) -> Outcome<()> {
        let Some(session) = self.tracker.snapshot().session else {
            return Outcome::Failure(OpError::not_signed_in());
        };
        let user_id = session.identity.id;

        if options.soft_delete {
            if let Err(e) =
                self.profiles.set_deleted(&session.access_token, user_id, Some(Utc::now())).await
            {
                error!("Soft delete for {user_id} failed: {e}");
                return Outcome::Failure(e.into());
            }
            info!("Account {user_id} soft-deleted");
            self.revoke_quietly(&session.access_token).await;
            return Outcome::Success(());
        }

        let report = match self.admin.purge(&session.access_token, user_id).await {
            Ok(report) => report,
            Err(e) => {
                error!("Purge request for {user_id} failed: {e}");
                return Outcome::Failure(e.into());
            }
        };

        if report.identity_removed {
            if !report.profile_removed {
                warn!(
                    "Account {user_id} purged but its profile row remains: {}",
                    report.error.as_deref().unwrap_or("unknown")
                );
            }
            info!("Account {user_id} permanently deleted");
            // The identity is gone; drop the now-dead local session.
            self.revoke_quietly(&session.access_token).await;
            Outcome::Success(())
        } else if report.profile_removed {
            Outcome::failure(
                ErrorKind::PartialFailure,
                report.error.unwrap_or_else(|| {
                    "The profile was removed but the account itself was not.".to_string()
                }),
            )
        } else {
            Outcome::failure(
                ErrorKind::ProviderRejected,
                report.error.unwrap_or_else(|| "Account deletion failed.".to_string()),
            )
        }
    }

    /// Reactivates a soft-deleted account: proves the credentials, clears the
    /// marker, then throws the temporary session away. The caller signs in
    /// normally afterwards.
    pub async fn restore_account(&self, email: &str, password: &str) -> Outcome<()> {
        let session = match self.identity.sign_in(email, password).await {
            Ok(session) => session,
            Err(e) => {
                info!("Restore rejected");
                return Outcome::Failure(e.into());
            }
        };

        let cleared =
            self.profiles.set_deleted(&session.access_token, session.identity.id, None).await;

        // The temporary session is never adopted; revoke it either way.
        self.revoke_quietly(&session.access_token).await;

        match cleared {
            Ok(profile) => {
                info!("Account {} restored", profile.user_id);
                Outcome::Success(())
            }
            Err(e) => {
                warn!("Restore for {} failed: {e}", session.identity.id);
                Outcome::Failure(e.into())
            }
        }
    }

    /// Changes the signed-in account's email address. The provider may hold
    /// the change until the new address is confirmed.
    pub async fn update_email(&self, new_email: &str) -> Outcome<Identity> {
        if let Err(reason) = validate_email(new_email) {
            return Outcome::failure(ErrorKind::Validation, reason);
        }
        let Some(token) = self.tracker.access_token() else {
            return Outcome::Failure(OpError::not_signed_in());
        };
        match self.identity.update_identity(&token, &IdentityUpdate::email(new_email)).await {
            Ok(who) => Outcome::Success(who),
            Err(e) => {
                warn!("Email update rejected: {e}");
                Outcome::Failure(e.into())
            }
        }
    }

    /// Fetches the signed-in account's profile. `None` means no row exists
    /// yet, which is not an error.
    pub async fn load_profile(&self) -> Outcome<Option<Profile>> {
        let Some(session) = self.tracker.snapshot().session else {
            return Outcome::Failure(OpError::not_signed_in());
        };
        self.profiles.fetch(&session.access_token, session.identity.id).await.into()
    }

    /// Creates or updates the signed-in account's profile row.
    pub async fn save_profile(&self, draft: &ProfileDraft) -> Outcome<Profile> {
        if draft.display_name.trim().is_empty() {
            return Outcome::failure(ErrorKind::Validation, "Display name cannot be empty.");
        }
        let Some(session) = self.tracker.snapshot().session else {
            return Outcome::Failure(OpError::not_signed_in());
        };
        self.profiles.upsert(&session.access_token, session.identity.id, draft).await.into()
    }

    async fn revoke_quietly(&self, access_token: &str) {
        if let Err(e) = self.identity.sign_out(access_token).await {
            warn!("Session revocation failed: {e}");
        }
    }
}
