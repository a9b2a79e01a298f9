//! crates/herbwise_core/src/session.rs
//!
//! Holds the single authoritative copy of "who is signed in right now".
//! State lives behind a `watch` channel: readers grab consistent snapshots,
//! subscribers see every replacement, and updates never block callers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::{AuthSession, Identity, SessionEvent, SessionEventKind};
use crate::ports::IdentityProvider;

/// One consistent view of the session state. `seq` records the newest
/// provider event folded in; `loading` is true until the startup restore
/// attempt has finished, so callers can tell "signed out" from "not yet known".
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub seq: u64,
    pub identity: Option<Identity>,
    pub session: Option<AuthSession>,
    pub loading: bool,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self { seq: 0, identity: None, session: None, loading: true }
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }
}

struct Inner {
    tx: watch::Sender<SessionSnapshot>,
    initialized: AtomicBool,
}

/// Cheap-to-clone handle on the shared session state.
#[derive(Clone)]
pub struct SessionTracker {
    inner: Arc<Inner>,
}

impl SessionTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionSnapshot::initial());
        Self {
            inner: Arc::new(Inner { tx, initialized: AtomicBool::new(false) }),
        }
    }

    /// Restores any persisted session from the provider, exactly once.
    /// Always ends with `loading == false`, even when the restore fails.
    pub async fn initialize(&self, identity: &dyn IdentityProvider) {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            warn!("Session tracker initialized more than once; ignoring");
            return;
        }

        let restored = match identity.current_session().await {
            Ok(found) => found,
            Err(e) => {
                warn!("Could not restore a persisted session: {e}");
                None
            }
        };

        self.inner.tx.send_modify(|state| {
            // A provider event may already have landed while the restore was
            // in flight; in that case the restored copy is the stale one.
            if state.seq == 0 {
                if let Some(session) = restored {
                    debug!("Restored session for {}", session.identity.id);
                    state.identity = Some(session.identity.clone());
                    state.session = Some(session);
                }
            }
            state.loading = false;
        });
    }

    /// Spawns a task that folds provider change events into the tracker until
    /// the returned guard is dropped or detached.
    pub fn attach(&self, mut events: broadcast::Receiver<SessionEvent>) -> ListenerGuard {
        let tracker = self.clone();
        let token = CancellationToken::new();
        let task_token = token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    received = events.recv() => match received {
                        Ok(event) => tracker.apply(&event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Events carry full state, so the next one heals us.
                            warn!("Session change feed lagged; {skipped} events skipped");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            debug!("Session change listener stopped");
        });

        ListenerGuard { token }
    }

    /// Folds one provider event into the state. Events are applied in arrival
    /// order; anything not newer than what is already applied is discarded.
    pub fn apply(&self, event: &SessionEvent) {
        self.inner.tx.send_modify(|state| {
            if event.seq <= state.seq {
                debug!("Discarding stale session event (seq {} <= {})", event.seq, state.seq);
                return;
            }
            state.seq = event.seq;
            match &event.kind {
                SessionEventKind::SignedIn(session)
                | SessionEventKind::TokenRefreshed(session) => {
                    state.identity = Some(session.identity.clone());
                    state.session = Some(session.clone());
                }
                SessionEventKind::SignedOut => {
                    state.identity = None;
                    state.session = None;
                }
            }
            state.loading = false;
        });
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.tx.borrow().clone()
    }

    /// A receiver that yields every future snapshot replacement.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.tx.subscribe()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.tx.borrow().identity.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.tx.borrow().session.as_ref().map(|s| s.access_token.clone())
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the change-feed listener task. Dropping it stops the task.
pub struct ListenerGuard {
    token: CancellationToken,
}

impl ListenerGuard {
    pub fn detach(self) {
        self.token.cancel();
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
