//! Identity Session Manager.
//!
//! The only writer of the current principal. Readers either poll
//! [`SessionManager::current_principal`] or hold a [`SessionWatcher`], which
//! yields every auth-state transition in order with last-write-wins
//! semantics (a slow watcher sees the newest value, never a backlog).
//!
//! Resolution of the provider's cached session is lazy and bounded: the
//! first watcher (or the first token request) triggers it, and it settles to
//! "signed out" after the resolution timeout even if the provider never
//! answers.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{watch, OnceCell};

use super::{IdentityProvider, Principal, ProviderSession};
use crate::error::AuthError;

#[derive(Debug, Clone, PartialEq)]
enum SessionState {
    Resolving,
    Resolved(Option<Principal>),
}

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    resolution_timeout: Duration,
    session: Mutex<Option<ProviderSession>>,
    state: watch::Sender<SessionState>,
    resolved: OnceCell<()>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>, resolution_timeout: Duration) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::Resolving);
        Arc::new(Self {
            provider,
            resolution_timeout,
            session: Mutex::new(None),
            state,
            resolved: OnceCell::new(),
        })
    }

    /// Subscribe to auth-state transitions. Each watcher starts from the
    /// current state, so observation can be restarted at any time.
    pub fn observe_session(self: &Arc<Self>) -> SessionWatcher {
        SessionWatcher {
            manager: Arc::clone(self),
            rx: self.state.subscribe(),
            primed: false,
        }
    }

    /// The principal as of now. `None` while resolution is still pending.
    pub fn current_principal(&self) -> Option<Principal> {
        self.session.lock().as_ref().map(|s| s.principal.clone())
    }

    /// Wait for the cached session to resolve, then return the principal.
    pub async fn resolve(&self) -> Option<Principal> {
        self.ensure_resolved().await;
        self.current_principal()
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Resolved(_))
    }

    async fn ensure_resolved(&self) {
        self.resolved
            .get_or_init(|| async {
                if self.is_resolved() {
                    return;
                }
                let restored =
                    match tokio::time::timeout(self.resolution_timeout, self.provider.restore_session())
                        .await
                    {
                        Ok(restored) => restored,
                        Err(_) => {
                            log::warn!(
                                "Session resolution timed out after {:?}, treating as signed out",
                                self.resolution_timeout
                            );
                            None
                        }
                    };
                let mut session = self.session.lock();
                if *self.state.borrow() != SessionState::Resolving {
                    // A sign-in or sign-out won the race; the restored session is stale.
                    return;
                }
                if let Some(restored) = &restored {
                    log::info!("Restored session for {}", restored.principal.uid);
                }
                let principal = restored.as_ref().map(|s| s.principal.clone());
                *session = restored;
                self.state.send_replace(SessionState::Resolved(principal));
            })
            .await;
    }

    fn publish(&self, next: Option<ProviderSession>) {
        let mut session = self.session.lock();
        let principal = next.as_ref().map(|s| s.principal.clone());
        *session = next;
        self.state.send_replace(SessionState::Resolved(principal));
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let session = self.provider.sign_in(email.trim(), password).await?;
        let principal = session.principal.clone();
        self.publish(Some(session));
        Ok(principal)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let session = self.provider.sign_up(email.trim(), password).await?;
        let principal = session.principal.clone();
        self.publish(Some(session));
        Ok(principal)
    }

    /// Clear the session. Local state is cleared even when the provider is unreachable.
    pub async fn sign_out(&self) {
        let uid = self.current_principal().map(|p| p.uid);
        self.provider.sign_out().await;
        self.publish(None);
        if let Some(uid) = uid {
            log::info!("Signed out {}", uid);
        }
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        self.provider.send_password_reset(email.trim()).await
    }

    /// A bearer token for a single request, refreshed when close to expiry.
    ///
    /// The principal may change while a refresh is in flight; the refreshed
    /// token is only used if the same principal is still signed in.
    pub async fn fresh_token(&self) -> Result<String, AuthError> {
        self.ensure_resolved().await;

        let current = self.session.lock().clone().ok_or(AuthError::NotSignedIn)?;
        if !current.is_expired() {
            return Ok(current.id_token);
        }

        log::debug!("Refreshing id token for {}", current.principal.uid);
        match self.provider.refresh(&current).await {
            Ok(refreshed) => {
                let mut session = self.session.lock();
                match session.as_ref() {
                    Some(s) if s.principal.uid == refreshed.principal.uid => {
                        let token = refreshed.id_token.clone();
                        *session = Some(refreshed);
                        Ok(token)
                    }
                    _ => Err(AuthError::NotSignedIn),
                }
            }
            Err(AuthError::SessionExpired) => {
                log::warn!("Session for {} expired, signing out", current.principal.uid);
                let still_current = self
                    .current_principal()
                    .is_some_and(|p| p.uid == current.principal.uid);
                if still_current {
                    self.provider.sign_out().await;
                    self.publish(None);
                }
                Err(AuthError::SessionExpired)
            }
            Err(e) => Err(e),
        }
    }
}

/// A restartable stream of principal-or-none values.
pub struct SessionWatcher {
    manager: Arc<SessionManager>,
    rx: watch::Receiver<SessionState>,
    primed: bool,
}

impl SessionWatcher {
    /// The first call yields the resolved cached session; later calls wait
    /// for the next transition. Never ends: the watcher keeps its manager alive.
    pub async fn next(&mut self) -> Option<Principal> {
        if !self.primed {
            self.primed = true;
            self.manager.ensure_resolved().await;
            if let SessionState::Resolved(principal) = self.rx.borrow_and_update().clone() {
                return principal;
            }
        }
        loop {
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
            if let SessionState::Resolved(principal) = self.rx.borrow_and_update().clone() {
                return principal;
            }
        }
    }
}
