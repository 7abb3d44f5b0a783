//! Backend Sync Bridge.
//!
//! Reconciles the signed-in principal with its backend user record. The
//! identity provider's session is the source of truth for being signed in,
//! so nothing here ever blocks sign-in: failures are logged and reported as
//! a degraded outcome.
//!
//! Each backend call fetches a fresh bearer token from the session manager
//! just before sending it.

use std::sync::Arc;

use serde::Serialize;

use crate::backend::{
    Backend, BackendUser, LoginAck, LoginRequest, SignupRequest, UpdateProfileRequest,
    VerifyOutcome, VerifyTokenRequest,
};
use crate::error::{NetworkError, SyncError};
use crate::identity::{Principal, SessionManager};
use crate::util::generate_username;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SyncOutcome {
    /// The backend already knew the user.
    Verified { user: BackendUser },
    /// The user was created by this sync.
    Registered { user: BackendUser },
    /// The backend could not be reconciled; the session continues regardless.
    Degraded { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    pub identity_pushed: bool,
}

impl SyncReport {
    pub fn backend_user(&self) -> Option<&BackendUser> {
        match &self.outcome {
            SyncOutcome::Verified { user } | SyncOutcome::Registered { user } => Some(user),
            SyncOutcome::Degraded { .. } => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Degraded { .. })
    }
}

pub struct SyncBridge {
    session: Arc<SessionManager>,
    backend: Arc<dyn Backend>,
}

impl SyncBridge {
    pub fn new(session: Arc<SessionManager>, backend: Arc<dyn Backend>) -> Self {
        Self { session, backend }
    }

    /// Current principal plus a just-fetched token for it.
    async fn credential(&self) -> Result<(Principal, String), SyncError> {
        let principal = self
            .session
            .current_principal()
            .ok_or(SyncError::NoCredential)?;
        let token = self.session.fresh_token().await?;
        // The principal may have changed while the token was being fetched.
        match self.session.current_principal() {
            Some(current) if current.uid == principal.uid => Ok((principal, token)),
            _ => Err(SyncError::NoCredential),
        }
    }

    pub async fn verify(&self) -> Result<VerifyOutcome, SyncError> {
        let (principal, token) = self.credential().await?;
        let request = VerifyTokenRequest {
            id_token: token.clone(),
            firebase_uid: principal.uid.clone(),
            email: principal.email.clone(),
            display_name: principal.display_name.clone(),
        };
        Ok(self.backend.verify_token(&token, &request).await?)
    }

    /// Create the backend user with the best data available.
    pub async fn register(&self) -> Result<BackendUser, SyncError> {
        let (principal, token) = self.credential().await?;
        let full_name = principal.preferred_name();
        let request = SignupRequest {
            firebase_uid: principal.uid.clone(),
            email: principal.email.clone(),
            id_token: token.clone(),
            username: generate_username(&full_name, &principal.uid),
            full_name,
            email_verified: principal.email_verified,
        };
        Ok(self.backend.signup(&token, &request).await?)
    }

    /// Push the principal's display name and email into the backend user.
    pub async fn push_identity(&self) -> Result<(), SyncError> {
        let (principal, token) = self.credential().await?;
        let request = UpdateProfileRequest {
            display_name: principal.display_name.clone(),
            email: Some(principal.email.clone()),
            username: None,
        };
        Ok(self.backend.update_profile(&token, &request).await?)
    }

    /// Verify, register if missing, then push identity. Never fails.
    ///
    /// Steps run strictly in sequence.
    pub async fn sync_on_sign_in(&self) -> SyncReport {
        let outcome = match self.verify().await {
            Ok(VerifyOutcome::Synced(user)) => {
                log::info!("Backend user {} verified", user.firebase_uid);
                SyncOutcome::Verified { user }
            }
            Ok(VerifyOutcome::NotRegistered) => {
                log::info!("Backend user missing, registering");
                match self.register().await {
                    Ok(user) => {
                        log::info!("Registered backend user {}", user.firebase_uid);
                        SyncOutcome::Registered { user }
                    }
                    Err(e) => {
                        log::warn!("Backend registration failed, continuing: {}", e);
                        SyncOutcome::Degraded {
                            reason: e.to_string(),
                        }
                    }
                }
            }
            Err(e) => {
                log::warn!("Backend verify failed, continuing: {}", e);
                SyncOutcome::Degraded {
                    reason: e.to_string(),
                }
            }
        };

        let identity_pushed = match self.push_identity().await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Identity push to backend failed: {}", e);
                false
            }
        };

        SyncReport {
            outcome,
            identity_pushed,
        }
    }

    /// `GET /firebase/me`. A 404 means the backend has no user yet.
    pub async fn current_user(&self) -> Result<BackendUser, SyncError> {
        let (_, token) = self.credential().await?;
        match self.backend.me(&token).await {
            Ok(user) => Ok(user),
            Err(NetworkError::Rejected { status: 404, .. }) => Err(SyncError::NotRegistered),
            Err(e) => Err(e.into()),
        }
    }

    /// `POST /firebase/login`, the backend's session acknowledgement.
    pub async fn acknowledge_login(&self) -> Result<LoginAck, SyncError> {
        let (_, token) = self.credential().await?;
        Ok(self.backend.login(&LoginRequest { id_token: token }).await?)
    }
}
