//! Identity provider integration.
//!
//! Modules:
//! - connectivity: online/offline state machine and reachability probing
//! - firebase: Identity Toolkit REST provider
//! - session: the session manager, sole owner of the current principal
//! - store: the provider's cached session on disk
//!
//! Any provider offering credential issuance, a restorable session, and
//! on-demand token refresh can stand behind [`IdentityProvider`].

pub mod connectivity;
pub mod firebase;
pub mod session;
pub mod store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

pub use connectivity::{ConnectivityMonitor, ConnectivityStatus, HttpProbe, ReachabilityProbe};
pub use firebase::FirebaseAuthProvider;
pub use session::{SessionManager, SessionWatcher};

/// Seconds before expiry at which an id token is treated as stale.
const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;

/// The authenticated actor, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

impl Principal {
    /// Display name, falling back to the email's local part.
    pub fn preferred_name(&self) -> String {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| crate::util::email_local_part(&self.email).to_string())
    }
}

/// A principal plus the provider credentials backing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSession {
    pub principal: Principal,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl ProviderSession {
    /// Consider expired within a minute of expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now() + chrono::Duration::seconds(TOKEN_EXPIRY_SKEW_SECS)
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The provider's cached session, if one survives from a previous run.
    async fn restore_session(&self) -> Option<ProviderSession>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderSession, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderSession, AuthError>;

    /// Exchange the refresh token for a fresh id token.
    async fn refresh(&self, session: &ProviderSession) -> Result<ProviderSession, AuthError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;

    /// Drop the locally cached session. Never fails; remote revocation is not attempted.
    async fn sign_out(&self);
}
