//! Client context: the single object owning every component.
//!
//! UI shells receive a `ClientContext` instead of reaching for globals. The
//! session manager is the only writer of the principal; every other
//! component holds a handle to it and reads it on demand.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::backend::{Backend, BackendClient};
use crate::config::{Config, ConfigError};
use crate::error::AuthError;
use crate::identity::connectivity::ConnectivityHandle;
use crate::identity::store::SessionStore;
use crate::identity::{
    ConnectivityMonitor, FirebaseAuthProvider, HttpProbe, IdentityProvider, Principal,
    ReachabilityProbe, SessionManager,
};
use crate::profiles::{Profile, ProfileRegistry};
use crate::search::SearchService;
use crate::sync::{SyncBridge, SyncReport};

/// What a UI needs right after a session starts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStart {
    pub principal: Principal,
    pub sync: SyncReport,
    pub profiles: Vec<Profile>,
}

pub struct ClientContext {
    pub config: Config,
    pub session: Arc<SessionManager>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub sync: SyncBridge,
    pub profiles: ProfileRegistry,
    pub search: SearchService,
    /// Uid whose session start has already been reconciled with the backend.
    synced_uid: Mutex<Option<String>>,
    last_sync: Mutex<Option<SyncReport>>,
}

impl ClientContext {
    /// Wire the production Firebase provider, REST backend, and HTTP probe.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let base = config.api_base()?;
        let store = SessionStore::default_location();
        if store.is_none() {
            log::warn!("No home directory; sessions will not persist across runs");
        }
        let provider = Arc::new(FirebaseAuthProvider::new(&config.firebase, store));
        let backend = Arc::new(BackendClient::new(base.clone(), config.retry.clone()));
        let probe = Arc::new(HttpProbe::new(base, config.connectivity.probe_timeout()));
        Ok(Self::with_parts(config, provider, backend, probe))
    }

    pub fn with_parts(
        config: Config,
        provider: Arc<dyn IdentityProvider>,
        backend: Arc<dyn Backend>,
        probe: Arc<dyn ReachabilityProbe>,
    ) -> Self {
        let session = SessionManager::new(
            provider,
            config.connectivity.session_resolution_timeout(),
        );
        Self {
            connectivity: ConnectivityMonitor::new(probe),
            sync: SyncBridge::new(Arc::clone(&session), Arc::clone(&backend)),
            profiles: ProfileRegistry::new(Arc::clone(&session), Arc::clone(&backend)),
            search: SearchService::new(Arc::clone(&session), backend),
            session,
            config,
            synced_uid: Mutex::new(None),
            last_sync: Mutex::new(None),
        }
    }

    /// Sign in, reconcile with the backend, and load profiles.
    ///
    /// Only identity-provider failures are returned; backend trouble shows up
    /// as a degraded sync report and a personal-only profile list.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionStart, AuthError> {
        let principal = self.session.sign_in(email, password).await?;
        Ok(self.start_session(principal).await)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SessionStart, AuthError> {
        let principal = self.session.sign_up(email, password).await?;
        Ok(self.start_session(principal).await)
    }

    /// Pick up a session cached from a previous run. Syncs at most once per uid.
    pub async fn resume(&self) -> Option<SessionStart> {
        let principal = self.session.resolve().await?;
        let already_synced = self.synced_uid.lock().as_deref() == Some(principal.uid.as_str());
        if let Some(sync) = self.last_sync().filter(|_| already_synced) {
            return Some(SessionStart {
                sync,
                profiles: self.profiles.profiles(),
                principal,
            });
        }
        Some(self.start_session(principal).await)
    }

    async fn start_session(&self, principal: Principal) -> SessionStart {
        *self.synced_uid.lock() = Some(principal.uid.clone());
        let sync = self.sync.sync_on_sign_in().await;
        *self.last_sync.lock() = Some(sync.clone());

        let profiles = match self.profiles.load_profiles().await {
            Ok(profiles) => profiles,
            Err(e) => {
                log::warn!("Profile load after sign-in failed: {}", e);
                vec![Profile::personal(&principal)]
            }
        };

        SessionStart {
            principal,
            sync,
            profiles,
        }
    }

    /// Clear the session and forget its profiles. Works offline.
    pub async fn sign_out(&self) {
        self.session.sign_out().await;
        self.profiles.reset();
        *self.synced_uid.lock() = None;
        *self.last_sync.lock() = None;
    }

    pub fn last_sync(&self) -> Option<SyncReport> {
        self.last_sync.lock().clone()
    }

    /// Start periodic reachability probing. Dropping the handle stops it.
    pub fn start_connectivity(&self) -> ConnectivityHandle {
        self.connectivity
            .spawn(self.config.connectivity.probe_interval())
    }
}
