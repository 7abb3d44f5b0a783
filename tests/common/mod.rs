//! In-memory collaborators for driving `ClientContext` end to end.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use cricknet_lib::backend::{
    Backend, BackendUser, CreateProfileRequest, LoginAck, LoginRequest, Pagination, PostSummary,
    ProfileListResponse, ProfileSummary, SearchQuery, SearchResponse, SignupRequest,
    UpdateProfileRequest, VerifyOutcome, VerifyTokenRequest,
};
use cricknet_lib::identity::{IdentityProvider, Principal, ProviderSession, ReachabilityProbe};
use cricknet_lib::{AuthError, ClientContext, Config, NetworkError};

pub const PASSWORD: &str = "cover-drive-42";

/// Accepts [`PASSWORD`] for any email; the uid is `uid-<local part>`.
#[derive(Default)]
pub struct MemoryProvider {
    cached: Mutex<Option<ProviderSession>>,
}

impl MemoryProvider {
    fn session_for(email: &str) -> ProviderSession {
        let local = email.split('@').next().unwrap_or(email);
        ProviderSession {
            principal: Principal {
                uid: format!("uid-{}", local),
                email: email.to_string(),
                display_name: None,
                email_verified: false,
            },
            id_token: format!("id-{}", local),
            refresh_token: "refresh".into(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryProvider {
    async fn restore_session(&self) -> Option<ProviderSession> {
        self.cached.lock().clone()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderSession, AuthError> {
        if password != PASSWORD {
            return Err(AuthError::InvalidCredentials);
        }
        let session = Self::session_for(email);
        *self.cached.lock() = Some(session.clone());
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderSession, AuthError> {
        if password.len() < 6 {
            return Err(AuthError::WeakCredential);
        }
        let session = Self::session_for(email);
        *self.cached.lock() = Some(session.clone());
        Ok(session)
    }

    async fn refresh(&self, session: &ProviderSession) -> Result<ProviderSession, AuthError> {
        Ok(session.clone())
    }

    async fn send_password_reset(&self, _email: &str) -> Result<(), AuthError> {
        Ok(())
    }

    async fn sign_out(&self) {
        *self.cached.lock() = None;
    }
}

/// Backend with an on/off switch; when off every call fails as unreachable.
pub struct MemoryBackend {
    pub online: AtomicBool,
    pub pages: Mutex<Vec<ProfileSummary>>,
    pub users: Mutex<Vec<BackendUser>>,
    pub next_page_id: Mutex<String>,
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(true),
            pages: Mutex::new(Vec::new()),
            users: Mutex::new(Vec::new()),
            next_page_id: Mutex::new("p1".into()),
        })
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), NetworkError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(NetworkError::Unavailable("connection refused".into()))
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn verify_token(
        &self,
        _token: &str,
        request: &VerifyTokenRequest,
    ) -> Result<VerifyOutcome, NetworkError> {
        self.check()?;
        let users = self.users.lock();
        Ok(users
            .iter()
            .find(|u| u.firebase_uid == request.firebase_uid)
            .cloned()
            .map(VerifyOutcome::Synced)
            .unwrap_or(VerifyOutcome::NotRegistered))
    }

    async fn signup(&self, _token: &str, request: &SignupRequest) -> Result<BackendUser, NetworkError> {
        self.check()?;
        let user = BackendUser {
            firebase_uid: request.firebase_uid.clone(),
            email: request.email.clone(),
            display_name: Some(request.full_name.clone()),
            username: Some(request.username.clone()),
            created_at: Some(Utc::now().to_rfc3339()),
            is_verified: request.email_verified,
        };
        self.users.lock().push(user.clone());
        Ok(user)
    }

    async fn login(&self, _request: &LoginRequest) -> Result<LoginAck, NetworkError> {
        self.check()?;
        Ok(LoginAck {
            success: true,
            ..Default::default()
        })
    }

    async fn me(&self, _token: &str) -> Result<BackendUser, NetworkError> {
        self.check()?;
        self.users.lock().first().cloned().ok_or(NetworkError::Rejected {
            status: 404,
            message: "User not found".into(),
        })
    }

    async fn update_profile(
        &self,
        _token: &str,
        _request: &UpdateProfileRequest,
    ) -> Result<(), NetworkError> {
        self.check()
    }

    async fn list_profiles(&self, _token: &str) -> Result<ProfileListResponse, NetworkError> {
        self.check()?;
        let profiles = self.pages.lock().clone();
        Ok(ProfileListResponse {
            total: profiles.len() as u64,
            profiles,
        })
    }

    async fn create_profile(
        &self,
        _token: &str,
        request: &CreateProfileRequest<'_>,
    ) -> Result<String, NetworkError> {
        self.check()?;
        let id = self.next_page_id.lock().clone();
        let summary: ProfileSummary = serde_json::from_value(serde_json::json!({
            "id": id,
            "type": request.draft.profile_type().to_string(),
            "name": request.draft.name(),
            "owner_id": request.firebase_uid,
        }))
        .map_err(|e| NetworkError::Decode(e.to_string()))?;
        self.pages.lock().push(summary);
        Ok(id)
    }

    async fn search_profiles(
        &self,
        _token: &str,
        query: &SearchQuery,
    ) -> Result<SearchResponse<ProfileSummary>, NetworkError> {
        self.check()?;
        let needle = query.q.to_lowercase();
        let results: Vec<ProfileSummary> = self
            .pages
            .lock()
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Ok(SearchResponse {
            pagination: Pagination {
                page: query.page,
                per_page: query.per_page,
                total: results.len() as u64,
                pages: 1,
                has_next: false,
                has_prev: false,
            },
            results,
        })
    }

    async fn search_posts(
        &self,
        _token: &str,
        query: &SearchQuery,
    ) -> Result<SearchResponse<PostSummary>, NetworkError> {
        self.check()?;
        Ok(SearchResponse {
            results: Vec::new(),
            pagination: Pagination {
                page: query.page,
                per_page: query.per_page,
                ..Default::default()
            },
        })
    }
}

/// Reachability follows the backend's on/off switch.
pub struct BackendProbe(pub Arc<MemoryBackend>);

#[async_trait]
impl ReachabilityProbe for BackendProbe {
    async fn probe(&self) -> Result<(), String> {
        self.0.check().map_err(|e| e.to_string())
    }
}

pub fn context(backend: &Arc<MemoryBackend>) -> ClientContext {
    ClientContext::with_parts(
        Config::default(),
        Arc::new(MemoryProvider::default()),
        backend.clone(),
        Arc::new(BackendProbe(backend.clone())),
    )
}
