//! In-memory identity provider and backend for unit tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::backend::{
    Backend, BackendUser, CreateProfileRequest, LoginAck, LoginRequest, Pagination, PostSummary,
    ProfileListResponse, ProfileSummary, SearchQuery, SearchResponse, SignupRequest,
    UpdateProfileRequest, VerifyOutcome, VerifyTokenRequest,
};
use crate::error::{AuthError, NetworkError};
use crate::identity::{IdentityProvider, Principal, ProviderSession, SessionManager};

pub fn principal(uid: &str) -> Principal {
    Principal {
        uid: uid.to_string(),
        email: format!("{}@example.com", uid),
        display_name: None,
        email_verified: true,
    }
}

pub fn session(uid: &str) -> ProviderSession {
    ProviderSession {
        principal: principal(uid),
        id_token: format!("token-{}", uid),
        refresh_token: "refresh".into(),
        expires_at: Utc::now() + chrono::Duration::hours(1),
    }
}

/// Accepts any password; the uid is the email's local part.
#[derive(Default)]
pub struct FakeProvider {
    pub cached: Mutex<Option<ProviderSession>>,
}

impl FakeProvider {
    pub fn signed_in(uid: &str) -> Arc<Self> {
        Arc::new(Self {
            cached: Mutex::new(Some(session(uid))),
        })
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn restore_session(&self) -> Option<ProviderSession> {
        self.cached.lock().clone()
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<ProviderSession, AuthError> {
        let s = session(crate::util::email_local_part(email));
        *self.cached.lock() = Some(s.clone());
        Ok(s)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderSession, AuthError> {
        self.sign_in(email, password).await
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

pub async fn signed_in_manager(uid: &str) -> Arc<SessionManager> {
    let manager = SessionManager::new(FakeProvider::signed_in(uid), Duration::from_secs(1));
    manager.resolve().await;
    manager
}

fn offline_error() -> NetworkError {
    NetworkError::Unavailable("connection refused".into())
}

/// Scriptable backend. Every call is recorded by name.
pub struct FakeBackend {
    pub verify: Mutex<Result<VerifyOutcome, NetworkError>>,
    pub signup: Mutex<Result<(), NetworkError>>,
    pub update: Mutex<Result<(), NetworkError>>,
    pub listing: Mutex<Result<Vec<ProfileSummary>, NetworkError>>,
    pub created_id: Mutex<Result<String, NetworkError>>,
    pub list_delay: Mutex<Option<Duration>>,
    pub calls: Mutex<Vec<String>>,
    pub created: Mutex<Vec<serde_json::Value>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            verify: Mutex::new(Ok(VerifyOutcome::NotRegistered)),
            signup: Mutex::new(Ok(())),
            update: Mutex::new(Ok(())),
            listing: Mutex::new(Ok(Vec::new())),
            created_id: Mutex::new(Ok("p1".into())),
            list_delay: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    pub fn offline() -> Arc<Self> {
        Arc::new(Self {
            verify: Mutex::new(Err(offline_error())),
            signup: Mutex::new(Err(offline_error())),
            update: Mutex::new(Err(offline_error())),
            listing: Mutex::new(Err(offline_error())),
            created_id: Mutex::new(Err(offline_error())),
            ..Self::default()
        })
    }

    pub fn with_listing(json: &str) -> Arc<Self> {
        let body = format!(r#"{{"profiles": {}}}"#, json);
        let listing: ProfileListResponse = serde_json::from_str(&body).unwrap();
        let backend = Self::default();
        *backend.listing.lock() = Ok(listing.profiles);
        Arc::new(backend)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, name: &str) {
        self.calls.lock().push(name.to_string());
    }
}

fn user_from(uid: &str, email: &str, name: Option<String>) -> BackendUser {
    BackendUser {
        firebase_uid: uid.to_string(),
        email: email.to_string(),
        display_name: name,
        username: None,
        created_at: None,
        is_verified: true,
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn verify_token(
        &self,
        _token: &str,
        _request: &VerifyTokenRequest,
    ) -> Result<VerifyOutcome, NetworkError> {
        self.record("verify");
        self.verify.lock().clone()
    }

    async fn signup(&self, _token: &str, request: &SignupRequest) -> Result<BackendUser, NetworkError> {
        self.record("signup");
        self.signup.lock().clone()?;
        Ok(user_from(
            &request.firebase_uid,
            &request.email,
            Some(request.full_name.clone()),
        ))
    }

    async fn login(&self, _request: &LoginRequest) -> Result<LoginAck, NetworkError> {
        self.record("login");
        Ok(LoginAck {
            success: true,
            ..Default::default()
        })
    }

    async fn me(&self, token: &str) -> Result<BackendUser, NetworkError> {
        self.record("me");
        let uid = token.trim_start_matches("token-");
        Ok(user_from(uid, &format!("{}@example.com", uid), None))
    }

    async fn update_profile(
        &self,
        _token: &str,
        _request: &UpdateProfileRequest,
    ) -> Result<(), NetworkError> {
        self.record("update");
        self.update.lock().clone()
    }

    async fn list_profiles(&self, _token: &str) -> Result<ProfileListResponse, NetworkError> {
        self.record("list");
        let delay = *self.list_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let profiles = self.listing.lock().clone()?;
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
        self.record("create");
        let id = self.created_id.lock().clone()?;
        self.created.lock().push(serde_json::to_value(request).unwrap());
        Ok(id)
    }

    async fn search_profiles(
        &self,
        _token: &str,
        query: &SearchQuery,
    ) -> Result<SearchResponse<ProfileSummary>, NetworkError> {
        self.record("search-profiles");
        let results = self.listing.lock().clone()?;
        let total = results.len() as u64;
        Ok(SearchResponse {
            results,
            pagination: Pagination {
                page: query.page,
                per_page: query.per_page,
                total,
                pages: if query.page < 2 { 2 } else { query.page },
                has_next: query.page < 2,
                has_prev: query.page > 1,
            },
        })
    }

    async fn search_posts(
        &self,
        _token: &str,
        query: &SearchQuery,
    ) -> Result<SearchResponse<PostSummary>, NetworkError> {
        self.record("search-posts");
        Ok(SearchResponse {
            results: vec![PostSummary {
                id: "post-1".into(),
                content: format!("match for {}", query.q),
                author_id: None,
                author_name: None,
                created_at: None,
                likes_count: 3,
                comments_count: 0,
            }],
            pagination: Pagination {
                page: query.page,
                per_page: query.per_page,
                total: 1,
                pages: 1,
                has_next: false,
                has_prev: false,
            },
        })
    }
}
