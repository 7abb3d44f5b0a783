//! REST backend contract.
//!
//! Modules:
//! - client: reqwest implementation of [`Backend`]
//! - retry: transient-only exponential backoff
//! - types: JSON request/response shapes
//!
//! Every method takes the bearer token fetched just-in-time by the caller;
//! implementations never hold credentials between requests.

pub mod client;
pub mod retry;
pub mod types;

use async_trait::async_trait;

use crate::error::NetworkError;

pub use client::BackendClient;
pub use types::{
    BackendUser, CreateProfileRequest, LoginAck, LoginRequest, Pagination, PostSummary,
    ProfileListResponse, ProfileSummary, SearchResponse, SignupRequest, UpdateProfileRequest,
    VerifyOutcome, VerifyTokenRequest,
};

/// Query parameters shared by the search endpoints.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SearchQuery {
    pub q: String,
    pub page: u32,
    pub per_page: u32,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub profile_type: Option<String>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// `POST /firebase/verify-token`
    async fn verify_token(
        &self,
        token: &str,
        request: &VerifyTokenRequest,
    ) -> Result<VerifyOutcome, NetworkError>;

    /// `POST /firebase/signup`
    async fn signup(&self, token: &str, request: &SignupRequest)
        -> Result<BackendUser, NetworkError>;

    /// `POST /firebase/login`
    async fn login(&self, request: &LoginRequest) -> Result<LoginAck, NetworkError>;

    /// `GET /firebase/me`
    async fn me(&self, token: &str) -> Result<BackendUser, NetworkError>;

    /// `POST /firebase/update-profile`
    async fn update_profile(
        &self,
        token: &str,
        request: &UpdateProfileRequest,
    ) -> Result<(), NetworkError>;

    /// `GET /api/profiles`
    async fn list_profiles(&self, token: &str) -> Result<ProfileListResponse, NetworkError>;

    /// `POST /api/profiles`, returning the new page id.
    async fn create_profile(
        &self,
        token: &str,
        request: &CreateProfileRequest<'_>,
    ) -> Result<String, NetworkError>;

    /// `GET /search/profiles`
    async fn search_profiles(
        &self,
        token: &str,
        query: &SearchQuery,
    ) -> Result<SearchResponse<ProfileSummary>, NetworkError>;

    /// `GET /search/posts`
    async fn search_posts(
        &self,
        token: &str,
        query: &SearchQuery,
    ) -> Result<SearchResponse<PostSummary>, NetworkError>;
}
