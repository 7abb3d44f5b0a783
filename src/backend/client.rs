//! reqwest client for the CrickNet REST backend.
//!
//! Bearer auth on every authenticated call. All requests go through
//! [`with_retry`], so transient failures back off and permanent ones
//! surface immediately.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use serde::de::DeserializeOwned;

use super::retry::{with_retry, RetryPolicy};
use super::types::{
    BackendUser, CreateProfileRequest, CreateProfileResponse, LoginAck, LoginRequest,
    PostSummary, ProfileListResponse, ProfileSummary, SearchResponse, SignupRequest,
    UpdateProfileRequest, UserEnvelope, VerifyOutcome, VerifyTokenRequest, VerifyTokenResponse,
};
use super::{Backend, SearchQuery};
use crate::config::{Config, ConfigError};
use crate::error::NetworkError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const VERIFY_TOKEN_PATH: &str = "firebase/verify-token";
const SIGNUP_PATH: &str = "firebase/signup";
const LOGIN_PATH: &str = "firebase/login";
const ME_PATH: &str = "firebase/me";
const UPDATE_PROFILE_PATH: &str = "firebase/update-profile";
const PROFILES_PATH: &str = "api/profiles";
const SEARCH_PROFILES_PATH: &str = "search/profiles";
const SEARCH_POSTS_PATH: &str = "search/posts";

pub struct BackendClient {
    client: reqwest::Client,
    base: url::Url,
    retry: RetryPolicy,
}

impl BackendClient {
    pub fn new(base: url::Url, retry: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base,
            retry,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(config.api_base()?, config.retry.clone()))
    }

    pub fn base_url(&self) -> &url::Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, NetworkError> {
        self.base
            .join(path)
            .map_err(|e| NetworkError::Decode(format!("invalid endpoint {}: {}", path, e)))
    }

    async fn send_json<T, F>(&self, label: &str, build: F) -> Result<T, NetworkError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        with_retry(&self.retry, label, || execute::<T>(build())).await
    }
}

async fn execute<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, NetworkError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        return Err(NetworkError::from_status(status.as_u16(), retry_after, &body));
    }

    let text = response.text().await?;
    let text = if text.trim().is_empty() { "null" } else { text.as_str() };
    serde_json::from_str(text).map_err(|e| NetworkError::Decode(e.to_string()))
}

/// Map a verify-token response onto "synced" or "not registered".
///
/// Only a 404, or a body with `success: false` and no user, means the backend
/// has no record of the uid. Every other failure passes through unchanged so
/// the caller never registers on an auth or transport error.
pub(crate) fn classify_verify(
    result: Result<VerifyTokenResponse, NetworkError>,
    request: &VerifyTokenRequest,
) -> Result<VerifyOutcome, NetworkError> {
    match result {
        Ok(VerifyTokenResponse {
            user: Some(user), ..
        }) => Ok(VerifyOutcome::Synced(user)),
        Ok(VerifyTokenResponse { success: true, .. }) => Ok(VerifyOutcome::Synced(BackendUser {
            firebase_uid: request.firebase_uid.clone(),
            email: request.email.clone(),
            display_name: request.display_name.clone(),
            username: None,
            created_at: None,
            is_verified: false,
        })),
        Ok(VerifyTokenResponse { message, .. }) => {
            log::debug!(
                "verify-token: user not registered ({})",
                message.unwrap_or_default()
            );
            Ok(VerifyOutcome::NotRegistered)
        }
        Err(NetworkError::Rejected { status: 404, .. }) => Ok(VerifyOutcome::NotRegistered),
        Err(err) => Err(err),
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn verify_token(
        &self,
        token: &str,
        request: &VerifyTokenRequest,
    ) -> Result<VerifyOutcome, NetworkError> {
        let url = self.endpoint(VERIFY_TOKEN_PATH)?;
        let result: Result<VerifyTokenResponse, _> = self
            .send_json("verify-token", || {
                self.client.post(url.clone()).bearer_auth(token).json(request)
            })
            .await;

        classify_verify(result, request)
    }

    async fn signup(
        &self,
        token: &str,
        request: &SignupRequest,
    ) -> Result<BackendUser, NetworkError> {
        let url = self.endpoint(SIGNUP_PATH)?;
        let envelope: UserEnvelope = self
            .send_json("signup", || {
                self.client.post(url.clone()).bearer_auth(token).json(request)
            })
            .await?;
        Ok(envelope.user)
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginAck, NetworkError> {
        let url = self.endpoint(LOGIN_PATH)?;
        self.send_json("login", || self.client.post(url.clone()).json(request))
            .await
    }

    async fn me(&self, token: &str) -> Result<BackendUser, NetworkError> {
        let url = self.endpoint(ME_PATH)?;
        let envelope: UserEnvelope = self
            .send_json("me", || self.client.get(url.clone()).bearer_auth(token))
            .await?;
        Ok(envelope.user)
    }

    async fn update_profile(
        &self,
        token: &str,
        request: &UpdateProfileRequest,
    ) -> Result<(), NetworkError> {
        let url = self.endpoint(UPDATE_PROFILE_PATH)?;
        let _: serde_json::Value = self
            .send_json("update-profile", || {
                self.client.post(url.clone()).bearer_auth(token).json(request)
            })
            .await?;
        Ok(())
    }

    async fn list_profiles(&self, token: &str) -> Result<ProfileListResponse, NetworkError> {
        let url = self.endpoint(PROFILES_PATH)?;
        self.send_json("list-profiles", || {
            self.client.get(url.clone()).bearer_auth(token)
        })
        .await
    }

    async fn create_profile(
        &self,
        token: &str,
        request: &CreateProfileRequest<'_>,
    ) -> Result<String, NetworkError> {
        let url = self.endpoint(PROFILES_PATH)?;
        let created: CreateProfileResponse = self
            .send_json("create-profile", || {
                self.client.post(url.clone()).bearer_auth(token).json(request)
            })
            .await?;
        Ok(created.profile_page.page_id)
    }

    async fn search_profiles(
        &self,
        token: &str,
        query: &SearchQuery,
    ) -> Result<SearchResponse<ProfileSummary>, NetworkError> {
        let url = self.endpoint(SEARCH_PROFILES_PATH)?;
        self.send_json("search-profiles", || {
            self.client.get(url.clone()).bearer_auth(token).query(query)
        })
        .await
    }

    async fn search_posts(
        &self,
        token: &str,
        query: &SearchQuery,
    ) -> Result<SearchResponse<PostSummary>, NetworkError> {
        let url = self.endpoint(SEARCH_POSTS_PATH)?;
        self.send_json("search-posts", || {
            self.client.get(url.clone()).bearer_auth(token).query(query)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::new(url::Url::parse(base).unwrap(), RetryPolicy::no_retry())
    }

    #[test]
    fn test_endpoints_join_under_base_path() {
        let backend = client("https://api.cricknet.app/v2/");
        assert_eq!(
            backend.endpoint(VERIFY_TOKEN_PATH).unwrap().as_str(),
            "https://api.cricknet.app/v2/firebase/verify-token"
        );
        assert_eq!(
            backend.endpoint(PROFILES_PATH).unwrap().as_str(),
            "https://api.cricknet.app/v2/api/profiles"
        );
    }

    #[test]
    fn test_from_config_normalises_trailing_slash() {
        let config = Config {
            api_base_url: "http://localhost:5000/backend".to_string(),
            ..Config::default()
        };
        let backend = BackendClient::from_config(&config).unwrap();
        assert_eq!(
            backend.endpoint(ME_PATH).unwrap().as_str(),
            "http://localhost:5000/backend/firebase/me"
        );
    }

    fn verify_request() -> VerifyTokenRequest {
        VerifyTokenRequest {
            id_token: "token".into(),
            firebase_uid: "uid-7".into(),
            email: "smriti@example.com".into(),
            display_name: Some("Smriti".into()),
        }
    }

    fn verify_body(json: &str) -> Result<VerifyTokenResponse, NetworkError> {
        Ok(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_verify_with_user_is_synced() {
        let outcome = classify_verify(
            verify_body(r#"{"success": true, "user": {"firebase_uid": "uid-7", "email": "s@x.com", "username": "smriti_1"}}"#),
            &verify_request(),
        )
        .unwrap();
        let VerifyOutcome::Synced(user) = outcome else {
            panic!("expected synced user");
        };
        assert_eq!(user.username.as_deref(), Some("smriti_1"));
    }

    #[test]
    fn test_verify_success_without_user_echoes_request() {
        let outcome = classify_verify(verify_body(r#"{"success": true}"#), &verify_request()).unwrap();
        let VerifyOutcome::Synced(user) = outcome else {
            panic!("expected synced user");
        };
        assert_eq!(user.firebase_uid, "uid-7");
        assert_eq!(user.email, "smriti@example.com");
        assert_eq!(user.display_name.as_deref(), Some("Smriti"));
    }

    #[test]
    fn test_verify_unsuccessful_without_user_is_not_registered() {
        let outcome = classify_verify(
            verify_body(r#"{"success": false, "message": "User not found"}"#),
            &verify_request(),
        )
        .unwrap();
        assert_eq!(outcome, VerifyOutcome::NotRegistered);
    }

    #[test]
    fn test_verify_404_is_not_registered() {
        let err = NetworkError::from_status(404, None, r#"{"error": "not found"}"#);
        let outcome = classify_verify(Err(err), &verify_request()).unwrap();
        assert_eq!(outcome, VerifyOutcome::NotRegistered);
    }

    #[test]
    fn test_verify_auth_and_transport_errors_pass_through() {
        let unauthorized = NetworkError::from_status(401, None, "invalid token");
        assert_eq!(
            classify_verify(Err(unauthorized.clone()), &verify_request()).unwrap_err(),
            unauthorized
        );

        let unavailable = NetworkError::from_status(503, None, "");
        assert!(classify_verify(Err(unavailable), &verify_request())
            .unwrap_err()
            .is_transient());

        assert_eq!(
            classify_verify(Err(NetworkError::Timeout), &verify_request()).unwrap_err(),
            NetworkError::Timeout
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transient() {
        // Port 9 (discard) on localhost is closed in test environments.
        let backend = client("http://127.0.0.1:9/");
        let err = backend.list_profiles("token").await.unwrap_err();
        assert!(err.is_transient(), "expected transient error, got {err:?}");
    }
}
