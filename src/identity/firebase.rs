//! Firebase Authentication over its public REST API.
//!
//! Uses reqwest against the Identity Toolkit (`accounts:*`) and Secure Token
//! (`/v1/token`) endpoints. When an emulator host is configured, both are
//! routed through it. Sign-in calls are never retried automatically.

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::store::SessionStore;
use super::{IdentityProvider, Principal, ProviderSession};
use crate::config::FirebaseConfig;
use crate::error::{AuthError, NetworkError};

const IDENTITY_TOOLKIT_HOST: &str = "https://identitytoolkit.googleapis.com";
const SECURE_TOKEN_HOST: &str = "https://securetoken.googleapis.com";
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Response shared by `accounts:signInWithPassword` and `accounts:signUp`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

/// Response of the Secure Token API refresh grant (snake_case, unlike the rest).
#[derive(Debug, Clone, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

pub struct FirebaseAuthProvider {
    client: reqwest::Client,
    api_key: String,
    identity_base: String,
    token_url: String,
    store: Option<SessionStore>,
}

impl FirebaseAuthProvider {
    pub fn new(config: &FirebaseConfig, store: Option<SessionStore>) -> Self {
        let (identity_host, token_host) = match config.emulator_host.as_deref() {
            Some(host) => (
                format!("http://{}/identitytoolkit.googleapis.com", host),
                format!("http://{}/securetoken.googleapis.com", host),
            ),
            None => (
                IDENTITY_TOOLKIT_HOST.to_string(),
                SECURE_TOKEN_HOST.to_string(),
            ),
        };
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            identity_base: format!("{}/v1", identity_host),
            token_url: format!("{}/v1/token", token_host),
            store,
        }
    }

    fn accounts_url(&self, method: &str) -> String {
        format!(
            "{}/accounts:{}?key={}",
            self.identity_base, method, self.api_key
        )
    }

    fn refresh_url(&self) -> String {
        format!("{}?key={}", self.token_url, self.api_key)
    }

    async fn post_accounts<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, AuthError> {
        let resp = self
            .client
            .post(self.accounts_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::from(NetworkError::from(e)))?;
        read_response(resp).await
    }

    /// Best-effort account lookup for the fields sign-in responses omit.
    async fn lookup(&self, id_token: &str) -> Option<LookupUser> {
        let body = serde_json::json!({ "idToken": id_token });
        match self.post_accounts::<LookupResponse>("lookup", &body).await {
            Ok(resp) => resp.users.into_iter().next(),
            Err(e) => {
                log::debug!("firebase lookup failed: {}", e);
                None
            }
        }
    }

    async fn complete_session(&self, account: AccountResponse) -> ProviderSession {
        let mut session = session_from_account(account);
        if let Some(user) = self.lookup(&session.id_token).await {
            if user.local_id == session.principal.uid {
                session.principal.email_verified = user.email_verified;
                if session.principal.display_name.is_none() {
                    session.principal.display_name = user.display_name;
                }
                if session.principal.email.is_empty() {
                    session.principal.email = user.email;
                }
            }
        }
        self.persist(&session);
        session
    }

    fn persist(&self, session: &ProviderSession) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(session) {
                log::warn!("Failed to cache session at {}: {}", store.path().display(), e);
            }
        }
    }
}

async fn read_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, AuthError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| AuthError::from(NetworkError::from(e)))?;
    if !status.is_success() {
        return Err(map_provider_error(status.as_u16(), &body));
    }
    serde_json::from_str(&body).map_err(|e| AuthError::Unknown(format!("bad response: {}", e)))
}

fn expiry_from(expires_in: Option<&str>) -> chrono::DateTime<Utc> {
    let secs = expires_in
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    Utc::now() + chrono::Duration::seconds(secs)
}

fn session_from_account(account: AccountResponse) -> ProviderSession {
    ProviderSession {
        expires_at: expiry_from(account.expires_in.as_deref()),
        principal: Principal {
            uid: account.local_id,
            email: account.email,
            display_name: account.display_name.filter(|n| !n.trim().is_empty()),
            email_verified: false,
        },
        id_token: account.id_token,
        refresh_token: account.refresh_token,
    }
}

/// Map a provider error body (`{"error": {"message": "EMAIL_EXISTS"}}`) to an [`AuthError`].
fn map_provider_error(status: u16, body: &str) -> AuthError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str().map(str::to_string))
        })
        .unwrap_or_default();
    // Codes may carry a detail suffix: "WEAK_PASSWORD : Password should be at least 6 characters"
    let code = message
        .split(|c: char| c == ' ' || c == ':')
        .next()
        .unwrap_or("")
        .to_uppercase();

    match code.as_str() {
        "EMAIL_NOT_FOUND"
        | "INVALID_PASSWORD"
        | "INVALID_LOGIN_CREDENTIALS"
        | "INVALID_EMAIL"
        | "USER_DISABLED"
        | "MISSING_PASSWORD" => AuthError::InvalidCredentials,
        "EMAIL_EXISTS" => AuthError::EmailInUse,
        "WEAK_PASSWORD" => AuthError::WeakCredential,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::RateLimited,
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" | "INVALID_ID_TOKEN" => {
            AuthError::SessionExpired
        }
        _ if status == 429 => AuthError::RateLimited,
        _ if message.is_empty() => AuthError::Unknown(format!("HTTP {}: {}", status, body.trim())),
        _ => AuthError::Unknown(message),
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuthProvider {
    async fn restore_session(&self) -> Option<ProviderSession> {
        let store = self.store.as_ref()?;
        let cached = match store.load() {
            Ok(cached) => cached?,
            Err(e) => {
                log::warn!("Ignoring unreadable cached session: {}", e);
                return None;
            }
        };

        if !cached.is_expired() {
            return Some(cached);
        }

        match self.refresh(&cached).await {
            Ok(refreshed) => Some(refreshed),
            Err(AuthError::SessionExpired) | Err(AuthError::InvalidCredentials) => {
                log::info!("Cached session for {} is no longer valid", cached.principal.uid);
                let _ = store.delete();
                None
            }
            Err(e) => {
                // Offline: keep the principal, the token is refreshed on demand later.
                log::warn!("Could not refresh cached session: {}", e);
                Some(cached)
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderSession, AuthError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let account: AccountResponse = self.post_accounts("signInWithPassword", &body).await?;
        log::info!("Signed in as {}", account.local_id);
        Ok(self.complete_session(account).await)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderSession, AuthError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let account: AccountResponse = self.post_accounts("signUp", &body).await?;
        log::info!("Created identity {}", account.local_id);
        Ok(self.complete_session(account).await)
    }

    async fn refresh(&self, session: &ProviderSession) -> Result<ProviderSession, AuthError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", session.refresh_token.as_str()),
        ];
        let resp = self
            .client
            .post(self.refresh_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::from(NetworkError::from(e)))?;
        let refreshed: RefreshResponse = read_response(resp).await?;

        if let Some(user_id) = refreshed.user_id.as_deref() {
            if user_id != session.principal.uid {
                return Err(AuthError::SessionExpired);
            }
        }

        let updated = ProviderSession {
            principal: session.principal.clone(),
            id_token: refreshed.id_token,
            refresh_token: refreshed.refresh_token,
            expires_at: expiry_from(refreshed.expires_in.as_deref()),
        };
        self.persist(&updated);
        Ok(updated)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let body = serde_json::json!({
            "requestType": "PASSWORD_RESET",
            "email": email,
        });
        let _: serde_json::Value = self.post_accounts("sendOobCode", &body).await?;
        Ok(())
    }

    async fn sign_out(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.delete() {
                log::warn!("Failed to remove cached session: {}", e);
            }
        }
    }
}
