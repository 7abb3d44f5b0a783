//! Error types for identity, backend sync, and profile operations
//!
//! Errors are classified by recoverability:
//! - Retryable: network failures, timeouts, rate limits, transient server faults
//! - NonRetryable: rejected requests, validation failures
//! - RequiresUserAction: bad credentials, signed-out session

use thiserror::Error;

use crate::forms::ValidationErrors;

/// Transport-level failure, attached as the cause of the higher-level errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    // Retryable errors
    #[error("Network unavailable: {0}")]
    Unavailable(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited by server")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    // Non-retryable errors
    #[error("Request rejected {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl NetworkError {
    /// Returns true if the failure is worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            NetworkError::Unavailable(_)
                | NetworkError::Timeout
                | NetworkError::RateLimited { .. }
                | NetworkError::Server { .. }
        )
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, retry_after_secs: Option<u64>, body: &str) -> Self {
        let message = extract_message(body);
        match status {
            408 => NetworkError::Timeout,
            429 => NetworkError::RateLimited { retry_after_secs },
            500..=599 => NetworkError::Server { status, message },
            _ => NetworkError::Rejected { status, message },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::Server { status, .. } | NetworkError::Rejected { status, .. } => {
                Some(*status)
            }
            NetworkError::RateLimited { .. } => Some(429),
            NetworkError::Timeout => Some(408),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout
        } else if err.is_decode() {
            NetworkError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            NetworkError::from_status(status.as_u16(), None, &err.to_string())
        } else {
            NetworkError::Unavailable(err.to_string())
        }
    }
}

/// Pull a human-readable message out of a JSON error body, falling back to the raw text.
fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error", "detail"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) => return s.clone(),
                Some(serde_json::Value::Object(obj)) => {
                    if let Some(serde_json::Value::String(s)) = obj.get("message") {
                        return s.clone();
                    }
                }
                _ => {}
            }
        }
    }
    body.trim().to_string()
}

/// Identity provider failures. Surfaced inline to the sign-in / sign-up forms.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account already exists for this email")]
    EmailInUse,

    #[error("Password is too weak")]
    WeakCredential,

    #[error("Too many attempts, try again later")]
    RateLimited,

    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Session expired, sign in again")]
    SessionExpired,

    #[error("Authentication failed: {0}")]
    Unknown(String),
}

impl AuthError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::RateLimited | AuthError::NetworkUnavailable(_))
    }
}

impl From<NetworkError> for AuthError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::RateLimited { .. } => AuthError::RateLimited,
            NetworkError::Unavailable(msg) => AuthError::NetworkUnavailable(msg),
            NetworkError::Timeout => AuthError::NetworkUnavailable("request timed out".into()),
            other => AuthError::Unknown(other.to_string()),
        }
    }
}

/// Backend reconciliation failures. Logged and swallowed by the sync bridge.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("No signed-in user to authenticate the request")]
    NoCredential,

    #[error("User is not registered with the backend")]
    NotRegistered,

    #[error("Backend request failed: {0}")]
    Network(#[from] NetworkError),
}

impl From<AuthError> for SyncError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NetworkUnavailable(msg) => SyncError::Network(NetworkError::Unavailable(msg)),
            _ => SyncError::NoCredential,
        }
    }
}

/// Profile registry and creation failures. Surfaced to the active form.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProfileError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Network error: {0}")]
    Network(NetworkError),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("This form has already been submitted")]
    AlreadySubmitted,
}

impl From<NetworkError> for ProfileError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Rejected {
                status: 400 | 409 | 422,
                message,
            } => ProfileError::Validation(ValidationErrors::single("form", message)),
            NetworkError::Rejected { status, message } => {
                ProfileError::Server(format!("HTTP {}: {}", status, message))
            }
            NetworkError::Server { status, message } => {
                ProfileError::Server(format!("HTTP {}: {}", status, message))
            }
            NetworkError::Decode(msg) => ProfileError::Server(msg),
            other => ProfileError::Network(other),
        }
    }
}

impl From<AuthError> for ProfileError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NetworkUnavailable(msg) => ProfileError::Network(NetworkError::Unavailable(msg)),
            _ => ProfileError::NotSignedIn,
        }
    }
}

impl ProfileError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProfileError::Network(e) if e.is_transient())
    }
}

/// Serializable error representation for UI display
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub message: String,
    pub error_type: ErrorType,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorType {
    Retryable,
    NonRetryable,
    RequiresUserAction,
}

impl From<&AuthError> for ErrorReport {
    fn from(err: &AuthError) -> Self {
        let (error_type, suggestion) = match err {
            AuthError::InvalidCredentials => (
                ErrorType::RequiresUserAction,
                "Check your email and password and try again.",
            ),
            AuthError::EmailInUse => (
                ErrorType::RequiresUserAction,
                "Sign in instead, or reset your password.",
            ),
            AuthError::WeakCredential => (
                ErrorType::RequiresUserAction,
                "Choose a password with at least 6 characters.",
            ),
            AuthError::RateLimited => (ErrorType::Retryable, "Wait a few minutes and try again."),
            AuthError::NetworkUnavailable(_) => (
                ErrorType::Retryable,
                "Check your internet connection and try again.",
            ),
            AuthError::NotSignedIn | AuthError::SessionExpired => {
                (ErrorType::RequiresUserAction, "Sign in to continue.")
            }
            AuthError::Unknown(_) => (ErrorType::NonRetryable, "Try again later."),
        };
        ErrorReport {
            message: err.to_string(),
            error_type,
            can_retry: err.is_retryable(),
            recovery_suggestion: suggestion.to_string(),
        }
    }
}

impl From<&ProfileError> for ErrorReport {
    fn from(err: &ProfileError) -> Self {
        let (error_type, suggestion) = match err {
            ProfileError::Validation(_) => (
                ErrorType::RequiresUserAction,
                "Fix the highlighted fields and submit again.",
            ),
            ProfileError::Network(e) if e.is_transient() => (
                ErrorType::Retryable,
                "Check your internet connection and try again.",
            ),
            ProfileError::Network(_) | ProfileError::Server(_) => {
                (ErrorType::NonRetryable, "Try again later.")
            }
            ProfileError::NotFound(_) => (ErrorType::NonRetryable, "Reload your profiles."),
            ProfileError::NotSignedIn => (ErrorType::RequiresUserAction, "Sign in to continue."),
            ProfileError::AlreadySubmitted => {
                (ErrorType::NonRetryable, "Start a new form to create another page.")
            }
        };
        ErrorReport {
            message: err.to_string(),
            error_type,
            can_retry: err.is_retryable(),
            recovery_suggestion: suggestion.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(NetworkError::from_status(408, None, ""), NetworkError::Timeout);
        assert!(matches!(
            NetworkError::from_status(429, Some(3), ""),
            NetworkError::RateLimited {
                retry_after_secs: Some(3)
            }
        ));
        assert!(NetworkError::from_status(503, None, "down").is_transient());
        assert!(!NetworkError::from_status(400, None, "bad").is_transient());
        assert!(!NetworkError::from_status(401, None, "nope").is_transient());
    }

    #[test]
    fn test_extracts_json_error_message() {
        let err = NetworkError::from_status(400, None, r#"{"error": "name is required"}"#);
        assert_eq!(
            err,
            NetworkError::Rejected {
                status: 400,
                message: "name is required".to_string()
            }
        );

        let nested = NetworkError::from_status(500, None, r#"{"error": {"message": "boom"}}"#);
        assert_eq!(
            nested,
            NetworkError::Server {
                status: 500,
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_profile_error_mapping() {
        let validation: ProfileError = NetworkError::from_status(422, None, "bad pincode").into();
        assert!(matches!(validation, ProfileError::Validation(_)));

        let server: ProfileError = NetworkError::from_status(502, None, "gateway").into();
        assert!(matches!(server, ProfileError::Server(_)));

        let network: ProfileError = NetworkError::Unavailable("dns".into()).into();
        assert!(network.is_retryable());
    }

    #[test]
    fn test_sync_error_from_auth() {
        assert_eq!(SyncError::from(AuthError::NotSignedIn), SyncError::NoCredential);
        assert!(matches!(
            SyncError::from(AuthError::NetworkUnavailable("offline".into())),
            SyncError::Network(NetworkError::Unavailable(_))
        ));
    }

    #[test]
    fn test_error_report_for_auth() {
        let report = ErrorReport::from(&AuthError::RateLimited);
        assert_eq!(report.error_type, ErrorType::Retryable);
        assert!(report.can_retry);

        let report = ErrorReport::from(&AuthError::InvalidCredentials);
        assert_eq!(report.error_type, ErrorType::RequiresUserAction);
        assert!(!report.can_retry);
    }
}
