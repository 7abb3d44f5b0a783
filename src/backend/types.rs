//! JSON contracts exchanged with the REST backend.

use serde::{Deserialize, Deserializer, Serialize};

use crate::forms::ProfileDraft;

/// The backend's record mirroring a principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendUser {
    #[serde(alias = "uid")]
    pub firebase_uid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "displayName", alias = "full_name")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, alias = "email_verified", alias = "emailVerified")]
    pub is_verified: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyTokenRequest {
    pub id_token: String,
    pub firebase_uid: String,
    pub email: String,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyTokenResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub user: Option<BackendUser>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Result of the verify/sync call.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    Synced(BackendUser),
    /// The backend has no user for this uid.
    NotRegistered,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub firebase_uid: String,
    pub email: String,
    pub id_token: String,
    pub full_name: String,
    pub username: String,
    pub email_verified: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub id_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<BackendUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: BackendUser,
}

/// Partial BackendUser fields pushed from the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateProfileRequest {
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// One entry of the `/api/profiles` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "type", alias = "page_type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, alias = "firebase_uid")]
    pub owner_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileListResponse {
    /// Malformed entries are dropped individually.
    #[serde(default, deserialize_with = "skip_malformed")]
    pub profiles: Vec<ProfileSummary>,
    #[serde(default)]
    pub total: u64,
}

/// Body of `POST /api/profiles`: the full draft plus the owner and page type.
#[derive(Debug, Clone, Serialize)]
pub struct CreateProfileRequest<'a> {
    pub firebase_uid: &'a str,
    #[serde(flatten)]
    pub draft: &'a ProfileDraft,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProfileResponse {
    pub profile_page: CreatedPage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPage {
    #[serde(deserialize_with = "string_or_number")]
    pub page_id: String,
}

/// Pagination block shared by the search endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub has_prev: bool,
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub comments_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(alias = "profiles", alias = "posts")]
    pub results: Vec<T>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Accept ids serialized either as JSON strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Int(i64),
        Uint(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Uint(n) => n.to_string(),
    })
}

/// Decode each array entry on its own, logging and skipping the ones that
/// do not fit `T`.
fn skip_malformed<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let entries = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                log::warn!("Skipping malformed listing entry {}: {}", index, e);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_listing_parses_mixed_ids() {
        let json = r#"{
            "profiles": [
                {"id": 42, "type": "academy", "name": "Shivaji Park Academy",
                 "created_at": "2024-05-01T10:00:00Z", "is_public": true,
                 "city": "Mumbai", "state": "MH", "rating": 4.5},
                {"id": "v-7", "page_type": "venue", "name": "Wankhede Nets"}
            ],
            "total": 2
        }"#;

        let parsed: ProfileListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.total, 2);
        assert_eq!(parsed.profiles[0].id, "42");
        assert_eq!(parsed.profiles[0].kind, "academy");
        assert_eq!(parsed.profiles[0].city.as_deref(), Some("Mumbai"));
        assert!(parsed.profiles[0].extra.contains_key("rating"));
        assert_eq!(parsed.profiles[1].id, "v-7");
        assert_eq!(parsed.profiles[1].kind, "venue");
        assert!(parsed.profiles[1].is_public);
    }

    #[test]
    fn test_malformed_listing_entry_is_skipped() {
        let json = r#"{
            "profiles": [
                {"id": "a1", "type": "academy", "name": "Good Academy"},
                {"id": "v1", "type": "venue", "name": null},
                {"type": "coach", "name": "No Id"},
                {"id": "c1", "type": "community", "name": "Sunday XI"}
            ],
            "total": 4
        }"#;

        let parsed: ProfileListResponse = serde_json::from_str(json).unwrap();
        let ids: Vec<&str> = parsed.profiles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "c1"]);
        assert_eq!(parsed.total, 4);
    }

    #[test]
    fn test_backend_user_aliases() {
        let json = r#"{"uid": "abc", "email": "a@b.com", "displayName": "A B", "email_verified": true}"#;
        let user: BackendUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.firebase_uid, "abc");
        assert_eq!(user.display_name.as_deref(), Some("A B"));
        assert!(user.is_verified);
    }

    #[test]
    fn test_verify_request_uses_camel_display_name() {
        let req = VerifyTokenRequest {
            id_token: "t".into(),
            firebase_uid: "u".into(),
            email: "e@x.com".into(),
            display_name: Some("E".into()),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["displayName"], "E");
        assert_eq!(value["firebase_uid"], "u");
    }

    #[test]
    fn test_search_response_aliases() {
        let json = r#"{
            "posts": [{"id": 1, "content": "Great knock today!"}],
            "pagination": {"page": 1, "per_page": 10, "total": 11, "pages": 2, "has_next": true, "has_prev": false}
        }"#;
        let parsed: SearchResponse<PostSummary> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].id, "1");
        assert!(parsed.pagination.has_next);
        assert_eq!(parsed.pagination.pages, 2);
    }

    #[test]
    fn test_create_response_numeric_page_id() {
        let parsed: CreateProfileResponse =
            serde_json::from_str(r#"{"profile_page": {"page_id": 9}}"#).unwrap();
        assert_eq!(parsed.profile_page.page_id, "9");
    }
}
