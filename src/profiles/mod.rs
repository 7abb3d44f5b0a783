//! Profiles a principal can act as.
//!
//! One synthetic personal profile derived from the principal, plus any
//! number of page profiles persisted by the backend. Username, avatar glyph
//! and color token are derived, never stored.

pub mod registry;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::ProfileSummary;
use crate::identity::Principal;
use crate::util::{avatar_glyph, slugify};

pub use registry::ProfileRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    Player,
    Coach,
    Venue,
    Academy,
    Community,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown profile type: {0}")]
pub struct UnknownProfileType(pub String);

impl ProfileType {
    pub const ALL: [ProfileType; 5] = [
        ProfileType::Player,
        ProfileType::Coach,
        ProfileType::Venue,
        ProfileType::Academy,
        ProfileType::Community,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileType::Player => "player",
            ProfileType::Coach => "coach",
            ProfileType::Venue => "venue",
            ProfileType::Academy => "academy",
            ProfileType::Community => "community",
        }
    }

    pub fn color_token(&self) -> &'static str {
        match self {
            ProfileType::Player => "blue",
            ProfileType::Coach => "green",
            ProfileType::Venue => "orange",
            ProfileType::Academy => "purple",
            ProfileType::Community => "teal",
        }
    }
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileType {
    type Err = UnknownProfileType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ProfileType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| UnknownProfileType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    #[serde(rename = "type")]
    pub profile_type: ProfileType,
    pub name: String,
    pub username: String,
    pub avatar: String,
    pub is_public: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub owner_id: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub is_personal: bool,
    pub is_active: bool,
}

impl Profile {
    /// The synthetic personal profile. Its id is the principal's id.
    pub fn personal(principal: &Principal) -> Self {
        let name = principal.preferred_name();
        Self {
            id: principal.uid.clone(),
            profile_type: ProfileType::Player,
            username: slugify(&name),
            avatar: avatar_glyph(&name),
            name,
            is_public: true,
            created_at: None,
            owner_id: principal.uid.clone(),
            city: None,
            state: None,
            is_personal: true,
            is_active: true,
        }
    }

    /// Build a page profile from a listing entry. Unknown types are rejected.
    pub fn from_summary(
        summary: &ProfileSummary,
        owner_id: &str,
    ) -> Result<Self, UnknownProfileType> {
        let profile_type = summary.kind.parse::<ProfileType>()?;
        Ok(Self::page(
            summary.id.clone(),
            profile_type,
            &summary.name,
            summary.is_public,
            summary.created_at.as_deref().and_then(parse_timestamp),
            summary.owner_id.clone().unwrap_or_else(|| owner_id.to_string()),
            summary.city.clone().filter(|c| !c.trim().is_empty()),
            summary.state.clone().filter(|s| !s.trim().is_empty()),
        ))
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn page(
        id: String,
        profile_type: ProfileType,
        name: &str,
        is_public: bool,
        created_at: Option<DateTime<Utc>>,
        owner_id: String,
        city: Option<String>,
        state: Option<String>,
    ) -> Self {
        let name = name.trim().to_string();
        Self {
            id,
            profile_type,
            username: slugify(&name),
            avatar: avatar_glyph(&name),
            name,
            is_public,
            created_at,
            owner_id,
            city,
            state,
            is_personal: false,
            is_active: false,
        }
    }

    pub fn color_token(&self) -> &'static str {
        self.profile_type.color_token()
    }
}

/// Backend timestamps arrive as RFC 3339 or as naive `YYYY-MM-DD HH:MM:SS` (UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
