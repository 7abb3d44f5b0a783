//! Per-type page drafts.
//!
//! Each creatable page type has its own draft struct. [`ProfileDraft`] is the
//! tagged union sent to `POST /api/profiles`, tagged by `page_type`.
//! Personal (player) profiles are derived from the principal and are never
//! created through a draft.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use super::ValidationErrors;
use crate::profiles::ProfileType;

const EARLIEST_ESTABLISHED_YEAR: i32 = 1800;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactInfo {
    pub email: String,
    pub phone: String,
    pub website: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub pincode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialHandles {
    pub instagram: String,
    pub facebook: String,
    pub twitter: String,
    pub youtube: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchTiming {
    pub label: String,
    pub days: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Visibility {
    pub is_public: bool,
    pub allow_messages: bool,
    pub show_contact: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            is_public: true,
            allow_messages: true,
            show_contact: false,
        }
    }
}

fn check_contact(errors: &mut ValidationErrors, contact: &ContactInfo, required: bool) {
    if required {
        errors.require("contact.email", "Email", &contact.email);
        errors.require("contact.phone", "Phone", &contact.phone);
    }
    errors.check_email("contact.email", &contact.email);
    errors.check_phone("contact.phone", &contact.phone);
}

fn check_timings(errors: &mut ValidationErrors, timings: &[BatchTiming]) {
    for (i, timing) in timings.iter().enumerate() {
        if timing.start_time.trim().is_empty() || timing.end_time.trim().is_empty() {
            errors.push(
                &format!("batch_timings.{}", i),
                "Batch timing needs a start and end time",
            );
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcademyDraft {
    pub name: String,
    pub description: String,
    pub established_year: Option<i32>,
    pub contact: ContactInfo,
    pub location: Location,
    pub facilities: Vec<String>,
    pub services: Vec<String>,
    pub programs: Vec<String>,
    pub batch_timings: Vec<BatchTiming>,
    pub social: SocialHandles,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachDraft {
    pub name: String,
    pub bio: String,
    pub specialization: String,
    pub experience_years: Option<u32>,
    pub certifications: Vec<String>,
    pub services: Vec<String>,
    pub fee_per_session: Option<u32>,
    pub contact: ContactInfo,
    pub location: Location,
    pub social: SocialHandles,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueDraft {
    pub name: String,
    pub description: String,
    pub venue_type: String,
    pub pitch_type: String,
    pub capacity: Option<u32>,
    pub facilities: Vec<String>,
    pub services: Vec<String>,
    pub booking_fee: Option<u32>,
    pub contact: ContactInfo,
    pub location: Location,
    pub social: SocialHandles,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityDraft {
    pub name: String,
    pub description: String,
    pub focus: String,
    pub rules: String,
    pub tags: Vec<String>,
    pub contact: ContactInfo,
    pub location: Location,
    pub social: SocialHandles,
    pub visibility: Visibility,
}

/// A draft for one page type: its wizard steps and its validation rules.
pub trait DraftSchema: Default + Clone + Into<ProfileDraft> {
    const PROFILE_TYPE: ProfileType;
    const STEPS: &'static [&'static str];

    fn name(&self) -> &str;

    /// Collect every violation; never stops at the first.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

impl DraftSchema for AcademyDraft {
    const PROFILE_TYPE: ProfileType = ProfileType::Academy;
    const STEPS: &'static [&'static str] = &[
        "Basic info",
        "Contact & location",
        "Facilities & services",
        "Social & settings",
    ];

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("name", "Academy name", &self.name);
        check_contact(&mut errors, &self.contact, true);
        errors.require("location.city", "City", &self.location.city);
        errors.require("location.state", "State", &self.location.state);
        if let Some(year) = self.established_year {
            let current = chrono::Utc::now().year();
            if !(EARLIEST_ESTABLISHED_YEAR..=current).contains(&year) {
                errors.push("established_year", "Enter a valid year");
            }
        }
        check_timings(&mut errors, &self.batch_timings);
        errors.into_result()
    }
}

impl DraftSchema for CoachDraft {
    const PROFILE_TYPE: ProfileType = ProfileType::Coach;
    const STEPS: &'static [&'static str] = &[
        "Basic info",
        "Experience & certifications",
        "Contact & location",
        "Social & settings",
    ];

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("name", "Coach name", &self.name);
        errors.require("specialization", "Specialization", &self.specialization);
        check_contact(&mut errors, &self.contact, true);
        errors.require("location.city", "City", &self.location.city);
        errors.into_result()
    }
}

impl DraftSchema for VenueDraft {
    const PROFILE_TYPE: ProfileType = ProfileType::Venue;
    const STEPS: &'static [&'static str] = &[
        "Basic info",
        "Location",
        "Facilities & pricing",
        "Contact & settings",
    ];

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("name", "Venue name", &self.name);
        errors.require("venue_type", "Venue type", &self.venue_type);
        errors.require("location.address", "Address", &self.location.address);
        errors.require("location.city", "City", &self.location.city);
        errors.require("contact.phone", "Phone", &self.contact.phone);
        errors.check_email("contact.email", &self.contact.email);
        errors.check_phone("contact.phone", &self.contact.phone);
        if self.capacity == Some(0) {
            errors.push("capacity", "Capacity must be greater than zero");
        }
        errors.into_result()
    }
}

impl DraftSchema for CommunityDraft {
    const PROFILE_TYPE: ProfileType = ProfileType::Community;
    const STEPS: &'static [&'static str] = &["Basic info", "Details", "Social & settings"];

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("name", "Community name", &self.name);
        errors.require("description", "Description", &self.description);
        check_contact(&mut errors, &self.contact, false);
        errors.into_result()
    }
}

/// A creation submission for any page type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "page_type", rename_all = "lowercase")]
pub enum ProfileDraft {
    Academy(AcademyDraft),
    Coach(CoachDraft),
    Venue(VenueDraft),
    Community(CommunityDraft),
}

impl ProfileDraft {
    pub fn profile_type(&self) -> ProfileType {
        match self {
            ProfileDraft::Academy(_) => ProfileType::Academy,
            ProfileDraft::Coach(_) => ProfileType::Coach,
            ProfileDraft::Venue(_) => ProfileType::Venue,
            ProfileDraft::Community(_) => ProfileType::Community,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ProfileDraft::Academy(d) => d.name(),
            ProfileDraft::Coach(d) => d.name(),
            ProfileDraft::Venue(d) => d.name(),
            ProfileDraft::Community(d) => d.name(),
        }
    }

    fn visibility(&self) -> &Visibility {
        match self {
            ProfileDraft::Academy(d) => &d.visibility,
            ProfileDraft::Coach(d) => &d.visibility,
            ProfileDraft::Venue(d) => &d.visibility,
            ProfileDraft::Community(d) => &d.visibility,
        }
    }

    fn location(&self) -> &Location {
        match self {
            ProfileDraft::Academy(d) => &d.location,
            ProfileDraft::Coach(d) => &d.location,
            ProfileDraft::Venue(d) => &d.location,
            ProfileDraft::Community(d) => &d.location,
        }
    }

    pub fn is_public(&self) -> bool {
        self.visibility().is_public
    }

    pub fn city(&self) -> Option<&str> {
        Some(self.location().city.trim()).filter(|c| !c.is_empty())
    }

    pub fn state(&self) -> Option<&str> {
        Some(self.location().state.trim()).filter(|s| !s.is_empty())
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            ProfileDraft::Academy(d) => d.validate(),
            ProfileDraft::Coach(d) => d.validate(),
            ProfileDraft::Venue(d) => d.validate(),
            ProfileDraft::Community(d) => d.validate(),
        }
    }
}

impl From<AcademyDraft> for ProfileDraft {
    fn from(draft: AcademyDraft) -> Self {
        ProfileDraft::Academy(draft)
    }
}

impl From<CoachDraft> for ProfileDraft {
    fn from(draft: CoachDraft) -> Self {
        ProfileDraft::Coach(draft)
    }
}

impl From<VenueDraft> for ProfileDraft {
    fn from(draft: VenueDraft) -> Self {
        ProfileDraft::Venue(draft)
    }
}

impl From<CommunityDraft> for ProfileDraft {
    fn from(draft: CommunityDraft) -> Self {
        ProfileDraft::Community(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::parse_list;

    fn valid_academy() -> AcademyDraft {
        AcademyDraft {
            name: "Shivaji Park Cricket Academy".into(),
            contact: ContactInfo {
                email: "hello@spca.in".into(),
                phone: "+919876543210".into(),
                ..Default::default()
            },
            location: Location {
                city: "Mumbai".into(),
                state: "Maharashtra".into(),
                ..Default::default()
            },
            facilities: parse_list("turf wickets, indoor nets, bowling machine"),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_academy_reports_every_required_field() {
        let errors = AcademyDraft::default().validate().unwrap_err();
        let fields: Vec<&str> = errors.fields().collect();
        assert_eq!(
            fields,
            vec![
                "name",
                "contact.email",
                "contact.phone",
                "location.city",
                "location.state"
            ]
        );
    }

    #[test]
    fn test_empty_forms_fail_for_every_type() {
        assert!(CoachDraft::default().validate().unwrap_err().len() >= 4);
        assert!(VenueDraft::default().validate().unwrap_err().len() >= 5);
        let community = CommunityDraft::default().validate().unwrap_err();
        assert!(community.contains("name"));
        assert!(community.contains("description"));
    }

    #[test]
    fn test_valid_academy_passes() {
        assert_eq!(valid_academy().validate(), Ok(()));
    }

    #[test]
    fn test_format_errors_reported_together() {
        let mut draft = valid_academy();
        draft.contact.email = "a@b".into();
        draft.contact.phone = "abc".into();
        draft.established_year = Some(1200);
        let errors = draft.validate().unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["contact.email", "contact.phone", "established_year"]
        );
    }

    #[test]
    fn test_draft_serializes_with_page_type_tag() {
        let draft: ProfileDraft = valid_academy().into();
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["page_type"], "academy");
        assert_eq!(value["name"], "Shivaji Park Cricket Academy");
        assert_eq!(value["facilities"][1], "indoor nets");
        assert_eq!(value["visibility"]["is_public"], true);

        let back: ProfileDraft = serde_json::from_value(value).unwrap();
        assert_eq!(back.profile_type(), ProfileType::Academy);
        assert_eq!(back.city(), Some("Mumbai"));
    }

    #[test]
    fn test_partial_draft_file_deserializes() {
        let draft: ProfileDraft = serde_json::from_str(
            r#"{"page_type": "community", "name": "Sunday Tennis Ball League", "description": "Weekend games"}"#,
        )
        .unwrap();
        assert_eq!(draft.profile_type(), ProfileType::Community);
        assert!(draft.is_public());
        assert_eq!(draft.validate(), Ok(()));
    }

    #[test]
    fn test_player_draft_is_rejected() {
        let parsed = serde_json::from_str::<ProfileDraft>(r#"{"page_type": "player", "name": "Me"}"#);
        assert!(parsed.is_err());
    }
}
