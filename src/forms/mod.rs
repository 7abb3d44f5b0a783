//! Profile creation forms.
//!
//! Modules:
//! - schema: one draft struct per page type, unified under [`ProfileDraft`]
//! - wizard: the multi-step orchestrator driving a single submission
//!
//! Validation runs once, at submission, and collects every violation.

pub mod schema;
pub mod wizard;

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

pub use crate::util::{join_list, parse_list};
pub use schema::{
    AcademyDraft, BatchTiming, CoachDraft, CommunityDraft, ContactInfo, DraftSchema, Location,
    ProfileDraft, SocialHandles, VenueDraft, Visibility,
};
pub use wizard::FormWizard;

const MAX_PHONE_DIGITS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every violation found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.field.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Required-field presence. Whitespace-only counts as missing.
    pub fn require(&mut self, field: &str, label: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, format!("{} is required", label));
        }
    }

    /// Email format, checked only when a value is present.
    pub fn check_email(&mut self, field: &str, value: &str) {
        let value = value.trim();
        if !value.is_empty() && !is_valid_email(value) {
            self.push(field, "Enter a valid email address");
        }
    }

    /// Phone format, checked only when a value is present.
    pub fn check_phone(&mut self, field: &str, value: &str) {
        if !value.trim().is_empty() && !is_valid_phone(value) {
            self.push(field, "Enter a valid phone number");
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?\d+$").unwrap())
}

/// local@domain with a dot somewhere after the `@`.
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email.trim())
}

/// Optional leading `+`, then 1 to 16 digits. Inner spaces are ignored.
pub fn is_valid_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = compact.trim_start_matches('+').len();
    phone_regex().is_match(&compact) && (1..=MAX_PHONE_DIGITS).contains(&digits)
}
