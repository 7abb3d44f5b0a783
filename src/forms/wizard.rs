//! Multi-step form orchestrator.
//!
//! Step position is local state bounded to `[1, N]`. Moving between steps
//! never validates; the whole draft is validated once on submit, and every
//! violation is reported together. A failed submission keeps the draft; a
//! successful one discards it and closes the wizard.

use super::schema::DraftSchema;
use crate::error::ProfileError;
use crate::profiles::{Profile, ProfileRegistry, ProfileType};

pub struct FormWizard<D: DraftSchema> {
    draft: D,
    current_step: usize,
    submitted: bool,
}

impl<D: DraftSchema> Default for FormWizard<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DraftSchema> FormWizard<D> {
    pub fn new() -> Self {
        Self::with_draft(D::default())
    }

    pub fn with_draft(draft: D) -> Self {
        Self {
            draft,
            current_step: 1,
            submitted: false,
        }
    }

    pub fn profile_type(&self) -> ProfileType {
        D::PROFILE_TYPE
    }

    pub fn total_steps(&self) -> usize {
        D::STEPS.len()
    }

    /// 1-based.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn step_title(&self) -> &'static str {
        D::STEPS
            .get(self.current_step.saturating_sub(1))
            .copied()
            .unwrap_or_default()
    }

    pub fn is_first_step(&self) -> bool {
        self.current_step == 1
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step == self.total_steps()
    }

    pub fn next(&mut self) -> usize {
        self.go_to(self.current_step + 1)
    }

    pub fn previous(&mut self) -> usize {
        self.go_to(self.current_step.saturating_sub(1))
    }

    pub fn go_to(&mut self, step: usize) -> usize {
        self.current_step = step.clamp(1, self.total_steps().max(1));
        self.current_step
    }

    pub fn draft(&self) -> &D {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut D {
        &mut self.draft
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Discard the draft and return to the first step.
    pub fn cancel(&mut self) {
        self.draft = D::default();
        self.current_step = 1;
    }

    /// Validate, then create the profile through the registry.
    ///
    /// `on_complete` runs only after the registry accepted the profile.
    pub async fn submit<F>(
        &mut self,
        registry: &ProfileRegistry,
        on_complete: F,
    ) -> Result<Profile, ProfileError>
    where
        F: FnOnce(&Profile),
    {
        if self.submitted {
            return Err(ProfileError::AlreadySubmitted);
        }
        self.draft.validate().map_err(ProfileError::Validation)?;

        let profile = registry.create_profile(self.draft.clone().into()).await?;

        self.submitted = true;
        self.draft = D::default();
        self.current_step = 1;
        on_complete(&profile);
        Ok(profile)
    }
}
