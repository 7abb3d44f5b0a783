//! Profile Registry.
//!
//! Holds the profiles of the current principal and the single active
//! selection. Loads always yield at least the personal profile: a failed
//! fetch degrades to `[personal]` instead of erroring. Switching the active
//! profile is local and never calls the backend.
//!
//! Every load is stamped with a generation and the owning principal. A
//! response that arrives after a newer load, a reset, or a principal change
//! is dropped without touching the registry.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use super::Profile;
use crate::backend::{Backend, CreateProfileRequest};
use crate::error::ProfileError;
use crate::forms::ProfileDraft;
use crate::identity::{Principal, SessionManager};

#[derive(Default)]
struct RegistryState {
    owner: Option<String>,
    profiles: Vec<Profile>,
    generation: u64,
}

impl RegistryState {
    fn is_owned_by(&self, uid: &str) -> bool {
        self.owner.as_deref() == Some(uid)
    }

    /// Make sure the registry belongs to `principal`, starting from the
    /// personal profile if it held someone else's (or nothing).
    fn seed(&mut self, principal: &Principal) {
        if !self.is_owned_by(&principal.uid) {
            self.owner = Some(principal.uid.clone());
            self.profiles = vec![Profile::personal(principal)];
        }
    }
}

pub struct ProfileRegistry {
    session: Arc<SessionManager>,
    backend: Arc<dyn Backend>,
    state: Mutex<RegistryState>,
}

impl ProfileRegistry {
    pub fn new(session: Arc<SessionManager>, backend: Arc<dyn Backend>) -> Self {
        Self {
            session,
            backend,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Fetch page profiles and rebuild the registry behind the personal profile.
    ///
    /// The personal profile is index 0 and active. Page profiles keep the
    /// backend's order; duplicate ids keep their first occurrence.
    pub async fn load_profiles(&self) -> Result<Vec<Profile>, ProfileError> {
        let principal = self.session.resolve().await.ok_or(ProfileError::NotSignedIn)?;
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.generation
        };

        let pages = self.fetch_pages(&principal).await;

        let personal = Profile::personal(&principal);
        let mut seen: HashSet<String> = HashSet::from([personal.id.clone()]);
        let mut profiles = Vec::with_capacity(pages.len() + 1);
        profiles.push(personal);
        for page in pages {
            if seen.insert(page.id.clone()) {
                profiles.push(page);
            } else {
                log::debug!("Dropping duplicate profile id {}", page.id);
            }
        }

        let still_current = self
            .session
            .current_principal()
            .is_some_and(|p| p.uid == principal.uid);
        if !still_current {
            log::info!("Discarding profile load for {}: session changed", principal.uid);
            return Err(ProfileError::NotSignedIn);
        }

        let mut state = self.state.lock();
        if state.generation != generation {
            log::debug!("Discarding stale profile load (generation {})", generation);
            return Ok(profiles);
        }
        state.owner = Some(principal.uid.clone());
        state.profiles = profiles.clone();
        log::info!(
            "Loaded {} profiles for {}",
            profiles.len(),
            principal.uid
        );
        Ok(profiles)
    }

    async fn fetch_pages(&self, principal: &Principal) -> Vec<Profile> {
        let token = match self.session.fresh_token().await {
            Ok(token) => token,
            Err(e) => {
                log::warn!("Skipping profile fetch, no credential: {}", e);
                return Vec::new();
            }
        };
        let listing = match self.backend.list_profiles(&token).await {
            Ok(listing) => listing,
            Err(e) => {
                log::warn!("Profile fetch failed, continuing with personal profile: {}", e);
                return Vec::new();
            }
        };
        listing
            .profiles
            .iter()
            .filter_map(|summary| match Profile::from_summary(summary, &principal.uid) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    log::warn!("Skipping profile {}: {}", summary.id, e);
                    None
                }
            })
            .collect()
    }

    /// Submit a draft. On success the new profile is appended, inactive.
    /// On failure the registry is untouched.
    pub async fn create_profile(&self, draft: ProfileDraft) -> Result<Profile, ProfileError> {
        let principal = self.session.resolve().await.ok_or(ProfileError::NotSignedIn)?;
        draft.validate().map_err(ProfileError::Validation)?;

        let token = self.session.fresh_token().await?;
        let request = CreateProfileRequest {
            firebase_uid: &principal.uid,
            draft: &draft,
        };
        let page_id = self.backend.create_profile(&token, &request).await?;

        let profile = Profile::page(
            page_id,
            draft.profile_type(),
            draft.name(),
            draft.is_public(),
            Some(Utc::now()),
            principal.uid.clone(),
            draft.city().map(str::to_string),
            draft.state().map(str::to_string),
        );
        log::info!(
            "Created {} profile {} ({})",
            profile.profile_type,
            profile.id,
            profile.name
        );

        let still_current = self
            .session
            .current_principal()
            .is_some_and(|p| p.uid == principal.uid);
        if still_current {
            let mut state = self.state.lock();
            state.seed(&principal);
            if !state.profiles.iter().any(|p| p.id == profile.id) {
                state.profiles.push(profile.clone());
            }
        }
        Ok(profile)
    }

    /// Select the profile to act as. Exactly one profile is active afterwards.
    pub fn set_active(&self, profile_id: &str) -> Result<Profile, ProfileError> {
        let principal = self
            .session
            .current_principal()
            .ok_or(ProfileError::NotSignedIn)?;
        let mut state = self.state.lock();
        state.seed(&principal);
        if !state.profiles.iter().any(|p| p.id == profile_id) {
            return Err(ProfileError::NotFound(profile_id.to_string()));
        }
        let mut selected = None;
        for profile in state.profiles.iter_mut() {
            profile.is_active = profile.id == profile_id;
            if profile.is_active {
                selected = Some(profile.clone());
            }
        }
        selected.ok_or_else(|| ProfileError::NotFound(profile_id.to_string()))
    }

    /// The active profile, defaulting to the personal one.
    pub fn get_active(&self) -> Option<Profile> {
        let principal = self.session.current_principal()?;
        let state = self.state.lock();
        if !state.is_owned_by(&principal.uid) {
            return Some(Profile::personal(&principal));
        }
        state
            .profiles
            .iter()
            .find(|p| p.is_active)
            .or_else(|| state.profiles.first())
            .cloned()
            .or_else(|| Some(Profile::personal(&principal)))
    }

    pub fn profiles(&self) -> Vec<Profile> {
        let Some(principal) = self.session.current_principal() else {
            return Vec::new();
        };
        let state = self.state.lock();
        if state.is_owned_by(&principal.uid) {
            state.profiles.clone()
        } else {
            vec![Profile::personal(&principal)]
        }
    }

    pub fn get(&self, profile_id: &str) -> Option<Profile> {
        self.profiles().into_iter().find(|p| p.id == profile_id)
    }

    /// Forget everything. In-flight loads are invalidated.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.owner = None;
        state.profiles.clear();
        state.generation += 1;
    }
}
