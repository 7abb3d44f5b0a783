//! Profile and post search over `/search/*`.

use std::sync::Arc;

use crate::backend::{Backend, PostSummary, ProfileSummary, SearchQuery, SearchResponse};
use crate::error::{AuthError, NetworkError};
use crate::identity::SessionManager;
use crate::profiles::ProfileType;

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl SearchQuery {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into().trim().to_string(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            profile_type: None,
        }
    }

    pub fn of_type(mut self, profile_type: ProfileType) -> Self {
        self.profile_type = Some(profile_type.to_string());
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, MAX_PER_PAGE);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// The query for the following page, if the response says there is one.
    pub fn next_page<T>(&self, response: &SearchResponse<T>) -> Option<SearchQuery> {
        response.pagination.has_next.then(|| SearchQuery {
            page: response.pagination.page.max(self.page) + 1,
            ..self.clone()
        })
    }
}

pub struct SearchService {
    session: Arc<SessionManager>,
    backend: Arc<dyn Backend>,
}

impl SearchService {
    pub fn new(session: Arc<SessionManager>, backend: Arc<dyn Backend>) -> Self {
        Self { session, backend }
    }

    pub async fn search_profiles(
        &self,
        query: &SearchQuery,
    ) -> Result<SearchResponse<ProfileSummary>, SearchError> {
        let token = self.session.fresh_token().await?;
        log::debug!("Searching profiles for {:?} (page {})", query.q, query.page);
        Ok(self.backend.search_profiles(&token, query).await?)
    }

    pub async fn search_posts(
        &self,
        query: &SearchQuery,
    ) -> Result<SearchResponse<PostSummary>, SearchError> {
        let token = self.session.fresh_token().await?;
        log::debug!("Searching posts for {:?} (page {})", query.q, query.page);
        Ok(self.backend.search_posts(&token, query).await?)
    }
}
