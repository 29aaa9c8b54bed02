//! Candidate resolution - search term to ranked knowledge-base ids

use crate::{FetchError, KnowledgeBase};
use geolink_core::{CandidateSet, SearchTerm};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Turns one search term into up to three ranked geographic candidates
#[derive(Clone)]
pub struct CandidateResolver {
    kb: Arc<dyn KnowledgeBase>,
}

impl CandidateResolver {
    pub fn new(kb: Arc<dyn KnowledgeBase>) -> Self {
        Self { kb }
    }

    /// `Ok(None)` means the search found nothing; an `Err` is a failed lookup
    /// the caller decides how to record.
    #[instrument(skip(self, term), fields(term = %term))]
    pub async fn resolve(
        &self,
        term: &SearchTerm,
        language: &str,
    ) -> Result<Option<CandidateSet>, FetchError> {
        let matches = self.kb.search_places(term, language).await?;
        let ranked = CandidateSet::rank(matches);

        match &ranked {
            Some(set) => debug!(
                "Candidates: {}",
                set.ids().map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
            ),
            None => debug!("No geographic match"),
        }

        Ok(ranked)
    }
}
