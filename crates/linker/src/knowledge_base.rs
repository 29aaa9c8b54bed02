//! The remote knowledge-base seam

use crate::FetchError;
use async_trait::async_trait;
use geolink_core::{Candidate, EntityId, SearchTerm, TypeSet};

/// Remote operations the linker needs. [`crate::WikidataClient`] talks to the
/// public services; tests plug in an in-memory implementation.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Geographic matches for `term` in `language` labels with their
    /// sitelink counts. Disambiguation pages and items without coordinates
    /// are already filtered out. Order and length are not guaranteed.
    async fn search_places(
        &self,
        term: &SearchTerm,
        language: &str,
    ) -> Result<Vec<Candidate>, FetchError>;

    /// The instance-of (P31) types of one item
    async fn instance_of(&self, id: &EntityId, language: &str) -> Result<TypeSet, FetchError>;

    /// True when every backing service answers
    async fn health(&self) -> Result<bool, FetchError>;
}
