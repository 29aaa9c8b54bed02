//! Instance-of lookups for candidate ids

use crate::{FetchError, KnowledgeBase};
use geolink_core::{EntityId, TypeSet};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Fetches the instance-of types of one item per request
#[derive(Clone)]
pub struct PropertyFetcher {
    kb: Arc<dyn KnowledgeBase>,
}

impl PropertyFetcher {
    pub fn new(kb: Arc<dyn KnowledgeBase>) -> Self {
        Self { kb }
    }

    #[instrument(skip(self, id), fields(id = %id))]
    pub async fn fetch_types(&self, id: &EntityId, language: &str) -> Result<TypeSet, FetchError> {
        let types = self.kb.instance_of(id, language).await?;
        debug!("{} instance-of types", types.len());
        Ok(types)
    }
}
