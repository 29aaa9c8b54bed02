//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use geolink_core::{Candidate, EntityId, SearchTerm, TypeSet};
use geolink_linker::{FetchError, KnowledgeBase, LinkagePipeline, PipelineConfig};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn id(s: &str) -> EntityId {
    s.parse().expect("valid entity id")
}

/// In-memory knowledge base with call counting
#[derive(Default)]
pub struct MockKnowledgeBase {
    places: HashMap<String, Vec<Candidate>>,
    types: HashMap<EntityId, TypeSet>,
    failing_terms: Vec<String>,
    failing_ids: Vec<EntityId>,
    slow_terms: HashMap<String, Duration>,
    healthy: bool,
    pub searches: Mutex<Vec<String>>,
    pub type_lookups: Mutex<Vec<EntityId>>,
}

impl MockKnowledgeBase {
    pub fn new() -> Self {
        Self {
            healthy: true,
            ..Self::default()
        }
    }

    /// Register matches as `(id, sitelinks)` pairs
    pub fn with_place(mut self, term: &str, matches: &[(&str, u64)]) -> Self {
        let candidates = matches
            .iter()
            .map(|(qid, sitelinks)| Candidate::new(id(qid), *sitelinks))
            .collect();
        self.places.insert(term.to_string(), candidates);
        self
    }

    pub fn with_types(mut self, entity: &str, types: &[&str]) -> Self {
        self.types
            .insert(id(entity), types.iter().map(|t| id(t)).collect());
        self
    }

    pub fn failing_search(mut self, term: &str) -> Self {
        self.failing_terms.push(term.to_string());
        self
    }

    pub fn failing_types(mut self, entity: &str) -> Self {
        self.failing_ids.push(id(entity));
        self
    }

    pub fn slow_search(mut self, term: &str, delay: Duration) -> Self {
        self.slow_terms.insert(term.to_string(), delay);
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn search_count(&self, term: &str) -> usize {
        self.searches
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.as_str() == term)
            .count()
    }

    pub fn type_lookup_count(&self) -> usize {
        self.type_lookups.lock().unwrap().len()
    }
}

#[async_trait]
impl KnowledgeBase for MockKnowledgeBase {
    async fn search_places(
        &self,
        term: &SearchTerm,
        _language: &str,
    ) -> Result<Vec<Candidate>, FetchError> {
        self.searches.lock().unwrap().push(term.to_string());

        if let Some(delay) = self.slow_terms.get(term.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_terms.iter().any(|t| t == term.as_str()) {
            return Err(FetchError::Status {
                status: 429,
                context: "query service".into(),
            });
        }

        Ok(self.places.get(term.as_str()).cloned().unwrap_or_default())
    }

    async fn instance_of(&self, entity: &EntityId, _language: &str) -> Result<TypeSet, FetchError> {
        self.type_lookups.lock().unwrap().push(entity.clone());

        if self.failing_ids.contains(entity) {
            return Err(FetchError::Status {
                status: 503,
                context: "entity API".into(),
            });
        }

        Ok(self.types.get(entity).cloned().unwrap_or_default())
    }

    async fn health(&self) -> Result<bool, FetchError> {
        Ok(self.healthy)
    }
}

/// The Augsburg fixture: three ranked candidates, the city typed as a big city
pub fn augsburg_kb() -> MockKnowledgeBase {
    MockKnowledgeBase::new()
        .with_place("Augsburg", &[("Q10414", 12), ("Q2749", 151), ("Q10415", 40)])
        .with_types("Q2749", &["Q1549591"])
        .with_types("Q10415", &["Q82794"])
        .with_types("Q10414", &["Q82794"])
}

/// Pipeline without throttling
pub fn pipeline(kb: Arc<MockKnowledgeBase>) -> LinkagePipeline {
    LinkagePipeline::new(kb, PipelineConfig::default().with_delay(Duration::ZERO))
        .expect("valid pipeline config")
}
