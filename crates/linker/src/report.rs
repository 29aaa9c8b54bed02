//! Output of one linkage run

use chrono::{DateTime, Utc};
use geolink_core::{EntityId, LinkageResult, LinkedTerm, SearchTerm, TypeSet};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Everything one `link` call produced. One entry per distinct search term,
/// in first-seen order.
#[derive(Debug, Clone, Serialize)]
pub struct LinkageReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub language: String,
    pub entries: Vec<LinkedTerm>,
    /// Instance-of types fetched for every candidate
    pub properties: HashMap<EntityId, TypeSet>,
    /// Terms whose candidate search failed
    pub failed_lookups: usize,
    /// Candidates whose type lookup failed (treated as untyped)
    pub failed_type_lookups: usize,
}

impl LinkageReport {
    pub fn get(&self, term: &str) -> Option<&LinkageResult> {
        self.entries
            .iter()
            .find(|entry| entry.term.as_str() == term)
            .map(|entry| &entry.result)
    }

    pub fn terms(&self) -> impl Iterator<Item = &SearchTerm> {
        self.entries.iter().map(|entry| &entry.term)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolved_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.result.is_resolved())
            .count()
    }

    /// Plain term → result mapping
    pub fn to_map(&self) -> BTreeMap<String, LinkageResult> {
        self.entries
            .iter()
            .map(|entry| (entry.term.to_string(), entry.result.clone()))
            .collect()
    }
}
