//! Knowledge-base identifiers and ranked candidate sets

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Maximum number of candidates kept per search term
pub const MAX_CANDIDATES: usize = 3;

/// Opaque identifier of a knowledge-base item, e.g. `Q2749`.
///
/// One ASCII uppercase letter followed by digits. Ordering compares the
/// prefix first and then the numeric part, so `Q9 < Q10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Extract the identifier from a concept URI
    /// (`http://www.wikidata.org/entity/Q64`) or accept a bare id.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let last = uri.trim_end_matches('/').rsplit('/').next().unwrap_or(uri);
        last.parse()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn prefix(&self) -> char {
        self.0.chars().next().unwrap_or('Q')
    }

    fn number(&self) -> u64 {
        self.0[1..].parse().unwrap_or(u64::MAX)
    }
}

impl FromStr for EntityId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
            && s.len() > 1
            && chars.all(|c| c.is_ascii_digit());
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(CoreError::InvalidEntityId(s.to_string()))
        }
    }
}

impl TryFrom<String> for EntityId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Ord for EntityId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.prefix()
            .cmp(&other.prefix())
            .then_with(|| self.number().cmp(&other.number()))
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for EntityId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Instance-of types of one entity
pub type TypeSet = HashSet<EntityId>;

/// A knowledge-base match with its prominence score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: EntityId,
    /// Number of sitelinks, used as a popularity proxy
    pub sitelinks: u64,
}

impl Candidate {
    pub fn new(id: EntityId, sitelinks: u64) -> Self {
        Self { id, sitelinks }
    }
}

/// Up to [`MAX_CANDIDATES`] candidates for one search term, most prominent first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateSet(Vec<Candidate>);

impl CandidateSet {
    /// Rank raw matches: one entry per item (highest score wins), sorted by
    /// descending sitelinks with ties in ascending id order, truncated.
    ///
    /// Returns `None` when there is nothing to rank.
    pub fn rank(matches: impl IntoIterator<Item = Candidate>) -> Option<Self> {
        let mut best: HashMap<EntityId, u64> = HashMap::new();
        for candidate in matches {
            let score = best.entry(candidate.id).or_insert(candidate.sitelinks);
            *score = (*score).max(candidate.sitelinks);
        }

        if best.is_empty() {
            return None;
        }

        let mut ranked: Vec<Candidate> = best
            .into_iter()
            .map(|(id, sitelinks)| Candidate { id, sitelinks })
            .collect();
        ranked.sort_by(|a, b| b.sitelinks.cmp(&a.sitelinks).then_with(|| a.id.cmp(&b.id)));
        ranked.truncate(MAX_CANDIDATES);

        Some(Self(ranked))
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.0
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.0.iter().map(|c| &c.id)
    }

    pub fn top(&self) -> &EntityId {
        // rank() never builds an empty set
        &self.0[0].id
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
