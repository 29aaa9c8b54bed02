//! Linkage results and the candidate selection rule

use crate::{CandidateSet, EntityId, ExclusionPolicy, SearchTerm, TypeSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Why a term could not be linked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// The search returned no geographic match
    NoCandidates,
    /// The search itself failed and was skipped
    LookupFailed,
    /// Every candidate carried an excluded type
    AllExcluded,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoCandidates => "no_candidates",
            Self::LookupFailed => "lookup_failed",
            Self::AllExcluded => "all_excluded",
        };
        f.write_str(s)
    }
}

/// Final outcome for one search term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum LinkageResult {
    Resolved(EntityId),
    Unresolved(UnresolvedReason),
}

impl LinkageResult {
    pub fn entity(&self) -> Option<&EntityId> {
        match self {
            Self::Resolved(id) => Some(id),
            Self::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Short status label for tabular output
    pub fn status(&self) -> String {
        match self {
            Self::Resolved(_) => "resolved".to_string(),
            Self::Unresolved(reason) => reason.to_string(),
        }
    }
}

/// One row of the final mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedTerm {
    pub term: SearchTerm,
    pub result: LinkageResult,
    /// Ranked candidates that were considered
    #[serde(default)]
    pub candidates: Vec<EntityId>,
}

/// Pick the highest-ranked candidate whose types avoid every exclusion.
///
/// Ids missing from `types` count as having no types at all.
pub fn select(
    candidates: Option<&CandidateSet>,
    types: &HashMap<EntityId, TypeSet>,
    exclusions: &ExclusionPolicy,
) -> LinkageResult {
    let Some(candidates) = candidates else {
        return LinkageResult::Unresolved(UnresolvedReason::NoCandidates);
    };

    let empty = TypeSet::new();
    candidates
        .ids()
        .find(|id| !exclusions.excludes(types.get(*id).unwrap_or(&empty)))
        .map(|id| LinkageResult::Resolved(id.clone()))
        .unwrap_or(LinkageResult::Unresolved(UnresolvedReason::AllExcluded))
}
