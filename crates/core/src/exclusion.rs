//! Types the caller wants filtered out of the final linkage

use crate::{EntityId, Result, TypeSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Type ids that disqualify a candidate, each with a human-readable reason
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionPolicy {
    types: HashMap<EntityId, String>,
}

impl ExclusionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: exclude one type
    pub fn with_type(mut self, id: EntityId, reason: impl Into<String>) -> Self {
        self.types.insert(id, reason.into());
        self
    }

    /// Parse a comma-separated id list such as `"Q1549591, Q515"`.
    /// Blank items are ignored.
    pub fn parse_list(list: &str) -> Result<Self> {
        let mut policy = Self::new();
        for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let id: EntityId = item.parse()?;
            policy.types.insert(id, "exclude this type".to_string());
        }
        Ok(policy)
    }

    /// True when any of `types` is excluded
    pub fn excludes(&self, types: &TypeSet) -> bool {
        types.iter().any(|t| self.types.contains_key(t))
    }

    pub fn reason(&self, id: &EntityId) -> Option<&str> {
        self.types.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;

    fn id(s: &str) -> EntityId {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_list() {
        let policy = ExclusionPolicy::parse_list("Q1549591, Q515,,").unwrap();
        assert_eq!(policy.len(), 2);
        assert_eq!(policy.reason(&id("Q515")), Some("exclude this type"));
        assert!(ExclusionPolicy::parse_list("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_list_rejects_bad_ids() {
        let err = ExclusionPolicy::parse_list("Q1, city").unwrap_err();
        assert_eq!(err, CoreError::InvalidEntityId("city".into()));
    }

    #[test]
    fn test_excludes() {
        let policy = ExclusionPolicy::new().with_type(id("Q1549591"), "big city");
        let big: TypeSet = [id("Q1549591"), id("Q515")].into_iter().collect();
        let small: TypeSet = [id("Q82794")].into_iter().collect();

        assert!(policy.excludes(&big));
        assert!(!policy.excludes(&small));
        assert!(!policy.excludes(&TypeSet::new()));
        assert!(!ExclusionPolicy::new().excludes(&big));
    }
}
