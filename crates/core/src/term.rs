//! Search terms - cleaned, deduplicated place names

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// One normalized place name ready to be looked up.
///
/// Never empty, never ends in a dot, carries no surrounding whitespace
/// and no commas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SearchTerm(String);

impl SearchTerm {
    /// Clean a single comma-free part; `None` if nothing is left.
    pub fn parse(part: &str) -> Option<Self> {
        let cleaned = part
            .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
            .trim_start();
        if cleaned.is_empty() || cleaned.contains(',') {
            None
        } else {
            Some(Self(cleaned.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SearchTerm {
    type Error = CoreError;

    /// Only accepts values that are already clean.
    fn try_from(value: String) -> Result<Self> {
        match Self::parse(&value) {
            Some(term) if term.0 == value => Ok(term),
            _ => Err(CoreError::Validation(format!(
                "not a normalized search term: {:?}",
                value
            ))),
        }
    }
}

impl From<SearchTerm> for String {
    fn from(term: SearchTerm) -> Self {
        term.0
    }
}

impl AsRef<str> for SearchTerm {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Split mentions on commas, strip trailing dots, drop empties and
/// deduplicate. Terms come back in first-seen order.
pub fn normalize<I, S>(mentions: I) -> Vec<SearchTerm>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut terms = Vec::new();

    for mention in mentions {
        for part in mention.as_ref().split(',') {
            if let Some(term) = SearchTerm::parse(part) {
                if seen.insert(term.clone()) {
                    terms.push(term);
                }
            }
        }
    }

    terms
}

/// Check a label language code such as `en`, `de` or `zh-hans`
pub fn validate_language(code: &str) -> Result<()> {
    let mut parts = code.split('-');
    let primary = parts.next().unwrap_or_default();
    let primary_ok = (2..=3).contains(&primary.len())
        && primary.chars().all(|c| c.is_ascii_lowercase());
    let rest_ok = parts.all(|p| {
        !p.is_empty() && p.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    });

    if primary_ok && rest_ok {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "invalid language code: {:?}",
            code
        )))
    }
}
