//! Core domain types for geolink
//!
//! This crate defines the data that flows through place-name linking:
//! search terms, knowledge-base identifiers, ranked candidates, exclusion
//! policies and the final linkage results.

pub mod entity;
pub mod error;
pub mod exclusion;
pub mod linkage;
pub mod term;

pub use entity::{Candidate, CandidateSet, EntityId, TypeSet, MAX_CANDIDATES};
pub use error::{CoreError, Result};
pub use exclusion::ExclusionPolicy;
pub use linkage::{select, LinkageResult, LinkedTerm, UnresolvedReason};
pub use term::{normalize, validate_language, SearchTerm};
