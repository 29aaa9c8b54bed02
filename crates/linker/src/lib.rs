//! Place-name linking against the Wikidata knowledge base
//!
//! This crate contains the remote client and the linking stages:
//! - CandidateResolver: search term to ranked geographic candidates
//! - PropertyFetcher: instance-of types of a candidate
//! - LinkagePipeline: the batch pass tying both together

pub mod client;
pub mod error;
pub mod knowledge_base;
pub mod pipeline;
pub mod properties;
pub mod report;
pub mod resolver;
pub mod sparql;
pub mod throttle;

pub use client::{ClientConfig, WikidataClient};
pub use error::{FetchError, LinkError, Result};
pub use knowledge_base::KnowledgeBase;
pub use pipeline::{LinkagePipeline, PipelineConfig};
pub use properties::PropertyFetcher;
pub use report::LinkageReport;
pub use resolver::CandidateResolver;
pub use throttle::{FixedInterval, RateLimiter, Unthrottled};
