//! Linkage pipeline - normalize, resolve, fetch types, filter, select

use crate::client::{env_or_default, env_parse};
use crate::throttle::{FixedInterval, RateLimiter, Unthrottled};
use crate::{
    CandidateResolver, FetchError, KnowledgeBase, LinkError, LinkageReport, PropertyFetcher,
    Result,
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use geolink_core::{
    normalize, select, validate_language, CandidateSet, EntityId, ExclusionPolicy, LinkageResult,
    LinkedTerm, SearchTerm, TypeSet, UnresolvedReason,
};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_DELAY_MS: u64 = 1000;
const DEFAULT_CONCURRENCY: usize = 1;
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// Run settings for [`LinkagePipeline`]
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Label language for searches and lookups
    pub language: String,
    /// Minimum spacing between remote calls
    pub delay: Duration,
    /// Remote calls allowed in flight at once
    pub concurrency: usize,
    /// Upper bound for a single remote call
    pub call_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            concurrency: DEFAULT_CONCURRENCY,
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `GEOLINK_LANGUAGE`, `GEOLINK_DELAY_MS`,
    /// `GEOLINK_CONCURRENCY` and `GEOLINK_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self {
            language: env_or_default("GEOLINK_LANGUAGE", DEFAULT_LANGUAGE),
            delay: Duration::from_millis(
                env_parse::<u64>("GEOLINK_DELAY_MS").unwrap_or(DEFAULT_DELAY_MS),
            ),
            concurrency: env_parse::<usize>("GEOLINK_CONCURRENCY")
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_CONCURRENCY),
            call_timeout: Duration::from_secs(
                env_parse::<u64>("GEOLINK_TIMEOUT_SECS")
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_CALL_TIMEOUT_SECS),
            ),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_language(&self.language)?;
        if self.concurrency == 0 {
            return Err(LinkError::Config("concurrency must be at least 1".into()));
        }
        if self.call_timeout.is_zero() {
            return Err(LinkError::Config("call timeout must be positive".into()));
        }
        Ok(())
    }
}

/// Links place-name mentions to knowledge-base ids in one batch pass
pub struct LinkagePipeline {
    kb: Arc<dyn KnowledgeBase>,
    resolver: CandidateResolver,
    fetcher: PropertyFetcher,
    limiter: Arc<dyn RateLimiter>,
    config: PipelineConfig,
}

impl LinkagePipeline {
    /// Validates the config; a zero delay disables throttling.
    pub fn new(kb: Arc<dyn KnowledgeBase>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let limiter: Arc<dyn RateLimiter> = if config.delay.is_zero() {
            Arc::new(Unthrottled)
        } else {
            Arc::new(FixedInterval::new(config.delay))
        };

        Ok(Self {
            resolver: CandidateResolver::new(kb.clone()),
            fetcher: PropertyFetcher::new(kb.clone()),
            kb,
            limiter,
            config,
        })
    }

    /// Replace the default fixed-interval throttle
    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fail fast when the remote services cannot be reached at all
    pub async fn preflight(&self) -> Result<()> {
        let timeout = self.config.call_timeout;
        match tokio::time::timeout(timeout, self.kb.health()).await {
            Ok(Ok(true)) => {
                info!("Knowledge base reachable");
                Ok(())
            }
            Ok(Ok(false)) => Err(LinkError::Unreachable(
                "knowledge base answered with an error status".into(),
            )),
            Ok(Err(e)) => Err(LinkError::Unreachable(e.to_string())),
            Err(_) => Err(LinkError::Unreachable(format!(
                "no answer within {:?}",
                timeout
            ))),
        }
    }

    /// Link mentions in the configured language
    pub async fn link<I, S>(&self, mentions: I, exclusions: &ExclusionPolicy) -> LinkageReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let language = self.config.language.clone();
        self.run(normalize(mentions), exclusions, &language).await
    }

    /// Link mentions in an explicit language
    pub async fn link_with_language<I, S>(
        &self,
        mentions: I,
        exclusions: &ExclusionPolicy,
        language: &str,
    ) -> Result<LinkageReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        validate_language(language)?;
        Ok(self.run(normalize(mentions), exclusions, language).await)
    }

    async fn run(
        &self,
        terms: Vec<SearchTerm>,
        exclusions: &ExclusionPolicy,
        language: &str,
    ) -> LinkageReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("link", %run_id, language);
        self.run_inner(run_id, terms, exclusions, language)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        terms: Vec<SearchTerm>,
        exclusions: &ExclusionPolicy,
        language: &str,
    ) -> LinkageReport {
        let started_at = Utc::now();
        info!(
            "Linking {} terms with {} excluded types",
            terms.len(),
            exclusions.len()
        );

        // Resolve every term once
        let resolved: Vec<(SearchTerm, std::result::Result<Option<CandidateSet>, FetchError>)> =
            stream::iter(terms.iter().cloned())
                .map(|term| async move {
                    let result = self.guarded(self.resolver.resolve(&term, language)).await;
                    (term, result)
                })
                .buffered(self.config.concurrency)
                .collect()
                .await;

        let mut candidates: HashMap<SearchTerm, CandidateSet> = HashMap::new();
        let mut failed_terms: HashSet<SearchTerm> = HashSet::new();
        for (term, result) in resolved {
            match result {
                Ok(Some(set)) => {
                    candidates.insert(term, set);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(term = %term, error = %e, "Candidate lookup failed, leaving term unresolved");
                    failed_terms.insert(term);
                }
            }
        }

        // Fetch types for every distinct candidate
        let mut seen = HashSet::new();
        let all_ids: Vec<EntityId> = terms
            .iter()
            .filter_map(|term| candidates.get(term))
            .flat_map(|set| set.ids())
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect();

        let fetched: Vec<(EntityId, std::result::Result<TypeSet, FetchError>)> =
            stream::iter(all_ids)
                .map(|id| async move {
                    let result = self.guarded(self.fetcher.fetch_types(&id, language)).await;
                    (id, result)
                })
                .buffered(self.config.concurrency)
                .collect()
                .await;

        let mut failed_type_lookups = 0;
        let mut properties: HashMap<EntityId, TypeSet> = HashMap::with_capacity(fetched.len());
        for (id, result) in fetched {
            let types = result.unwrap_or_else(|e| {
                // A failed lookup cannot disqualify the candidate.
                warn!(id = %id, error = %e, "Type lookup failed, treating as untyped");
                failed_type_lookups += 1;
                TypeSet::new()
            });
            properties.insert(id, types);
        }

        let entries: Vec<LinkedTerm> = terms
            .into_iter()
            .map(|term| {
                let set = candidates.get(&term);
                let result = if failed_terms.contains(&term) {
                    LinkageResult::Unresolved(UnresolvedReason::LookupFailed)
                } else {
                    select(set, &properties, exclusions)
                };
                let ranked = set.map(|s| s.ids().cloned().collect()).unwrap_or_default();
                LinkedTerm {
                    term,
                    result,
                    candidates: ranked,
                }
            })
            .collect();

        let report = LinkageReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            language: language.to_string(),
            entries,
            properties,
            failed_lookups: failed_terms.len(),
            failed_type_lookups,
        };

        info!(
            "Linked {}/{} terms ({} failed lookups)",
            report.resolved_count(),
            report.len(),
            report.failed_lookups
        );

        report
    }

    /// Throttle, then run `call` under the per-call timeout
    async fn guarded<T, F>(&self, call: F) -> std::result::Result<T, FetchError>
    where
        F: Future<Output = std::result::Result<T, FetchError>>,
    {
        self.limiter.acquire().await;
        match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.config.call_timeout)),
        }
    }
}
