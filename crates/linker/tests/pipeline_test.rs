//! Integration tests for the linkage pipeline
//!
//! These run against an in-memory knowledge base. Tests that talk to the
//! public services are marked with #[ignore]; run them with:
//! cargo test -- --ignored

mod common;

use common::{augsburg_kb, id, pipeline, MockKnowledgeBase};
use geolink_core::{normalize, ExclusionPolicy, LinkageResult, UnresolvedReason, MAX_CANDIDATES};
use geolink_linker::{
    CandidateResolver, ClientConfig, FixedInterval, LinkError, LinkagePipeline, PipelineConfig,
    WikidataClient,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Augsburg links to the city when nothing is excluded
#[tokio::test]
async fn test_augsburg_without_exclusions() {
    let kb = Arc::new(augsburg_kb());
    let report = pipeline(kb).link(["Augsburg"], &ExclusionPolicy::new()).await;

    assert_eq!(report.len(), 1);
    assert_eq!(
        report.get("Augsburg"),
        Some(&LinkageResult::Resolved(id("Q2749")))
    );
    assert_eq!(
        report.entries[0].candidates,
        vec![id("Q2749"), id("Q10415"), id("Q10414")]
    );
}

/// Excluding the city type falls through to the next candidate
#[tokio::test]
async fn test_augsburg_with_exclusion() {
    let kb = Arc::new(augsburg_kb());
    let exclusions = ExclusionPolicy::parse_list("Q1549591").unwrap();
    let report = pipeline(kb).link(["Augsburg"], &exclusions).await;

    assert_eq!(
        report.get("Augsburg"),
        Some(&LinkageResult::Resolved(id("Q10415")))
    );
}

/// Every candidate excluded leaves the term unresolved
#[tokio::test]
async fn test_all_candidates_excluded() {
    let kb = Arc::new(augsburg_kb());
    let exclusions = ExclusionPolicy::parse_list("Q1549591,Q82794").unwrap();
    let report = pipeline(kb).link(["Augsburg"], &exclusions).await;

    assert_eq!(
        report.get("Augsburg"),
        Some(&LinkageResult::Unresolved(UnresolvedReason::AllExcluded))
    );
    assert_eq!(report.resolved_count(), 0);
}

/// No match is an unresolved entry, not a failure
#[tokio::test]
async fn test_no_candidates() {
    let kb = Arc::new(MockKnowledgeBase::new());
    let report = pipeline(kb.clone())
        .link(["Atlantis"], &ExclusionPolicy::new())
        .await;

    assert_eq!(
        report.get("Atlantis"),
        Some(&LinkageResult::Unresolved(UnresolvedReason::NoCandidates))
    );
    assert!(report.entries[0].candidates.is_empty());
    assert_eq!(report.failed_lookups, 0);
    assert_eq!(kb.type_lookup_count(), 0);
}

/// One entry per distinct normalized term, each searched exactly once
#[tokio::test]
async fn test_one_entry_per_term() {
    let kb = Arc::new(
        MockKnowledgeBase::new()
            .with_place("Berlin", &[("Q64", 300)])
            .with_place("Munich", &[("Q1726", 250)]),
    );
    let mentions = ["Berlin", "Munich, Berlin", "", "Berlin."];
    let report = pipeline(kb.clone())
        .link(mentions, &ExclusionPolicy::new())
        .await;

    let keys: Vec<_> = report.terms().cloned().collect();
    assert_eq!(keys, normalize(mentions));
    assert_eq!(report.len(), 2);
    assert_eq!(kb.search_count("Berlin"), 1);
    assert_eq!(kb.search_count("Munich"), 1);
    assert_eq!(report.get("Berlin"), Some(&LinkageResult::Resolved(id("Q64"))));
    assert_eq!(report.get("Munich"), Some(&LinkageResult::Resolved(id("Q1726"))));
}

/// Candidates shared between terms are looked up once
#[tokio::test]
async fn test_shared_candidates_fetched_once() {
    let kb = Arc::new(
        MockKnowledgeBase::new()
            .with_place("Frankfurt", &[("Q1794", 200), ("Q4024", 80)])
            .with_place("Frankfurt am Main", &[("Q1794", 200)]),
    );
    let report = pipeline(kb.clone())
        .link(["Frankfurt", "Frankfurt am Main"], &ExclusionPolicy::new())
        .await;

    assert_eq!(report.resolved_count(), 2);
    assert_eq!(kb.type_lookup_count(), 2);
    assert_eq!(report.properties.len(), 2);
}

/// A failing search only affects its own term
#[tokio::test]
async fn test_failed_search_is_isolated() {
    let kb = Arc::new(
        augsburg_kb()
            .with_place("Ulm", &[("Q3012", 90)])
            .failing_search("Ulm"),
    );
    let report = pipeline(kb)
        .link(["Ulm", "Augsburg"], &ExclusionPolicy::new())
        .await;

    assert_eq!(report.len(), 2);
    assert_eq!(
        report.get("Ulm"),
        Some(&LinkageResult::Unresolved(UnresolvedReason::LookupFailed))
    );
    assert_eq!(
        report.get("Augsburg"),
        Some(&LinkageResult::Resolved(id("Q2749")))
    );
    assert_eq!(report.failed_lookups, 1);
}

/// A failed type lookup never disqualifies a candidate
#[tokio::test]
async fn test_failed_type_lookup_is_permissive() {
    let kb = Arc::new(augsburg_kb().failing_types("Q2749"));
    let exclusions = ExclusionPolicy::parse_list("Q1549591").unwrap();
    let report = pipeline(kb).link(["Augsburg"], &exclusions).await;

    assert_eq!(
        report.get("Augsburg"),
        Some(&LinkageResult::Resolved(id("Q2749")))
    );
    assert_eq!(report.failed_type_lookups, 1);
    assert!(report.properties[&id("Q2749")].is_empty());
}

/// A call past the timeout takes the soft-fail path
#[tokio::test]
async fn test_timeout_is_soft_failure() {
    let kb = Arc::new(
        augsburg_kb()
            .with_place("Kempten", &[("Q4153", 60)])
            .slow_search("Kempten", Duration::from_secs(5)),
    );
    let config = PipelineConfig::default()
        .with_delay(Duration::ZERO)
        .with_call_timeout(Duration::from_millis(50));
    let pipeline = LinkagePipeline::new(kb, config).unwrap();

    let report = pipeline
        .link(["Kempten", "Augsburg"], &ExclusionPolicy::new())
        .await;

    assert_eq!(
        report.get("Kempten"),
        Some(&LinkageResult::Unresolved(UnresolvedReason::LookupFailed))
    );
    assert!(report.get("Augsburg").unwrap().is_resolved());
}

/// Empty exclusions resolve every matched term to its top candidate
#[tokio::test]
async fn test_empty_exclusions_pick_top_candidates() {
    let kb = Arc::new(
        augsburg_kb()
            .with_place("Bonn", &[("Q586", 190), ("Q2000", 3)])
            .with_types("Q586", &["Q1549591"]),
    );
    let report = pipeline(kb)
        .link(["Augsburg", "Bonn", "Nowhere"], &ExclusionPolicy::new())
        .await;

    for entry in &report.entries {
        match entry.candidates.first() {
            Some(top) => assert_eq!(entry.result, LinkageResult::Resolved(top.clone())),
            None => assert!(!entry.result.is_resolved()),
        }
    }
}

/// Running with several calls in flight gives the same answers
#[tokio::test]
async fn test_concurrent_run_matches_sequential() {
    let build = || {
        Arc::new(
            augsburg_kb()
                .with_place("Berlin", &[("Q64", 300)])
                .with_place("Hamburg", &[("Q1055", 280)])
                .failing_search("Kiel"),
        )
    };
    let mentions = ["Augsburg, Berlin", "Hamburg", "Kiel", "Nowhere"];
    let exclusions = ExclusionPolicy::parse_list("Q1549591").unwrap();

    let sequential = pipeline(build()).link(mentions, &exclusions).await;

    let config = PipelineConfig::default()
        .with_delay(Duration::ZERO)
        .with_concurrency(4);
    let concurrent = LinkagePipeline::new(build(), config)
        .unwrap()
        .link(mentions, &exclusions)
        .await;

    assert_eq!(sequential.entries, concurrent.entries);
}

/// Calls are spaced out by the throttle
#[tokio::test]
async fn test_throttle_spaces_calls() {
    let kb = Arc::new(augsburg_kb());
    let pipeline = pipeline(kb)
        .with_rate_limiter(Arc::new(FixedInterval::new(Duration::from_millis(30))));

    let start = Instant::now();
    let report = pipeline.link(["Augsburg"], &ExclusionPolicy::new()).await;

    // one search plus three type lookups
    assert!(start.elapsed() >= Duration::from_millis(90));
    assert!(report.get("Augsburg").unwrap().is_resolved());
}

/// Resolver output respects the candidate cap and ordering
#[tokio::test]
async fn test_resolver_caps_and_orders() {
    let kb = Arc::new(MockKnowledgeBase::new().with_place(
        "Neustadt",
        &[
            ("Q1", 5),
            ("Q2", 70),
            ("Q3", 70),
            ("Q4", 12),
            ("Q5", 90),
        ],
    ));
    let resolver = CandidateResolver::new(kb);
    let term = geolink_core::SearchTerm::parse("Neustadt").unwrap();
    let set = resolver.resolve(&term, "de").await.unwrap().unwrap();

    assert!(set.len() <= MAX_CANDIDATES);
    let scores: Vec<_> = set.candidates().iter().map(|c| c.sitelinks).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    let ids: Vec<_> = set.ids().cloned().collect();
    assert_eq!(ids, vec![id("Q5"), id("Q2"), id("Q3")]);
}

#[tokio::test]
async fn test_explicit_language_is_validated() {
    let kb = Arc::new(augsburg_kb());
    let result = pipeline(kb)
        .link_with_language(["Augsburg"], &ExclusionPolicy::new(), "de\"")
        .await;
    assert!(matches!(result, Err(LinkError::Core(_))));
}

#[tokio::test]
async fn test_preflight() {
    assert!(pipeline(Arc::new(MockKnowledgeBase::new()))
        .preflight()
        .await
        .is_ok());

    let result = pipeline(Arc::new(MockKnowledgeBase::new().unhealthy()))
        .preflight()
        .await;
    assert!(matches!(result, Err(LinkError::Unreachable(_))));
}

#[tokio::test]
async fn test_empty_input() {
    let kb = Arc::new(MockKnowledgeBase::new());
    let report = pipeline(kb.clone())
        .link(["", " , ."], &ExclusionPolicy::new())
        .await;

    assert!(report.is_empty());
    assert!(kb.searches.lock().unwrap().is_empty());
}

/// Live run against the public services
#[tokio::test]
#[ignore = "requires network access to wikidata.org"]
async fn test_live_pipeline() {
    let client = WikidataClient::new(ClientConfig::default()).unwrap();
    let pipeline = LinkagePipeline::new(
        Arc::new(client),
        PipelineConfig::default().with_language("de"),
    )
    .unwrap();
    pipeline.preflight().await.unwrap();

    let report = pipeline
        .link(["Augsburg"], &ExclusionPolicy::new())
        .await;
    assert_eq!(report.len(), 1);
}
