//! Query-service request building and result parsing

use crate::FetchError;
use geolink_core::{Candidate, EntityId};
use serde::Deserialize;
use tracing::debug;

/// Coordinate location
pub const COORDINATE_LOCATION: &str = "P625";
/// Instance of
pub const INSTANCE_OF: &str = "P31";
/// Wikimedia disambiguation page
pub const DISAMBIGUATION_PAGE: &str = "Q4167410";

/// Escape a value for use inside a double-quoted SPARQL string literal
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// Full-text entity search restricted to located, non-disambiguation items,
/// ranked by sitelink count.
///
/// No `LIMIT`: items tied on sitelinks at the cut-off would be dropped in
/// arbitrary order. The search itself is bounded and
/// [`CandidateSet::rank`](geolink_core::CandidateSet::rank) truncates.
///
/// `language` must already be validated; it is interpolated as is.
pub fn place_search_query(search: &str, language: &str) -> String {
    format!(
        r#"SELECT ?item (COUNT(DISTINCT ?sitelink) AS ?sitelinks) WHERE {{
  SERVICE wikibase:mwapi {{
    bd:serviceParam wikibase:endpoint "www.wikidata.org" ;
                    wikibase:api "EntitySearch" ;
                    mwapi:search "{search}" ;
                    mwapi:language "{language}" .
    ?item wikibase:apiOutputItem mwapi:item .
  }}
  ?item wdt:{coords} ?coordinates .
  FILTER NOT EXISTS {{ ?item wdt:{instance_of} wd:{disambiguation} . }}
  OPTIONAL {{ ?sitelink schema:about ?item . }}
}}
GROUP BY ?item
ORDER BY DESC(?sitelinks)
"#,
        search = escape_literal(search),
        language = language,
        coords = COORDINATE_LOCATION,
        instance_of = INSTANCE_OF,
        disambiguation = DISAMBIGUATION_PAGE,
    )
}

/// Trivial query used as a connectivity probe
pub const HEALTH_QUERY: &str = "ASK {}";

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    bindings: Vec<PlaceBinding>,
}

#[derive(Debug, Deserialize)]
struct PlaceBinding {
    item: SparqlValue,
    sitelinks: Option<SparqlValue>,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}

/// Parse a `application/sparql-results+json` body of a place search
pub fn parse_place_results(body: &str) -> Result<Vec<Candidate>, FetchError> {
    let response: SparqlResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Malformed(format!("SPARQL results: {}", e)))?;

    let mut candidates = Vec::with_capacity(response.results.bindings.len());
    for binding in response.results.bindings {
        let id = match EntityId::from_uri(&binding.item.value) {
            Ok(id) => id,
            Err(_) => {
                debug!("Skipping non-item binding: {}", binding.item.value);
                continue;
            }
        };
        let sitelinks = match binding.sitelinks {
            Some(count) => count.value.parse::<u64>().map_err(|_| {
                FetchError::Malformed(format!(
                    "sitelink count {:?} for {}",
                    count.value, id
                ))
            })?,
            None => 0,
        };
        candidates.push(Candidate::new(id, sitelinks));
    }

    Ok(candidates)
}
