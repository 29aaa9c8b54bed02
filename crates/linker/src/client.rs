//! HTTP client for the Wikidata query service and entity API

use crate::sparql::{self, INSTANCE_OF};
use crate::{FetchError, KnowledgeBase, LinkError, Result};
use async_trait::async_trait;
use geolink_core::{Candidate, EntityId, SearchTerm, TypeSet};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_SPARQL_URL: &str = "https://query.wikidata.org/sparql";
const DEFAULT_API_URL: &str = "https://www.wikidata.org/w/api.php";
const DEFAULT_USER_AGENT: &str = concat!(
    "geolink/",
    env!("CARGO_PKG_VERSION"),
    " (place-name entity linking)"
);
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub(crate) fn env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

pub(crate) fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
}

/// Endpoints and transport settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub sparql_url: String,
    pub api_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sparql_url: DEFAULT_SPARQL_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `WIKIDATA_SPARQL_URL`, `WIKIDATA_API_URL`,
    /// `GEOLINK_USER_AGENT` and `GEOLINK_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self {
            sparql_url: env_or_default("WIKIDATA_SPARQL_URL", DEFAULT_SPARQL_URL),
            api_url: env_or_default("WIKIDATA_API_URL", DEFAULT_API_URL),
            user_agent: env_or_default("GEOLINK_USER_AGENT", DEFAULT_USER_AGENT),
            timeout: env_parse::<u64>("GEOLINK_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for the public Wikidata services
#[derive(Clone)]
pub struct WikidataClient {
    client: Client,
    config: ClientConfig,
}

impl WikidataClient {
    /// Build the HTTP client. Nothing is sent until the first lookup.
    pub fn new(config: ClientConfig) -> Result<Self> {
        for url in [&config.sparql_url, &config.api_url] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(LinkError::Config(format!("not an http(s) URL: {}", url)));
            }
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// Client configured from the environment
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn transport_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.config.timeout)
        } else {
            FetchError::Http(err)
        }
    }

    async fn get_text(
        &self,
        url: &str,
        query: &[(&str, &str)],
        accept: &'static str,
        context: &str,
    ) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                context: context.to_string(),
            });
        }

        response.text().await.map_err(|e| self.transport_error(e))
    }
}

#[async_trait]
impl KnowledgeBase for WikidataClient {
    #[instrument(skip(self, term), fields(term = %term))]
    async fn search_places(
        &self,
        term: &SearchTerm,
        language: &str,
    ) -> std::result::Result<Vec<Candidate>, FetchError> {
        let query = sparql::place_search_query(term.as_str(), language);
        let body = self
            .get_text(
                &self.config.sparql_url,
                &[("query", query.as_str()), ("format", "json")],
                "application/sparql-results+json",
                "query service",
            )
            .await?;

        let candidates = sparql::parse_place_results(&body)?;
        debug!("Query service returned {} matches", candidates.len());
        Ok(candidates)
    }

    #[instrument(skip(self, id), fields(id = %id))]
    async fn instance_of(
        &self,
        id: &EntityId,
        language: &str,
    ) -> std::result::Result<TypeSet, FetchError> {
        let body = self
            .get_text(
                &self.config.api_url,
                &[
                    ("action", "wbgetentities"),
                    ("ids", id.as_str()),
                    ("props", "claims"),
                    ("languages", language),
                    ("format", "json"),
                ],
                "application/json",
                "entity API",
            )
            .await?;

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| FetchError::Malformed(format!("entity document: {}", e)))?;
        parse_instance_of(&value, id)
    }

    async fn health(&self) -> std::result::Result<bool, FetchError> {
        let query_service = self
            .client
            .get(&self.config.sparql_url)
            .header(ACCEPT, "application/sparql-results+json")
            .query(&[("query", sparql::HEALTH_QUERY), ("format", "json")])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        if !query_service.status().is_success() {
            debug!("Query service health status: {}", query_service.status());
            return Ok(false);
        }

        let api = self
            .client
            .get(&self.config.api_url)
            .query(&[("action", "query"), ("meta", "siteinfo"), ("format", "json")])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        debug!("Entity API health status: {}", api.status());
        Ok(api.status().is_success())
    }
}

/// Read `entities.<id>.claims.P31[].mainsnak.datavalue.value.id`
fn parse_instance_of(value: &Value, id: &EntityId) -> std::result::Result<TypeSet, FetchError> {
    if let Some(error) = value.get("error") {
        let info = error
            .get("info")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(FetchError::Malformed(format!("entity API error: {}", info)));
    }

    let entities = value
        .get("entities")
        .and_then(Value::as_object)
        .ok_or_else(|| FetchError::Malformed("entity document has no entities".into()))?;

    let Some(entity) = entities.get(id.as_str()) else {
        debug!("Entity {} absent from response", id);
        return Ok(TypeSet::new());
    };

    if entity.get("missing").is_some() {
        debug!("Entity {} is missing", id);
        return Ok(TypeSet::new());
    }

    let types = entity
        .get("claims")
        .and_then(|claims| claims.get(INSTANCE_OF))
        .and_then(Value::as_array)
        .map(|statements| {
            statements
                .iter()
                .filter_map(|statement| {
                    statement
                        .pointer("/mainsnak/datavalue/value/id")
                        .and_then(Value::as_str)
                        .and_then(|s| s.parse::<EntityId>().ok())
                })
                .collect::<TypeSet>()
        })
        .unwrap_or_default();

    Ok(types)
}
