//! Elasticsearch storage implementation.
//!
//! Speaks the typed REST API: partitions are indices, kinds are mapping
//! types.
//!
//! - index:  `PUT  /{index}/{type}/{id}`
//! - search: `POST /{indices}/{types}/_search`
//! - update: `POST /{index}/{type}/{id}/_update` with `{"doc": ...}`

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::error::Result;
use crate::models::{Document, StoreConfig};
use crate::storage::{DocumentRef, DocumentStore, SearchQuery, SearchResults};
use crate::utils::{endpoint, http};

/// Elasticsearch-backed document store.
#[derive(Debug, Clone)]
pub struct ElasticStore {
    client: Client,
    base_url: Url,
}

impl ElasticStore {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Build a store with its own HTTP client from configuration.
    pub fn from_config(config: &StoreConfig, user_agent: &str, timeout_secs: u64) -> Result<Self> {
        let client = http::create_client(user_agent, timeout_secs)?;
        let base_url = Url::parse(&config.url)?;
        Ok(Self::new(client, base_url))
    }
}

#[async_trait]
impl DocumentStore for ElasticStore {
    async fn index(&self, target: &DocumentRef, document: &Document) -> Result<()> {
        let url = endpoint(
            &self.base_url,
            &[
                target.partition.as_str(),
                target.kind.as_str(),
                target.id.as_str(),
            ],
        )?;
        self.client
            .put(url)
            .json(document)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn search(
        &self,
        query: &SearchQuery,
        partitions: &[String],
        kinds: &[String],
    ) -> Result<SearchResults> {
        let indices = partitions.join(",");
        let types = kinds.join(",");
        let url = endpoint(&self.base_url, &[indices.as_str(), types.as_str(), "_search"])?;

        let body: Value = self
            .client
            .post(url)
            .json(&query.to_elastic())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let fallback_kind = kinds.first().map(String::as_str).unwrap_or_default();
        parse_search_response(body, fallback_kind)
    }

    async fn update(&self, target: &DocumentRef, patch: &Value) -> Result<()> {
        let url = endpoint(
            &self.base_url,
            &[
                target.partition.as_str(),
                target.kind.as_str(),
                target.id.as_str(),
                "_update",
            ],
        )?;
        self.client
            .post(url)
            .json(&json!({ "doc": patch }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: Total,
    #[serde(default)]
    hits: Vec<Hit>,
}

/// Older servers report a bare count, newer ones `{"value": n, "relation": ..}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Total {
    Count(u64),
    Relation { value: u64 },
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_type", default)]
    kind: Option<String>,
    #[serde(rename = "_id")]
    id: String,
}

/// Convert a `_search` response body into hit coordinates.
fn parse_search_response(body: Value, fallback_kind: &str) -> Result<SearchResults> {
    let response: SearchResponse = serde_json::from_value(body)?;
    let total = match response.hits.total {
        Total::Count(n) | Total::Relation { value: n } => n,
    };
    let hits = response
        .hits
        .hits
        .into_iter()
        .map(|hit| DocumentRef {
            partition: hit.index,
            kind: hit.kind.unwrap_or_else(|| fallback_kind.to_string()),
            id: hit.id,
        })
        .collect();
    Ok(SearchResults { total, hits })
}
