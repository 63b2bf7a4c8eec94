//! Storage abstractions for document persistence.
//!
//! Documents are addressed by partition, kind and id. Partitions are
//! date-bucketed, one per calendar day of the document's created time:
//!
//! ```text
//! twitter-2018.10.10/
//! └── tweet/
//!     ├── 1050118621198921728
//!     └── 1050118621198921729
//! ```

pub mod elasticsearch;
pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::Result;
use crate::models::{Document, StoreConfig};

// Re-export for convenience
pub use elasticsearch::ElasticStore;
pub use local::LocalStore;

/// Coordinates of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub partition: String,
    pub kind: String,
    pub id: String,
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.partition, self.kind, self.id)
    }
}

/// A single search condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    /// Document id equals the value
    Id(String),
    /// Field at a dotted path equals the value
    Term { field: String, value: String },
}

impl Criterion {
    fn matches(&self, id: &str, source: &Value) -> bool {
        match self {
            Criterion::Id(expected) => id == expected,
            Criterion::Term { field, value } => {
                lookup_path(source, field).is_some_and(|found| match found {
                    Value::String(s) => s == value,
                    Value::Number(n) => n.to_string() == *value,
                    Value::Bool(b) => b.to_string() == *value,
                    _ => false,
                })
            }
        }
    }

    fn to_elastic(&self) -> Value {
        match self {
            Criterion::Id(id) => json!({ "ids": { "values": [id] } }),
            Criterion::Term { field, value } => {
                let mut term = serde_json::Map::new();
                term.insert(field.clone(), Value::String(value.clone()));
                json!({ "term": term })
            }
        }
    }
}

/// Disjunctive query: a document matches when any criterion does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub any_of: Vec<Criterion>,
}

impl SearchQuery {
    pub fn any_of(criteria: Vec<Criterion>) -> Self {
        Self { any_of: criteria }
    }

    /// Evaluate the query against a stored document.
    pub fn matches(&self, id: &str, source: &Value) -> bool {
        self.any_of.iter().any(|c| c.matches(id, source))
    }

    /// Render as an Elasticsearch request body.
    pub fn to_elastic(&self) -> Value {
        let should: Vec<Value> = self.any_of.iter().map(Criterion::to_elastic).collect();
        json!({
            "query": {
                "bool": {
                    "should": should,
                    "minimum_should_match": 1
                }
            }
        })
    }
}

/// Search outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    pub total: u64,
    pub hits: Vec<DocumentRef>,
}

/// Resolve a dotted path like `retweeted.original_id` inside a JSON value.
fn lookup_path<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(source, |value, key| value.get(key))
}

/// Maps documents to their store coordinates.
#[derive(Debug, Clone)]
pub struct PartitionLayout {
    prefix: String,
    date_format: String,
    kind: String,
}

impl PartitionLayout {
    pub fn new(
        prefix: impl Into<String>,
        date_format: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            date_format: date_format.into(),
            kind: kind.into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(
            &config.partition_prefix,
            &config.partition_date_format,
            &config.kind,
        )
    }

    /// Partition holding documents created on the given day.
    pub fn partition_for(&self, time: &DateTime<Utc>) -> String {
        format!("{}{}", self.prefix, time.format(&self.date_format))
    }

    /// Wildcard covering every partition.
    pub fn all_partitions(&self) -> String {
        format!("{}*", self.prefix)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Where a document is written.
    pub fn document_ref(&self, document: &Document) -> DocumentRef {
        DocumentRef {
            partition: self.partition_for(&document.created_time),
            kind: self.kind.clone(),
            id: document.id.clone(),
        }
    }
}

impl Default for PartitionLayout {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}

/// Trait for document store backends.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or replace a document.
    async fn index(&self, target: &DocumentRef, document: &Document) -> Result<()>;

    /// Find documents matching `query` in the given partitions and kinds.
    ///
    /// Partition names may end in `*` to match by prefix.
    async fn search(
        &self,
        query: &SearchQuery,
        partitions: &[String],
        kinds: &[String],
    ) -> Result<SearchResults>;

    /// Merge `patch` into an existing document's top-level fields.
    async fn update(&self, target: &DocumentRef, patch: &Value) -> Result<()>;
}

/// Whether a partition name matches a pattern with an optional trailing `*`.
pub fn partition_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}
