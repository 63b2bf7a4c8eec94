//! Favorite and unfavorite correlation.
//!
//! A toggle event carries the post it applies to. The stored document for
//! that post is found by id, or by the id of the post it reshares, and
//! patched in place. A post that isn't stored yet goes through the indexer
//! with the flag already set.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::{FAVORITED_FIELD, RETWEET_ORIGINAL_ID_FIELD, RawPost};
use crate::services::IndexerHandle;
use crate::storage::{Criterion, DocumentRef, DocumentStore, PartitionLayout, SearchQuery};

/// What a favorite toggle ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteOutcome {
    /// Nothing stored yet; the post was queued for indexing
    Queued,
    /// The single matching document was patched
    Patched(DocumentRef),
    /// More than one document matched; nothing was written
    Ambiguous { hits: u64 },
}

/// Applies favorite toggles to stored documents.
#[derive(Clone)]
pub struct FavoriteCorrelator {
    store: Arc<dyn DocumentStore>,
    indexer: IndexerHandle,
    layout: PartitionLayout,
}

impl FavoriteCorrelator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        indexer: IndexerHandle,
        layout: PartitionLayout,
    ) -> Self {
        Self {
            store,
            indexer,
            layout,
        }
    }

    /// Documents that represent the post with the given id.
    pub fn query_for(id: &str) -> SearchQuery {
        SearchQuery::any_of(vec![
            Criterion::Id(id.to_string()),
            Criterion::Term {
                field: RETWEET_ORIGINAL_ID_FIELD.to_string(),
                value: id.to_string(),
            },
        ])
    }

    /// Set the favorited flag of the stored document for `post`.
    pub async fn set_favorited(&self, mut post: RawPost, favorited: bool) -> Result<FavoriteOutcome> {
        let id = post.id_str();
        let query = Self::query_for(&id);

        let results = self
            .store
            .search(
                &query,
                &[self.layout.all_partitions()],
                &[self.layout.kind().to_string()],
            )
            .await
            .map_err(|e| AppError::query(id.as_str(), e))?;

        match results.total {
            0 => {
                log::debug!("No document for {}, queueing it with favorited={}", id, favorited);
                post.favorited = favorited;
                self.indexer.enqueue(post)?;
                Ok(FavoriteOutcome::Queued)
            }
            1 => {
                let target = results
                    .hits
                    .into_iter()
                    .next()
                    .ok_or_else(|| AppError::query(id.as_str(), "one hit reported, none returned"))?;

                log::debug!("Setting favorited={} on {}", favorited, target);
                self.store
                    .update(&target, &favorited_patch(favorited))
                    .await
                    .map_err(|e| AppError::update(target.id.as_str(), e))?;
                Ok(FavoriteOutcome::Patched(target))
            }
            hits => {
                log::error!(
                    "Found {} documents for post {}, expected at most one; leaving them unchanged",
                    hits,
                    id
                );
                Ok(FavoriteOutcome::Ambiguous { hits })
            }
        }
    }
}

fn favorited_patch(favorited: bool) -> Value {
    let mut patch = Map::new();
    patch.insert(FAVORITED_FIELD.to_string(), Value::Bool(favorited));
    Value::Object(patch)
}
