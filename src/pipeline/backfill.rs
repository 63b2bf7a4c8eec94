// src/pipeline/backfill.rs

//! Startup backfill of the home timeline.

use crate::error::Result;
use crate::models::MAX_BACKFILL_COUNT;
use crate::services::IndexerHandle;
use crate::source::StatusSource;

/// Queue up to `count` timeline posts newer than `since_id`.
///
/// Posts are queued in the order the source returns them. Returns the
/// number of posts queued.
pub async fn run_backfill(
    source: &dyn StatusSource,
    indexer: &IndexerHandle,
    since_id: u64,
    count: usize,
) -> Result<usize> {
    let count = count.min(MAX_BACKFILL_COUNT);
    log::info!("Backfilling up to {} posts since {}", count, since_id);

    let posts = source.backfill(since_id, count).await?;
    let total = posts.len();
    for post in posts {
        indexer.enqueue(post)?;
    }

    log::info!("Queued {} backfilled posts", total);
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Indexer;
    use crate::storage::{DocumentStore, PartitionLayout};
    use crate::testing::{FakeSource, MemoryStore, post};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_backfill_queues_in_source_order() {
        let source = Arc::new(
            FakeSource::default().with_timeline(vec![post(5), post(12), post(11), post(13)]),
        );
        let store = Arc::new(MemoryStore::default());
        let (indexer, handle) = Indexer::new(
            Arc::clone(&source) as Arc<dyn StatusSource>,
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            PartitionLayout::default(),
        );

        let queued = run_backfill(source.as_ref(), &handle, 10, 2).await.unwrap();
        assert_eq!(queued, 2);

        handle.drain().unwrap();
        indexer.run().await.unwrap();
        assert_eq!(store.indexed_ids(), vec!["12", "11"]);
    }
}
