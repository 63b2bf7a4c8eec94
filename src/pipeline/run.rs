// src/pipeline/run.rs

//! Indexing pipeline.

use std::sync::Arc;

use futures::StreamExt;
use tokio::task::{JoinError, JoinSet};

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::pipeline::{dispatch, run_backfill};
use crate::services::{FavoriteCorrelator, Indexer, IndexerStats};
use crate::source::StatusSource;
use crate::storage::{DocumentStore, PartitionLayout};

/// Run the indexer against `source` and `store`.
///
/// Returns when the stream ends (after everything queued is written) or as
/// soon as the indexer stops on a failed write.
pub async fn run_pipeline(
    config: &Config,
    source: Arc<dyn StatusSource>,
    store: Arc<dyn DocumentStore>,
) -> Result<IndexerStats> {
    let layout = PartitionLayout::from_config(&config.store);
    let (indexer, handle) = Indexer::new(Arc::clone(&source), Arc::clone(&store), layout.clone());
    let mut indexer_task = tokio::spawn(indexer.run());
    let correlator = FavoriteCorrelator::new(store, handle.clone(), layout);

    if config.backfill.since_id > 0 {
        let backfill = run_backfill(
            source.as_ref(),
            &handle,
            config.backfill.since_id,
            config.backfill.count,
        )
        .await;
        if let Err(e) = backfill {
            log::error!("Backfill failed: {}", e);
            indexer_task.abort();
            return Err(e);
        }
    }

    let mut events = match source.stream().await {
        Ok(events) => events,
        Err(e) => {
            log::error!("Unable to open stream: {}", e);
            indexer_task.abort();
            return Err(e);
        }
    };
    let mut favorites = JoinSet::new();
    let mut stream_error = None;

    loop {
        tokio::select! {
            biased;
            joined = &mut indexer_task => return finish(joined),
            Some(joined) = favorites.join_next(), if !favorites.is_empty() => {
                report_toggle(joined);
            }
            event = events.next() => match event {
                Some(Ok(event)) => dispatch(event, &handle, &correlator, &mut favorites),
                Some(Err(e)) => {
                    log::error!("Stream failed: {}", e);
                    stream_error = Some(e);
                    break;
                }
                None => {
                    log::info!("Stream ended");
                    break;
                }
            },
        }
    }

    while let Some(joined) = favorites.join_next().await {
        report_toggle(joined);
    }

    if handle.drain().is_err() {
        log::debug!("Indexer already stopped");
    }
    let stats = finish(indexer_task.await)?;

    match stream_error {
        Some(e) => Err(e),
        None => Ok(stats),
    }
}

fn finish(joined: std::result::Result<Result<IndexerStats>, JoinError>) -> Result<IndexerStats> {
    joined.map_err(|e| AppError::Worker(e.to_string()))?
}

fn report_toggle(joined: std::result::Result<(), JoinError>) {
    if let Err(e) = joined {
        log::error!("Favorite task failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StreamEvent;
    use crate::testing::{FakeSource, MemoryStore, post, reply};

    fn run_config(since_id: u64) -> Config {
        let mut config = Config::default();
        config.backfill.since_id = since_id;
        config
    }

    fn boxed(post: crate::models::RawPost) -> Box<crate::models::RawPost> {
        Box::new(post)
    }

    #[tokio::test]
    async fn test_reply_chain_end_to_end() {
        let source = Arc::new(
            FakeSource::default()
                .with_post(post(50))
                .with_events(vec![StreamEvent::Post(boxed(reply(100, 50)))]),
        );
        let store = Arc::new(MemoryStore::default());

        let stats = run_pipeline(
            &run_config(0),
            Arc::clone(&source) as Arc<dyn StatusSource>,
            Arc::clone(&store) as Arc<dyn DocumentStore>,
        )
        .await
        .unwrap();

        assert_eq!(stats.indexed, 2);
        assert_eq!(source.lookups(), vec![50]);
        assert_eq!(store.document("100").unwrap().in_reply_to.unwrap().id, 50);
        assert!(store.document("50").is_some());
    }

    #[tokio::test]
    async fn test_backfill_then_favorite() {
        let source = Arc::new(
            FakeSource::default()
                .with_timeline(vec![post(10), post(11)])
                .with_events(vec![
                    StreamEvent::Favorite(boxed(post(10))),
                    StreamEvent::Unknown("friends".into()),
                    StreamEvent::Post(boxed(post(12))),
                ]),
        );
        let store = Arc::new(MemoryStore::default());

        run_pipeline(
            &run_config(1),
            source as Arc<dyn StatusSource>,
            Arc::clone(&store) as Arc<dyn DocumentStore>,
        )
        .await
        .unwrap();

        assert_eq!(store.len(), 3);
        assert!(store.document("10").unwrap().favorited);
        assert!(!store.document("11").unwrap().favorited);
        assert!(!store.document("12").unwrap().favorited);
    }

    #[tokio::test]
    async fn test_backfill_disabled_by_default() {
        let source = Arc::new(FakeSource::default().with_timeline(vec![post(10)]));
        let store = Arc::new(MemoryStore::default());

        let stats = run_pipeline(
            &run_config(0),
            source as Arc<dyn StatusSource>,
            Arc::clone(&store) as Arc<dyn DocumentStore>,
        )
        .await
        .unwrap();

        assert_eq!(stats, IndexerStats::default());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_stops_open_stream() {
        let source = Arc::new(
            FakeSource::default()
                .with_events(vec![StreamEvent::Post(boxed(post(1)))])
                .hanging(),
        );
        let store = Arc::new(MemoryStore::default());
        store.fail_writes();

        let err = run_pipeline(
            &run_config(0),
            source as Arc<dyn StatusSource>,
            store as Arc<dyn DocumentStore>,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Write { ref id, .. } if id == "1"));
    }
}
