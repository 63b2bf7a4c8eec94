// src/services/indexer.rs

//! Serial indexing actor.
//!
//! One task owns the input queue and drains it a post at a time: normalize,
//! resolve the reply ancestor, write. The queue is an unbounded channel, so
//! every producer (backfill, stream, favorite correlation, and the actor
//! itself when it finds a reply ancestor) hands posts over without blocking.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{AppError, Result};
use crate::models::{Document, RawPost};
use crate::services::normalize;
use crate::source::StatusSource;
use crate::storage::{DocumentStore, PartitionLayout};

/// Queue message.
#[derive(Debug)]
pub(crate) enum Command {
    Index(RawPost),
    /// Stop once everything queued so far, including ancestors found on
    /// the way, has been written.
    Drain,
}

/// Cloneable handle for feeding the indexer.
#[derive(Debug, Clone)]
pub struct IndexerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl IndexerHandle {
    /// Append a post to the queue. Never blocks.
    pub fn enqueue(&self, post: RawPost) -> Result<()> {
        self.tx
            .send(Command::Index(post))
            .map_err(|_| AppError::IndexerStopped)
    }

    /// Ask the indexer to finish the queue and stop.
    pub fn drain(&self) -> Result<()> {
        self.tx
            .send(Command::Drain)
            .map_err(|_| AppError::IndexerStopped)
    }
}

/// Counters reported when the indexer stops.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexerStats {
    /// Documents written
    pub indexed: usize,
    /// Reply ancestors fetched and queued
    pub ancestors_queued: usize,
    /// Reply ancestors that could not be fetched
    pub lookup_failures: usize,
}

/// The indexing actor.
pub struct Indexer {
    rx: mpsc::UnboundedReceiver<Command>,
    handle: IndexerHandle,
    source: Arc<dyn StatusSource>,
    store: Arc<dyn DocumentStore>,
    layout: PartitionLayout,
    stats: IndexerStats,
}

impl Indexer {
    /// Create the actor and the handle producers use to reach it.
    pub fn new(
        source: Arc<dyn StatusSource>,
        store: Arc<dyn DocumentStore>,
        layout: PartitionLayout,
    ) -> (Self, IndexerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = IndexerHandle { tx };

        let indexer = Self {
            rx,
            handle: handle.clone(),
            source,
            store,
            layout,
            stats: IndexerStats::default(),
        };
        (indexer, handle)
    }

    /// Consume the queue until drained.
    ///
    /// A failed write stops the actor and is returned; nothing queued after
    /// it is processed.
    pub async fn run(mut self) -> Result<IndexerStats> {
        log::info!("Indexer started");

        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Index(post) => self.process(post).await?,
                Command::Drain => {
                    log::debug!("Draining indexer queue");
                    while let Ok(command) = self.rx.try_recv() {
                        if let Command::Index(post) = command {
                            self.process(post).await?;
                        }
                    }
                    break;
                }
            }
        }

        log::info!(
            "Indexer stopped: {} indexed, {} ancestors queued, {} lookups failed",
            self.stats.indexed,
            self.stats.ancestors_queued,
            self.stats.lookup_failures
        );
        Ok(self.stats)
    }

    async fn process(&mut self, post: RawPost) -> Result<()> {
        let mut document = normalize(&post);

        if let Some(reply) = &document.in_reply_to {
            let target = reply.id;
            if !self.resolve_ancestor(&document, target).await {
                document.in_reply_to = None;
            }
        }

        let target = self.layout.document_ref(&document);
        if let Err(e) = self.store.index(&target, &document).await {
            let err = AppError::write(&document.id, e);
            log::error!("{} (at {}); stopping indexer", err, target);
            return Err(err);
        }

        self.stats.indexed += 1;
        log::debug!("Indexed {}", target);
        Ok(())
    }

    /// Fetch the post `document` replies to and queue it behind the current
    /// one. Returns false if it could not be fetched.
    async fn resolve_ancestor(&mut self, document: &Document, target: u64) -> bool {
        log::debug!("Retrieving post {} that {} replies to", target, document.id);

        match self.source.fetch_by_id(target).await {
            Ok(ancestor) => {
                match self.handle.enqueue(ancestor) {
                    Ok(()) => {
                        self.stats.ancestors_queued += 1;
                        log::debug!("Dispatched replied-to post {}", target);
                    }
                    Err(e) => log::warn!("Unable to queue replied-to post {}: {}", target, e),
                }
                true
            }
            Err(e) => {
                self.stats.lookup_failures += 1;
                log::warn!(
                    "{}; indexing {} without its reply reference",
                    AppError::lookup(target, e),
                    document.id
                );
                false
            }
        }
    }
}

/// Handle whose queue is read directly by the test instead of an actor.
#[cfg(test)]
pub(crate) fn detached_handle() -> (IndexerHandle, QueueReader) {
    let (tx, rx) = mpsc::unbounded_channel();
    (IndexerHandle { tx }, QueueReader(rx))
}

#[cfg(test)]
pub(crate) struct QueueReader(mpsc::UnboundedReceiver<Command>);

#[cfg(test)]
impl QueueReader {
    /// Everything queued for indexing so far.
    pub(crate) fn queued(&mut self) -> Vec<RawPost> {
        let mut posts = Vec::new();
        while let Ok(command) = self.0.try_recv() {
            if let Command::Index(post) = command {
                posts.push(post);
            }
        }
        posts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSource, MemoryStore, post, reply};

    fn indexer(source: FakeSource, store: &Arc<MemoryStore>) -> (Indexer, IndexerHandle) {
        Indexer::new(
            Arc::new(source),
            Arc::clone(store) as Arc<dyn DocumentStore>,
            PartitionLayout::default(),
        )
    }

    #[tokio::test]
    async fn test_processes_in_queue_order() {
        let store = Arc::new(MemoryStore::default());
        let (indexer, handle) = indexer(FakeSource::default(), &store);

        for id in [3, 1, 2] {
            handle.enqueue(post(id)).unwrap();
        }
        handle.drain().unwrap();

        let stats = indexer.run().await.unwrap();
        assert_eq!(stats.indexed, 3);
        assert_eq!(store.indexed_ids(), vec!["3", "1", "2"]);
    }

    #[tokio::test]
    async fn test_resolves_reply_ancestor_through_own_queue() {
        let source = FakeSource::default().with_post(reply(50, 20)).with_post(post(20));
        let store = Arc::new(MemoryStore::default());
        let (indexer, handle) = indexer(source, &store);

        handle.enqueue(reply(100, 50)).unwrap();
        handle.drain().unwrap();

        let stats = indexer.run().await.unwrap();
        assert_eq!(stats.indexed, 3);
        assert_eq!(stats.ancestors_queued, 2);
        assert_eq!(store.indexed_ids(), vec!["100", "50", "20"]);
        assert_eq!(store.document("100").unwrap().in_reply_to.unwrap().id, 50);
        assert_eq!(store.document("50").unwrap().in_reply_to.unwrap().id, 20);
    }

    #[tokio::test]
    async fn test_failed_lookup_still_writes_once() {
        let source = FakeSource::default();
        let store = Arc::new(MemoryStore::default());
        let (indexer, handle) = indexer(source, &store);

        handle.enqueue(reply(100, 50)).unwrap();
        handle.enqueue(post(101)).unwrap();
        handle.drain().unwrap();

        let stats = indexer.run().await.unwrap();
        assert_eq!(stats.lookup_failures, 1);
        assert_eq!(stats.ancestors_queued, 0);
        assert_eq!(store.indexed_ids(), vec!["100", "101"]);
        assert!(store.document("100").unwrap().in_reply_to.is_none());
    }

    #[tokio::test]
    async fn test_retweets_collapse_onto_one_document() {
        let store = Arc::new(MemoryStore::default());
        let (indexer, handle) = indexer(FakeSource::default(), &store);

        let original = post(42);
        let mut first = post(900);
        first.user.screen_name = "first".into();
        first.retweeted_status = Some(Box::new(original.clone()));
        let mut second = post(901);
        second.user.screen_name = "second".into();
        second.retweeted_status = Some(Box::new(original));

        handle.enqueue(first).unwrap();
        handle.enqueue(second).unwrap();
        handle.drain().unwrap();
        indexer.run().await.unwrap();

        assert_eq!(store.len(), 1);
        let doc = store.document("42").unwrap();
        assert_eq!(doc.retweeted.unwrap().by.screen_name, "second");
    }

    #[tokio::test]
    async fn test_reshare_on_later_day_updates_original_partition() {
        let store = Arc::new(MemoryStore::default());
        let (indexer, handle) = indexer(FakeSource::default(), &store);

        let mut original = post(42);
        original.created_at = "Mon Jan 05 08:00:00 +0000 2015".into();
        let mut reshare = post(900);
        reshare.created_at = "Tue Jan 06 09:00:00 +0000 2015".into();
        reshare.retweeted_status = Some(Box::new(original.clone()));

        handle.enqueue(original).unwrap();
        handle.enqueue(reshare).unwrap();
        handle.drain().unwrap();
        indexer.run().await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.partitions(), vec!["twitter-2015.01.05"]);

        let (favorites, _queue) = detached_handle();
        let correlator = crate::services::FavoriteCorrelator::new(
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            favorites,
            PartitionLayout::default(),
        );
        let outcome = correlator.set_favorited(post(42), true).await.unwrap();
        assert!(matches!(
            outcome,
            crate::services::FavoriteOutcome::Patched(ref target) if target.id == "42"
        ));
        assert!(store.document("42").unwrap().favorited);
    }

    #[tokio::test]
    async fn test_write_failure_is_fatal() {
        let store = Arc::new(MemoryStore::default());
        store.fail_writes();
        let (indexer, handle) = indexer(FakeSource::default(), &store);

        handle.enqueue(post(1)).unwrap();
        handle.enqueue(post(2)).unwrap();

        let err = indexer.run().await.unwrap_err();
        assert!(matches!(err, AppError::Write { ref id, .. } if id == "1"));
        assert!(matches!(
            handle.enqueue(post(3)),
            Err(AppError::IndexerStopped)
        ));
    }
}
