//! In-memory source and store used by unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Document, RawPost, RawUser, StreamEvent};
use crate::source::{EventStream, StatusSource};
use crate::storage::{
    DocumentRef, DocumentStore, PartitionLayout, SearchQuery, SearchResults, partition_matches,
};

pub(crate) const CREATED_AT: &str = "Wed Oct 10 20:19:24 +0000 2018";

/// A plain post by a fixed author.
pub(crate) fn post(id: u64) -> RawPost {
    RawPost {
        id,
        text: format!("post {id}"),
        created_at: CREATED_AT.to_string(),
        user: RawUser {
            id: 1,
            name: "Author".into(),
            screen_name: "author".into(),
        },
        ..RawPost::default()
    }
}

/// A post replying to `parent`.
pub(crate) fn reply(id: u64, parent: u64) -> RawPost {
    RawPost {
        in_reply_to_status_id: Some(parent),
        in_reply_to_user_id: Some(1),
        in_reply_to_screen_name: Some("author".into()),
        ..post(id)
    }
}

/// Scripted status source.
#[derive(Default)]
pub(crate) struct FakeSource {
    posts: HashMap<u64, RawPost>,
    events: Mutex<Vec<StreamEvent>>,
    timeline: Vec<RawPost>,
    hang: bool,
    lookups: Mutex<Vec<u64>>,
}

impl FakeSource {
    /// Make a post available to point lookups.
    pub(crate) fn with_post(mut self, post: RawPost) -> Self {
        self.posts.insert(post.id, post);
        self
    }

    pub(crate) fn with_events(self, events: Vec<StreamEvent>) -> Self {
        *self.events.lock().unwrap() = events;
        self
    }

    pub(crate) fn with_timeline(mut self, timeline: Vec<RawPost>) -> Self {
        self.timeline = timeline;
        self
    }

    /// Keep the stream open after the scripted events instead of ending it.
    pub(crate) fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub(crate) fn lookups(&self) -> Vec<u64> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusSource for FakeSource {
    async fn stream(&self) -> Result<EventStream> {
        let events = std::mem::take(&mut *self.events.lock().unwrap());
        let scripted = stream::iter(events.into_iter().map(Ok));
        if self.hang {
            Ok(scripted.chain(stream::pending()).boxed())
        } else {
            Ok(scripted.boxed())
        }
    }

    async fn backfill(&self, since_id: u64, max: usize) -> Result<Vec<RawPost>> {
        Ok(self
            .timeline
            .iter()
            .filter(|post| post.id > since_id)
            .take(max)
            .cloned()
            .collect())
    }

    async fn fetch_by_id(&self, id: u64) -> Result<RawPost> {
        self.lookups.lock().unwrap().push(id);
        self.posts.get(&id).cloned().ok_or(AppError::NotFound(id))
    }
}

/// Document store kept in a map, recording every write.
#[derive(Default)]
pub(crate) struct MemoryStore {
    docs: Mutex<BTreeMap<DocumentRef, Value>>,
    indexed: Mutex<Vec<DocumentRef>>,
    updates: Mutex<Vec<(DocumentRef, Value)>>,
    fail_writes: AtomicBool,
    fail_searches: AtomicBool,
    fail_updates: AtomicBool,
}

impl MemoryStore {
    /// Store a document without recording it as an index call.
    pub(crate) fn seed(&self, document: &Document) {
        let target = PartitionLayout::default().document_ref(document);
        let value = serde_json::to_value(document).unwrap();
        self.docs.lock().unwrap().insert(target, value);
    }

    pub(crate) fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_searches(&self) {
        self.fail_searches.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    /// Stored document with the given id, in any partition.
    pub(crate) fn document(&self, id: &str) -> Option<Document> {
        let docs = self.docs.lock().unwrap();
        docs.iter()
            .find(|(target, _)| target.id == id)
            .map(|(_, value)| serde_json::from_value(value.clone()).unwrap())
    }

    /// Distinct partitions holding documents, sorted.
    pub(crate) fn partitions(&self) -> Vec<String> {
        let mut partitions: Vec<String> = self
            .docs
            .lock()
            .unwrap()
            .keys()
            .map(|target| target.partition.clone())
            .collect();
        partitions.dedup();
        partitions
    }

    pub(crate) fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    /// Ids passed to `index`, in call order.
    pub(crate) fn indexed_ids(&self) -> Vec<String> {
        self.indexed
            .lock()
            .unwrap()
            .iter()
            .map(|target| target.id.clone())
            .collect()
    }

    pub(crate) fn updates(&self) -> Vec<(DocumentRef, Value)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn index(&self, target: &DocumentRef, document: &Document) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::stream("store unavailable"));
        }
        let value = serde_json::to_value(document)?;
        self.docs.lock().unwrap().insert(target.clone(), value);
        self.indexed.lock().unwrap().push(target.clone());
        Ok(())
    }

    async fn search(
        &self,
        query: &SearchQuery,
        partitions: &[String],
        kinds: &[String],
    ) -> Result<SearchResults> {
        if self.fail_searches.load(Ordering::SeqCst) {
            return Err(AppError::stream("store unavailable"));
        }
        let docs = self.docs.lock().unwrap();
        let hits: Vec<DocumentRef> = docs
            .iter()
            .filter(|(target, _)| {
                partitions.iter().any(|p| partition_matches(p, &target.partition))
                    && kinds.contains(&target.kind)
            })
            .filter(|(target, value)| query.matches(&target.id, value))
            .map(|(target, _)| target.clone())
            .collect();

        Ok(SearchResults {
            total: hits.len() as u64,
            hits,
        })
    }

    async fn update(&self, target: &DocumentRef, patch: &Value) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::stream("store unavailable"));
        }
        let mut docs = self.docs.lock().unwrap();
        let Some(Value::Object(existing)) = docs.get_mut(target) else {
            return Err(AppError::update(target.id.as_str(), "document missing"));
        };
        if let Value::Object(fields) = patch {
            for (key, value) in fields {
                existing.insert(key.clone(), value.clone());
            }
        }
        self.updates.lock().unwrap().push((target.clone(), patch.clone()));
        Ok(())
    }
}
