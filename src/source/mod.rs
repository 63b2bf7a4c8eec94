//! Upstream status source.
//!
//! A source yields the live user stream, a bounded backfill of the home
//! timeline, and point lookups used to resolve reply ancestors.

pub mod http;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::models::{RawPost, StreamEvent};

pub use http::HttpSource;

/// Lazy, non-restartable sequence of stream events.
pub type EventStream = BoxStream<'static, Result<StreamEvent>>;

/// Trait for status source backends.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Open the event stream. Production streams never end.
    async fn stream(&self) -> Result<EventStream>;

    /// Fetch up to `max` timeline posts newer than `since_id`, in source order.
    async fn backfill(&self, since_id: u64, max: usize) -> Result<Vec<RawPost>>;

    /// Look up a single post.
    ///
    /// Fails with `AppError::NotFound` when the post doesn't exist.
    async fn fetch_by_id(&self, id: u64) -> Result<RawPost>;
}
