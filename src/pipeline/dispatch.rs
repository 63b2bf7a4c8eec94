//! Routing of stream events.

use tokio::task::JoinSet;

use crate::models::{RawPost, StreamEvent};
use crate::services::{FavoriteCorrelator, IndexerHandle};

/// Route one stream event.
///
/// Posts go to the indexer. Favorite toggles run concurrently on
/// `favorites`; their failures are logged and the toggle is dropped.
pub fn dispatch(
    event: StreamEvent,
    indexer: &IndexerHandle,
    correlator: &FavoriteCorrelator,
    favorites: &mut JoinSet<()>,
) {
    match event {
        StreamEvent::Post(post) => {
            let id = post.id;
            if let Err(e) = indexer.enqueue(*post) {
                log::warn!("Dropping post {}: {}", id, e);
            }
        }
        StreamEvent::Favorite(post) => spawn_toggle(correlator, *post, true, favorites),
        StreamEvent::Unfavorite(post) => spawn_toggle(correlator, *post, false, favorites),
        StreamEvent::Unknown(kind) => log::warn!("Ignoring '{}' stream message", kind),
    }
}

fn spawn_toggle(
    correlator: &FavoriteCorrelator,
    post: RawPost,
    favorited: bool,
    favorites: &mut JoinSet<()>,
) {
    let correlator = correlator.clone();
    favorites.spawn(async move {
        let id = post.id;
        match correlator.set_favorited(post, favorited).await {
            Ok(outcome) => log::debug!("Favorite toggle for {}: {:?}", id, outcome),
            Err(e) => log::error!("Dropping favorite toggle for {}: {}", id, e),
        }
    });
}
