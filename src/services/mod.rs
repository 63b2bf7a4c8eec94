//! Service layer for the indexer.
//!
//! This module contains the business logic for:
//! - Post normalization (`normalize`)
//! - Serial indexing with reply resolution (`Indexer`)
//! - Favorite correlation (`FavoriteCorrelator`)

mod favorites;
mod indexer;
mod normalizer;

pub use favorites::{FavoriteCorrelator, FavoriteOutcome};
pub use indexer::{Indexer, IndexerHandle, IndexerStats};
pub use normalizer::{normalize, parse_created_at};
