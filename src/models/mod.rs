// src/models/mod.rs

//! Domain models for the indexer.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod document;
mod event;
mod post;

// Re-export all public types
pub use config::{
    BackfillConfig, Config, LoggingConfig, MAX_BACKFILL_COUNT, SourceConfig, StoreBackend,
    StoreConfig,
};
pub use document::{
    Document, FAVORITED_FIELD, InReplyTo, Media, RETWEET_ORIGINAL_ID_FIELD, RetweetMeta, User,
};
pub use event::StreamEvent;
pub use post::{Coordinates, Entities, Hashtag, MediaEntity, Mention, RawPost, RawUser, UrlEntity};
