// src/error.rs

//! Unified error handling for the indexer.

use std::fmt;

use thiserror::Error;

/// Result type alias for indexer operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Source timestamp could not be parsed
    #[error("unable to parse time '{value}': {message}")]
    TimeParse { value: String, message: String },

    /// Point lookup found nothing
    #[error("post {0} not found")]
    NotFound(u64),

    /// Reply ancestor lookup failed
    #[error("unable to fetch post {id}: {message}")]
    Lookup { id: u64, message: String },

    /// Store search failed
    #[error("search for {id} failed: {message}")]
    Query { id: String, message: String },

    /// Partial update failed
    #[error("unable to update {id}: {message}")]
    Update { id: String, message: String },

    /// Primary document write failed
    #[error("unable to index {id}: {message}")]
    Write { id: String, message: String },

    /// Upstream event stream failed
    #[error("Stream error: {0}")]
    Stream(String),

    /// The indexing actor is no longer consuming
    #[error("indexer is no longer accepting posts")]
    IndexerStopped,

    /// A background task panicked or was cancelled
    #[error("Worker error: {0}")]
    Worker(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a timestamp parse error.
    pub fn time_parse(value: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::TimeParse {
            value: value.into(),
            message: message.to_string(),
        }
    }

    /// Create a lookup error for a post id.
    pub fn lookup(id: u64, message: impl fmt::Display) -> Self {
        Self::Lookup {
            id,
            message: message.to_string(),
        }
    }

    /// Create a search error with the id being correlated.
    pub fn query(id: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Query {
            id: id.into(),
            message: message.to_string(),
        }
    }

    /// Create a partial update error.
    pub fn update(id: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Update {
            id: id.into(),
            message: message.to_string(),
        }
    }

    /// Create a primary write error.
    pub fn write(id: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Write {
            id: id.into(),
            message: message.to_string(),
        }
    }

    /// Create a stream error.
    pub fn stream(message: impl fmt::Display) -> Self {
        Self::Stream(message.to_string())
    }
}
