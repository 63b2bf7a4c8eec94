// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;

/// Create a configured asynchronous HTTP client.
pub fn create_client(user_agent: &str, timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

/// Create a client for long-lived streaming responses.
///
/// Only connecting is bounded; the response body may stay open forever.
pub fn create_streaming_client(
    user_agent: &str,
    connect_timeout_secs: u64,
) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .build()?;
    Ok(client)
}
