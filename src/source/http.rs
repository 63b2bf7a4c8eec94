//! HTTP status source.
//!
//! - stream:   `GET {stream_url}`, newline-delimited JSON, blank keep-alives
//! - backfill: `GET {api_url}/statuses/home_timeline.json?count=..&since_id=..`
//! - lookup:   `GET {api_url}/statuses/show/{id}.json`

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use reqwest::{Client, RequestBuilder, StatusCode};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{RawPost, SourceConfig, StreamEvent};
use crate::source::{EventStream, StatusSource};
use crate::utils::{endpoint, http};

/// Status source backed by the REST API and the user stream.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    stream_client: Client,
    api_url: Url,
    stream_url: Url,
    bearer_token: Option<String>,
}

impl HttpSource {
    /// Create a new source from configuration.
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_client(&config.user_agent, config.timeout_secs)?,
            stream_client: http::create_streaming_client(
                &config.user_agent,
                config.timeout_secs,
            )?,
            api_url: Url::parse(&config.api_url)?,
            stream_url: Url::parse(&config.stream_url)?,
            bearer_token: config.bearer_token.clone(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl StatusSource for HttpSource {
    async fn stream(&self) -> Result<EventStream> {
        let response = self
            .authorize(self.stream_client.get(self.stream_url.clone()))
            .send()
            .await?
            .error_for_status()?;
        log::info!("Connected to stream {}", self.stream_url);

        let chunks = Box::pin(response.bytes_stream().map_err(AppError::from));
        let events = frames(chunks, MAX_LINE_BYTES).filter_map(|line| async move {
            match line {
                Ok(line) => match StreamEvent::from_json(&line) {
                    Ok(event) => Some(Ok(event)),
                    Err(e) => {
                        log::warn!("Skipping undecodable stream message: {}", e);
                        None
                    }
                },
                Err(e) => Some(Err(AppError::stream(e))),
            }
        });

        Ok(events.boxed())
    }

    async fn backfill(&self, since_id: u64, max: usize) -> Result<Vec<RawPost>> {
        let mut url = endpoint(&self.api_url, &["statuses", "home_timeline.json"])?;
        url.query_pairs_mut()
            .append_pair("count", &max.to_string())
            .append_pair("since_id", &since_id.to_string());

        let posts: Vec<RawPost> = self
            .authorize(self.client.get(url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(posts)
    }

    async fn fetch_by_id(&self, id: u64) -> Result<RawPost> {
        let file = format!("{id}.json");
        let url = endpoint(&self.api_url, &["statuses", "show", file.as_str()])?;

        let response = self.authorize(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(id));
        }
        Ok(response.error_for_status()?.json().await?)
    }
}

/// Longest stream line kept; longer lines are dropped.
const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Framing state carried between polls.
struct Framer<S> {
    chunks: S,
    buf: Vec<u8>,
    eof: bool,
    /// Inside an oversized line, skipping up to the next newline
    discarding: bool,
}

/// Split a chunked byte stream into trimmed, non-empty lines.
///
/// A line may span chunk boundaries. A line growing past `max_line` bytes
/// is discarded with a warning. After an upstream error the buffered
/// remainder is still emitted, then the stream ends.
fn frames<S, B>(chunks: S, max_line: usize) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = Result<B>> + Unpin + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = Framer {
        chunks,
        buf: Vec::new(),
        eof: false,
        discarding: false,
    };

    stream::unfold(state, move |mut state| async move {
        loop {
            if let Some(pos) = state.buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = state.buf.drain(..=pos).collect();
                if state.discarding {
                    state.discarding = false;
                    continue;
                }
                let text = String::from_utf8_lossy(&line).trim().to_string();
                if text.is_empty() {
                    continue;
                }
                return Some((Ok(text), state));
            }

            if state.buf.len() > max_line {
                if !state.discarding {
                    log::warn!("Discarding stream line longer than {} bytes", max_line);
                }
                state.buf.clear();
                state.discarding = true;
            }

            if state.eof {
                let text = String::from_utf8_lossy(&state.buf).trim().to_string();
                state.buf.clear();
                if text.is_empty() || state.discarding {
                    return None;
                }
                return Some((Ok(text), state));
            }

            match state.chunks.next().await {
                Some(Ok(chunk)) => state.buf.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    state.eof = true;
                    return Some((Err(e), state));
                }
                None => state.eof = true,
            }
        }
    })
}
