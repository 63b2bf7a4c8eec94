// src/services/normalizer.rs

//! Raw post to canonical document mapping.

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Document, InReplyTo, Media, RawPost, RawUser, RetweetMeta, User};

/// Timestamp format used by the source, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Parse a source timestamp.
pub fn parse_created_at(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_str(value, CREATED_AT_FORMAT)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| AppError::time_parse(value, e))
}

/// Parse a post's timestamp, substituting the current time on failure.
fn created_time_or_now(post: &RawPost) -> DateTime<Utc> {
    parse_created_at(&post.created_at).unwrap_or_else(|e| {
        log::error!("post {}: {}", post.id, e);
        Utc::now()
    })
}

fn user(raw: &RawUser) -> User {
    User {
        id: raw.id,
        name: Some(raw.name.clone()),
        screen_name: raw.screen_name.clone(),
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}

/// Map a raw post to the document stored for it.
///
/// A retweet is stored under the retweeted post's id, with its contents
/// and created time, annotated with who retweeted it. Every reshare of a
/// post therefore maps to the same document in the same partition.
pub fn normalize(post: &RawPost) -> Document {
    let (original, retweeted) = match post.retweeted_status.as_deref() {
        Some(inner) => {
            let meta = RetweetMeta {
                by: user(&post.user),
                original_created_time: created_time_or_now(inner),
                original_id: inner.id_str(),
            };
            (inner, Some(meta))
        }
        None => (post, None),
    };

    let created_time = match &retweeted {
        Some(meta) => meta.original_created_time,
        None => created_time_or_now(original),
    };

    let entities = &original.entities;

    let hashtags = entities
        .hashtags
        .iter()
        .map(|hashtag| hashtag.text.clone())
        .collect();

    let user_mentions = entities
        .user_mentions
        .iter()
        .map(|mention| User {
            id: mention.id,
            name: Some(mention.name.clone()),
            screen_name: mention.screen_name.clone(),
        })
        .collect();

    let urls = entities
        .urls
        .iter()
        .map(|url| url.expanded_url.clone())
        .collect();

    let media = entities
        .media
        .iter()
        .map(|m| Media {
            id: m.id,
            kind: m.kind.clone(),
            url: m.media_url.clone(),
        })
        .collect();

    let in_reply_to = original.reply_target().map(|id| InReplyTo {
        user: User {
            id: original.in_reply_to_user_id.unwrap_or_default(),
            name: None,
            screen_name: original.in_reply_to_screen_name.clone().unwrap_or_default(),
        },
        id,
    });

    Document {
        id: original.id_str(),
        created_time,
        user: user(&original.user),
        text: original.text.clone(),
        coordinates: original.coordinates.clone(),
        hashtags: non_empty(hashtags),
        user_mentions: non_empty(user_mentions),
        urls: non_empty(urls),
        media: non_empty(media),
        in_reply_to,
        retweeted,
        favorited: original.favorited,
    }
}
