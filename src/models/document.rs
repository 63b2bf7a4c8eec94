//! Canonical document as persisted in the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Coordinates;

/// A normalized post.
///
/// For retweets this holds the retweeted post's contents, with `retweeted`
/// recording who reshared it. Optional fields are left out of the JSON
/// entirely when absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,

    /// Time the post appeared in the timeline
    #[serde(rename = "@timestamp")]
    pub created_time: DateTime<Utc>,

    pub user: User,

    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_mentions: Option<Vec<User>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<Media>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<InReplyTo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retweeted: Option<RetweetMeta>,

    #[serde(default)]
    pub favorited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub screen_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetweetMeta {
    /// Who reshared the post
    pub by: User,
    /// Time the retweeted post was originally created
    pub original_created_time: DateTime<Utc>,
    pub original_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InReplyTo {
    pub user: User,
    pub id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Media {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// Field path of the retweeted post's id, as used in store queries.
pub const RETWEET_ORIGINAL_ID_FIELD: &str = "retweeted.original_id";

/// Field name patched by favorite toggles.
pub const FAVORITED_FIELD: &str = "favorited";
