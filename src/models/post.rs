//! Raw status updates as delivered by the source.

use serde::{Deserialize, Serialize};

/// A status update before normalization.
///
/// Field names follow the source's JSON so the struct deserializes
/// straight from stream lines, timeline pages and point lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RawPost {
    pub id: u64,

    #[serde(default)]
    pub text: String,

    /// Source timestamp, e.g. `Wed Oct 10 20:19:24 +0000 2018`
    #[serde(default)]
    pub created_at: String,

    #[serde(default)]
    pub user: RawUser,

    /// The reshared post when this one is a retweet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retweeted_status: Option<Box<RawPost>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to_status_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to_user_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to_screen_name: Option<String>,

    #[serde(default)]
    pub entities: Entities,

    #[serde(default)]
    pub favorited: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl RawPost {
    /// Id of the post this one replies to, if any.
    ///
    /// The source reports "no reply" as either null or zero.
    pub fn reply_target(&self) -> Option<u64> {
        self.in_reply_to_status_id.filter(|id| *id != 0)
    }

    /// String form of the id, as used for stored documents.
    pub fn id_str(&self) -> String {
        self.id.to_string()
    }
}

/// Author of a raw post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RawUser {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub screen_name: String,
}

/// Entity lists extracted by the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Entities {
    #[serde(default)]
    pub hashtags: Vec<Hashtag>,
    #[serde(default)]
    pub user_mentions: Vec<Mention>,
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
    #[serde(default)]
    pub media: Vec<MediaEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hashtag {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mention {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub screen_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UrlEntity {
    #[serde(default)]
    pub url: String,
    pub expanded_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaEntity {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub media_url: String,
}

/// GeoJSON point, `[longitude, latitude]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}
