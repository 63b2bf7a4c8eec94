//! Events carried by the user stream.

use serde_json::Value;

use crate::error::Result;
use crate::models::RawPost;

/// Keys that identify non-post stream control messages.
const CONTROL_KEYS: &[&str] = &[
    "delete",
    "friends",
    "friends_str",
    "limit",
    "scrub_geo",
    "status_withheld",
    "user_withheld",
    "disconnect",
    "warning",
];

/// One decoded stream message.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A new post in the timeline
    Post(Box<RawPost>),
    /// A post was favorited
    Favorite(Box<RawPost>),
    /// A post was unfavorited
    Unfavorite(Box<RawPost>),
    /// Anything else (friends list, deletes, follows, ...), named by kind
    Unknown(String),
}

impl StreamEvent {
    /// Decode one line of the stream.
    pub fn from_json(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)?;
        Self::from_value(value)
    }

    /// Classify an already parsed stream message.
    ///
    /// Messages with an `event` key are activity events whose subject post
    /// sits in `target_object`; messages with `id` and `text` are posts.
    /// Anything else is named by its control key, or failing that by its
    /// alphabetically smallest key.
    pub fn from_value(mut value: Value) -> Result<Self> {
        if let Some(event) = value.get("event").and_then(Value::as_str) {
            let event = event.to_string();
            return match event.as_str() {
                "favorite" | "unfavorite" => {
                    let target = value
                        .get_mut("target_object")
                        .map(Value::take)
                        .unwrap_or(Value::Null);
                    let post: RawPost = serde_json::from_value(target)?;
                    if event == "favorite" {
                        Ok(Self::Favorite(Box::new(post)))
                    } else {
                        Ok(Self::Unfavorite(Box::new(post)))
                    }
                }
                _ => Ok(Self::Unknown(event)),
            };
        }

        if value.get("id").is_some() && value.get("text").is_some() {
            let post: RawPost = serde_json::from_value(value)?;
            return Ok(Self::Post(Box::new(post)));
        }

        let kind = value
            .as_object()
            .and_then(|object| {
                CONTROL_KEYS
                    .iter()
                    .find(|key| object.contains_key(**key))
                    .map(|key| key.to_string())
                    .or_else(|| object.keys().next().cloned())
            })
            .unwrap_or_else(|| "empty".to_string());
        Ok(Self::Unknown(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post() {
        let event =
            StreamEvent::from_json(r#"{"id": 100, "text": "hi", "user": {"id": 1}}"#).unwrap();
        match event {
            StreamEvent::Post(post) => assert_eq!(post.id, 100),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_favorite_and_unfavorite() {
        let favorite = StreamEvent::from_json(
            r#"{"event": "favorite", "source": {"id": 1}, "target": {"id": 2},
                "target_object": {"id": 7, "text": "liked"}}"#,
        )
        .unwrap();
        assert!(matches!(favorite, StreamEvent::Favorite(ref p) if p.id == 7));

        let unfavorite = StreamEvent::from_json(
            r#"{"event": "unfavorite", "target_object": {"id": 8, "text": "meh"}}"#,
        )
        .unwrap();
        assert!(matches!(unfavorite, StreamEvent::Unfavorite(ref p) if p.id == 8));
    }

    #[test]
    fn test_unknown() {
        let follow = StreamEvent::from_json(r#"{"event": "follow", "source": {}}"#).unwrap();
        assert_eq!(follow, StreamEvent::Unknown("follow".into()));

        let friends = StreamEvent::from_json(r#"{"friends": [1, 2, 3]}"#).unwrap();
        assert_eq!(friends, StreamEvent::Unknown("friends".into()));
    }

    #[test]
    fn test_unknown_named_by_control_key() {
        let delete = StreamEvent::from_json(
            r#"{"created_at": "now", "delete": {"status": {"id": 5, "user_id": 1}}}"#,
        )
        .unwrap();
        assert_eq!(delete, StreamEvent::Unknown("delete".into()));

        let other = StreamEvent::from_json(r#"{"zeta": 1, "alpha": 2}"#).unwrap();
        assert_eq!(other, StreamEvent::Unknown("alpha".into()));

        let empty = StreamEvent::from_json("{}").unwrap();
        assert_eq!(empty, StreamEvent::Unknown("empty".into()));
    }

    #[test]
    fn test_favorite_without_target_is_error() {
        assert!(StreamEvent::from_json(r#"{"event": "favorite"}"#).is_err());
    }
}
