//! Discussion sub-records
//!
//! Comments and justification posts are keyed by topic id and relocated,
//! not duplicated, when their topic rotates into the archive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const COMMENT_COLLECTION: &str = "comments";
pub const JUSTIFICATION_COLLECTION: &str = "justifications";

/// Free-form discussion comment under a topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub topic_id: String,
    pub author_id: String,
    pub body: String,

    /// Optional discussion tag (e.g. which side the author argues).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default)]
    pub likes: i64,

    /// Moderation report counter.
    #[serde(default)]
    pub reports: i64,

    pub created_at: DateTime<Utc>,
}

impl CommentDoc {
    pub fn new(topic_id: &str, author_id: &str, body: &str, tag: Option<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            topic_id: topic_id.to_string(),
            author_id: author_id.to_string(),
            body: body.to_string(),
            tag,
            likes: 0,
            reports: 0,
            created_at,
        }
    }

    /// The same comment re-homed under an archive id.
    pub fn relocated(&self, topic_id: &str) -> Self {
        let mut copy = self.clone();
        copy.topic_id = topic_id.to_string();
        copy
    }
}

/// Post created when a voter justifies a vote change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JustificationDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub topic_id: String,
    pub author_id: String,

    /// The option the author switched to.
    pub option_id: String,

    pub body: String,

    #[serde(default)]
    pub likes: i64,

    #[serde(default)]
    pub reports: i64,

    pub created_at: DateTime<Utc>,
}

impl JustificationDoc {
    pub fn new(
        topic_id: &str,
        author_id: &str,
        option_id: &str,
        body: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            topic_id: topic_id.to_string(),
            author_id: author_id.to_string(),
            option_id: option_id.to_string(),
            body: body.to_string(),
            likes: 0,
            reports: 0,
            created_at,
        }
    }

    pub fn relocated(&self, topic_id: &str) -> Self {
        let mut copy = self.clone();
        copy.topic_id = topic_id.to_string();
        copy
    }
}
