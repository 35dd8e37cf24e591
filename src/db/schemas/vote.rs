//! Vote ledger documents
//!
//! One live `VoteEntry` per (topic, voter). Superseding an entry requires a
//! justification, recorded as a `ReVoteMarker` whose timestamp decides
//! whether it belongs to the current topic generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const VOTE_COLLECTION: &str = "votes";
pub const MARKER_COLLECTION: &str = "revote_markers";

/// Upper bound on the justification text accompanying a vote change.
pub const MAX_JUSTIFICATION_LEN: usize = 1000;

/// Composite document id for per-(topic, voter) records.
pub fn ledger_key(topic_id: &str, voter_id: &str) -> String {
    format!("{}:{}", topic_id, voter_id)
}

/// One row of the vote ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub topic_id: String,
    pub voter_id: String,
    pub option_id: String,
    pub cast_at: DateTime<Utc>,
}

impl VoteEntry {
    pub fn new(topic_id: &str, voter_id: &str, option_id: &str, cast_at: DateTime<Utc>) -> Self {
        Self {
            id: ledger_key(topic_id, voter_id),
            topic_id: topic_id.to_string(),
            voter_id: voter_id.to_string(),
            option_id: option_id.to_string(),
            cast_at,
        }
    }

    /// Copy of this entry keyed under another topic id (archive snapshots).
    pub fn rekeyed(&self, topic_id: &str) -> Self {
        Self {
            id: ledger_key(topic_id, &self.voter_id),
            topic_id: topic_id.to_string(),
            voter_id: self.voter_id.clone(),
            option_id: self.option_id.clone(),
            cast_at: self.cast_at,
        }
    }
}

/// Record that a voter justified a vote change on a topic.
///
/// Markers are never deleted; a marker predating the topic's current
/// `starts_at` belongs to a previous generation and counts for nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReVoteMarker {
    #[serde(rename = "_id")]
    pub id: String,
    pub topic_id: String,
    pub voter_id: String,
    pub justified_at: DateTime<Utc>,
}

impl ReVoteMarker {
    pub fn new(topic_id: &str, voter_id: &str, justified_at: DateTime<Utc>) -> Self {
        Self {
            id: ledger_key(topic_id, voter_id),
            topic_id: topic_id.to_string(),
            voter_id: voter_id.to_string(),
            justified_at,
        }
    }

    /// Active only within the generation that started at `generation_start`.
    pub fn is_active(&self, generation_start: DateTime<Utc>) -> bool {
        self.justified_at > generation_start
    }
}
