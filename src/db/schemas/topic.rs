//! Topic documents
//!
//! A topic is one voting/discussion unit. Official topics keep a permanent
//! identity and are reset in place each rotation; weekly topics are retired
//! permanently; archive records are immutable snapshots except for their
//! `likes` counter.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TOPIC_COLLECTION: &str = "topics";

/// Closed topic kind. Unknown strings fail deserialization at the store
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicKind {
    Official,
    Weekly,
    Archive,
}

/// Closed lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicStatus {
    Published,
    Pending,
    Archived,
}

/// One selectable option on a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicOption {
    pub id: String,
    pub text: String,
}

/// Topic document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicDoc {
    #[serde(rename = "_id")]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Ordered option list; order is display order.
    pub options: Vec<TopicOption>,

    pub kind: TopicKind,
    pub status: TopicStatus,

    /// Start of the current generation. Advanced on every official reset,
    /// which is what invalidates prior-generation re-vote markers.
    pub starts_at: DateTime<Utc>,

    /// End of the voting window; once elapsed the topic is due for archival.
    pub ends_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announce_at: Option<DateTime<Utc>>,

    /// Per-option vote counters. Invariant: the sum equals the number of
    /// ledger entries for this topic id.
    #[serde(default)]
    pub tally: HashMap<String, i64>,

    /// Voters who have participated this generation.
    #[serde(default)]
    pub voters: HashSet<String>,

    #[serde(default)]
    pub likes: i64,

    /// On snapshots: the live topic this was archived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_from: Option<String>,

    /// On retired weekly topics: the snapshot that holds their history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_into: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotated_at: Option<DateTime<Utc>>,
}

impl TopicDoc {
    pub fn has_option(&self, option_id: &str) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }

    /// Sum of the per-option counters.
    pub fn total_votes(&self) -> i64 {
        self.tally.values().sum()
    }

    /// Archived in either sense: an archive snapshot, or a live document
    /// that has been closed. Archival never reverses, which is what makes
    /// the lock-free check-then-act safe.
    pub fn is_archived(&self) -> bool {
        self.kind == TopicKind::Archive || self.status == TopicStatus::Archived
    }

    /// Eligible for the archive transaction right now.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == TopicStatus::Published
            && self.kind != TopicKind::Archive
            && self.ends_at <= now
    }

    /// Identifier for the snapshot produced when this topic rotates at
    /// `rotated_at`: `{id}_{unix_seconds}`.
    pub fn archive_id(&self, rotated_at: DateTime<Utc>) -> String {
        format!("{}_{}", self.id, rotated_at.timestamp())
    }

    /// A tally with every option present and zeroed, for generation resets.
    pub fn zeroed_tally(&self) -> HashMap<String, i64> {
        self.options.iter().map(|o| (o.id.clone(), 0)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn topic(kind: TopicKind, status: TopicStatus) -> TopicDoc {
        TopicDoc {
            id: "t1".into(),
            title: "Example".into(),
            description: String::new(),
            options: vec![
                TopicOption { id: "a".into(), text: "A".into() },
                TopicOption { id: "b".into(), text: "B".into() },
            ],
            kind,
            status,
            starts_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).unwrap(),
            announce_at: None,
            tally: HashMap::from([("a".into(), 3), ("b".into(), 2)]),
            voters: HashSet::new(),
            likes: 0,
            archived_from: None,
            archived_into: None,
            rotated_at: None,
        }
    }

    #[test]
    fn due_only_when_published_live_and_elapsed() {
        let t = topic(TopicKind::Official, TopicStatus::Published);
        let before = Utc.with_ymd_and_hms(2025, 1, 7, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 1).unwrap();

        assert!(!t.is_due(before));
        assert!(t.is_due(after));
        assert!(!topic(TopicKind::Official, TopicStatus::Pending).is_due(after));
        assert!(!topic(TopicKind::Archive, TopicStatus::Archived).is_due(after));
    }

    #[test]
    fn archive_id_embeds_rotation_timestamp() {
        let t = topic(TopicKind::Weekly, TopicStatus::Published);
        let at = Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).unwrap();
        assert_eq!(t.archive_id(at), format!("t1_{}", at.timestamp()));
    }

    #[test]
    fn unknown_kind_is_rejected_at_the_boundary() {
        let json = serde_json::json!({
            "_id": "t1",
            "title": "Example",
            "options": [],
            "kind": "seasonal",
            "status": "published",
            "starts_at": "2025-01-01T00:00:00Z",
            "ends_at": "2025-01-08T00:00:00Z",
        });
        assert!(serde_json::from_value::<TopicDoc>(json).is_err());
    }

    #[test]
    fn zeroed_tally_covers_every_option() {
        let t = topic(TopicKind::Official, TopicStatus::Published);
        let zeroed = t.zeroed_tally();
        assert_eq!(zeroed.len(), 2);
        assert!(zeroed.values().all(|v| *v == 0));
    }
}
