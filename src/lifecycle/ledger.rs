//! Vote ledger
//!
//! One live entry per (topic, voter). The first vote is free; changing it
//! requires a non-empty justification in the same request - there is no
//! silent overwrite. An accepted change adjusts exactly the old and new
//! option counters by one (as atomic deltas), overwrites the ledger entry,
//! refreshes the re-vote marker, and files the justification as a post
//! under the topic, all in a single batch.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::db::batch::{WriteBatch, WriteOp};
use crate::db::schemas::{
    JustificationDoc, ReVoteMarker, TopicDoc, VoteEntry, MAX_JUSTIFICATION_LEN,
};
use crate::db::store::Store;
use crate::types::{AgoraError, Result};

/// What a successful `cast_vote` did
#[derive(Debug, Clone, Serialize)]
pub struct VoteOutcome {
    pub topic_id: String,
    pub option_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_option: Option<String>,
    pub revote: bool,
}

/// Whether the voter counts as a re-voter for this topic's current
/// generation. A marker left over from before the last reset is stale.
pub fn is_revoter(topic: &TopicDoc, marker: Option<&ReVoteMarker>) -> bool {
    marker.map(|m| m.is_active(topic.starts_at)).unwrap_or(false)
}

/// A guard failure at commit time means the topic closed between the read
/// and the commit; to the voter that is simply a closed topic.
fn closed_on_guard(topic_id: &str, err: AgoraError) -> AgoraError {
    match err {
        AgoraError::PreconditionFailed(_) => AgoraError::TopicClosed(topic_id.to_string()),
        other => other,
    }
}

/// Cast or change a vote.
///
/// Failure modes leave the store untouched: `TopicClosed` on archived
/// topics, `UnknownOption` for option ids the topic does not carry,
/// `JustificationRequired` when a change arrives without one, `BadRequest`
/// for over-long justifications or a re-select of the current option.
pub async fn cast_vote(
    store: &dyn Store,
    topic_id: &str,
    voter_id: &str,
    option_id: &str,
    justification: Option<&str>,
    now: DateTime<Utc>,
) -> Result<VoteOutcome> {
    let topic = store
        .topic(topic_id)
        .await?
        .ok_or_else(|| AgoraError::NotFound(format!("topic {}", topic_id)))?;

    if topic.is_archived() {
        return Err(AgoraError::TopicClosed(topic_id.to_string()));
    }
    if !topic.has_option(option_id) {
        return Err(AgoraError::UnknownOption(option_id.to_string()));
    }

    let existing = store.vote(topic_id, voter_id).await?;

    let mut batch = WriteBatch::new();
    batch.push(WriteOp::GuardNotArchived { topic_id: topic_id.to_string() });

    match existing {
        None => {
            batch.push(WriteOp::PutVote(VoteEntry::new(topic_id, voter_id, option_id, now)));
            batch.push(WriteOp::AdjustTally {
                topic_id: topic_id.to_string(),
                deltas: vec![(option_id.to_string(), 1)],
            });
            batch.push(WriteOp::AddParticipant {
                topic_id: topic_id.to_string(),
                voter_id: voter_id.to_string(),
            });
            store.commit(batch).await.map_err(|e| closed_on_guard(topic_id, e))?;

            debug!(topic_id = %topic_id, option_id = %option_id, "Vote recorded");
            Ok(VoteOutcome {
                topic_id: topic_id.to_string(),
                option_id: option_id.to_string(),
                previous_option: None,
                revote: false,
            })
        }
        Some(previous) => {
            if previous.option_id == option_id {
                return Err(AgoraError::BadRequest(
                    "vote unchanged: already cast for this option".to_string(),
                ));
            }

            let justification = justification
                .map(str::trim)
                .filter(|j| !j.is_empty())
                .ok_or(AgoraError::JustificationRequired)?;
            if justification.chars().count() > MAX_JUSTIFICATION_LEN {
                return Err(AgoraError::BadRequest(format!(
                    "justification exceeds {} characters",
                    MAX_JUSTIFICATION_LEN
                )));
            }

            batch.push(WriteOp::PutVote(VoteEntry::new(topic_id, voter_id, option_id, now)));
            batch.push(WriteOp::AdjustTally {
                topic_id: topic_id.to_string(),
                deltas: vec![
                    (previous.option_id.clone(), -1),
                    (option_id.to_string(), 1),
                ],
            });
            batch.push(WriteOp::PutMarker(ReVoteMarker::new(topic_id, voter_id, now)));
            batch.push(WriteOp::PutJustification(JustificationDoc::new(
                topic_id,
                voter_id,
                option_id,
                justification,
                now,
            )));
            store.commit(batch).await.map_err(|e| closed_on_guard(topic_id, e))?;

            info!(
                topic_id = %topic_id,
                from = %previous.option_id,
                to = %option_id,
                "Vote changed with justification"
            );
            Ok(VoteOutcome {
                topic_id: topic_id.to_string(),
                option_id: option_id.to_string(),
                previous_option: Some(previous.option_id),
                revote: true,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{TopicKind, TopicOption, TopicStatus};
    use crate::db::MemStore;
    use chrono::TimeZone;
    use std::collections::{HashMap, HashSet};

    fn topic(id: &str) -> TopicDoc {
        TopicDoc {
            id: id.into(),
            title: "Which mascot?".into(),
            description: String::new(),
            options: vec![
                TopicOption { id: "a".into(), text: "Crab".into() },
                TopicOption { id: "b".into(), text: "Gopher".into() },
            ],
            kind: TopicKind::Official,
            status: TopicStatus::Published,
            starts_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).unwrap(),
            announce_at: None,
            tally: HashMap::new(),
            voters: HashSet::new(),
            likes: 0,
            archived_from: None,
            archived_into: None,
            rotated_at: None,
        }
    }

    async fn seed(store: &MemStore, t: TopicDoc) {
        store.commit(vec![WriteOp::PutTopic(t)].into()).await.unwrap();
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn first_vote_needs_no_justification() {
        let store = MemStore::new();
        seed(&store, topic("t1")).await;

        let outcome = cast_vote(&store, "t1", "alice", "a", None, at(2, 12)).await.unwrap();
        assert!(!outcome.revote);

        let t = store.topic("t1").await.unwrap().unwrap();
        assert_eq!(t.tally.get("a"), Some(&1));
        assert!(t.voters.contains("alice"));
        assert_eq!(store.votes("t1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn revote_without_justification_rejected_and_unchanged() {
        let store = MemStore::new();
        seed(&store, topic("t1")).await;
        cast_vote(&store, "t1", "alice", "a", None, at(2, 12)).await.unwrap();

        for justification in [None, Some(""), Some("   ")] {
            let err = cast_vote(&store, "t1", "alice", "b", justification, at(2, 13))
                .await
                .unwrap_err();
            assert!(matches!(err, AgoraError::JustificationRequired));
        }

        let t = store.topic("t1").await.unwrap().unwrap();
        assert_eq!(t.tally.get("a"), Some(&1));
        assert_eq!(t.tally.get("b"), None);
        assert_eq!(
            store.vote("t1", "alice").await.unwrap().unwrap().option_id,
            "a"
        );
    }

    #[tokio::test]
    async fn accepted_revote_swaps_exactly_one_each_way() {
        let store = MemStore::new();
        seed(&store, topic("t1")).await;
        cast_vote(&store, "t1", "alice", "a", None, at(2, 12)).await.unwrap();
        cast_vote(&store, "t1", "bob", "a", None, at(2, 12)).await.unwrap();

        let outcome = cast_vote(&store, "t1", "alice", "b", Some("changed my mind"), at(2, 14))
            .await
            .unwrap();
        assert!(outcome.revote);
        assert_eq!(outcome.previous_option.as_deref(), Some("a"));

        let t = store.topic("t1").await.unwrap().unwrap();
        assert_eq!(t.tally.get("a"), Some(&1));
        assert_eq!(t.tally.get("b"), Some(&1));

        // Tally sum still equals the ledger size.
        assert_eq!(t.total_votes(), store.votes("t1").await.unwrap().len() as i64);

        // Marker refreshed, justification filed.
        let marker = store.marker("t1", "alice").await.unwrap().unwrap();
        assert_eq!(marker.justified_at, at(2, 14));
        assert_eq!(store.justifications("t1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn marker_refreshes_on_each_change() {
        let store = MemStore::new();
        seed(&store, topic("t1")).await;
        cast_vote(&store, "t1", "alice", "a", None, at(2, 12)).await.unwrap();
        cast_vote(&store, "t1", "alice", "b", Some("one"), at(2, 14)).await.unwrap();
        cast_vote(&store, "t1", "alice", "a", Some("two"), at(2, 16)).await.unwrap();

        let marker = store.marker("t1", "alice").await.unwrap().unwrap();
        assert_eq!(marker.justified_at, at(2, 16));

        let t = store.topic("t1").await.unwrap().unwrap();
        assert_eq!(t.tally.get("a"), Some(&1));
        assert_eq!(t.tally.get("b"), Some(&0));
    }

    #[tokio::test]
    async fn stale_marker_does_not_make_a_revoter() {
        let store = MemStore::new();
        let mut t = topic("t1");
        // Generation restarted after the marker below was written.
        t.starts_at = at(8, 0);
        seed(&store, t.clone()).await;
        store
            .commit(vec![WriteOp::PutMarker(ReVoteMarker::new("t1", "alice", at(2, 14)))].into())
            .await
            .unwrap();

        let marker = store.marker("t1", "alice").await.unwrap();
        assert!(!is_revoter(&t, marker.as_ref()));

        // Ledger was cleared by the reset, so this is a free first vote.
        let outcome = cast_vote(&store, "t1", "alice", "a", None, at(9, 12)).await.unwrap();
        assert!(!outcome.revote);
    }

    #[tokio::test]
    async fn unknown_option_and_closed_topic_rejected() {
        let store = MemStore::new();
        seed(&store, topic("t1")).await;
        let mut closed = topic("t2");
        closed.status = TopicStatus::Archived;
        seed(&store, closed).await;

        let err = cast_vote(&store, "t1", "alice", "zz", None, at(2, 12)).await.unwrap_err();
        assert!(matches!(err, AgoraError::UnknownOption(_)));

        let err = cast_vote(&store, "t2", "alice", "a", None, at(2, 12)).await.unwrap_err();
        assert!(matches!(err, AgoraError::TopicClosed(_)));
    }

    #[tokio::test]
    async fn reselecting_the_same_option_is_rejected() {
        let store = MemStore::new();
        seed(&store, topic("t1")).await;
        cast_vote(&store, "t1", "alice", "a", None, at(2, 12)).await.unwrap();

        let err = cast_vote(&store, "t1", "alice", "a", Some("still a"), at(2, 13))
            .await
            .unwrap_err();
        assert!(matches!(err, AgoraError::BadRequest(_)));

        let t = store.topic("t1").await.unwrap().unwrap();
        assert_eq!(t.tally.get("a"), Some(&1));
    }

    #[tokio::test]
    async fn overlong_justification_rejected() {
        let store = MemStore::new();
        seed(&store, topic("t1")).await;
        cast_vote(&store, "t1", "alice", "a", None, at(2, 12)).await.unwrap();

        let long = "x".repeat(MAX_JUSTIFICATION_LEN + 1);
        let err = cast_vote(&store, "t1", "alice", "b", Some(&long), at(2, 13))
            .await
            .unwrap_err();
        assert!(matches!(err, AgoraError::BadRequest(_)));
        assert!(store.justifications("t1").await.unwrap().is_empty());
    }
}
