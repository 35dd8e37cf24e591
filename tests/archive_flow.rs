//! End-to-end lifecycle scenarios against the in-memory store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use agora::db::batch::{WriteBatch, WriteOp};
use agora::db::schemas::{CommentDoc, ProposalDoc, TopicDoc, TopicKind, TopicOption, TopicStatus};
use agora::db::{MemStore, Store};
use agora::lifecycle::{archive_if_due, cast_vote, check_topics, is_revoter, sweep, ArchiveOutcome};

fn period() -> Duration {
    Duration::days(7)
}

fn end_of_2024() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn topic(id: &str, kind: TopicKind) -> TopicDoc {
    TopicDoc {
        id: id.into(),
        title: format!("Topic {}", id),
        description: "integration".into(),
        options: vec![
            TopicOption { id: "a".into(), text: "Option A".into() },
            TopicOption { id: "b".into(), text: "Option B".into() },
        ],
        kind,
        status: TopicStatus::Published,
        starts_at: end_of_2024() - Duration::days(7),
        ends_at: end_of_2024(),
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

#[tokio::test]
async fn scheduled_trigger_archives_official_topic_with_frozen_counts() {
    let store = MemStore::new();
    seed(&store, topic("t", TopicKind::Official)).await;

    // Five voters: {a: 3, b: 2}, cast through the ledger.
    let vote_day = end_of_2024() - Duration::days(3);
    for (voter, option) in [("v1", "a"), ("v2", "a"), ("v3", "a"), ("v4", "b"), ("v5", "b")] {
        cast_vote(&store, "t", voter, option, None, vote_day).await.unwrap();
    }

    // Shortly after the end time, the scheduled sweep fires.
    let now = end_of_2024() + Duration::seconds(30);
    let report = sweep(&store, now, period()).await;
    assert_eq!(report.archived, 1);

    let archive_id = format!("t_{}", now.timestamp());
    let archive = store.topic(&archive_id).await.unwrap().unwrap();
    assert_eq!(archive.kind, TopicKind::Archive);
    assert_eq!(archive.tally.get("a"), Some(&3));
    assert_eq!(archive.tally.get("b"), Some(&2));
    assert_eq!(archive.total_votes(), 5);
    assert_eq!(store.votes(&archive_id).await.unwrap().len(), 5);

    let live = store.topic("t").await.unwrap().unwrap();
    assert_eq!(live.tally.get("a"), Some(&0));
    assert_eq!(live.tally.get("b"), Some(&0));
    assert_eq!(live.ends_at, now + Duration::days(7));
    assert!(store.votes("t").await.unwrap().is_empty());
}

#[tokio::test]
async fn weekly_topic_comments_move_to_the_archive_id() {
    let store = MemStore::new();
    seed(&store, topic("w", TopicKind::Weekly)).await;

    let created = end_of_2024() - Duration::days(1);
    let mut batch = WriteBatch::new();
    for i in 0..5 {
        batch.push(WriteOp::PutComment(CommentDoc::new(
            "w",
            &format!("author{}", i),
            "discussion",
            Some("pro".into()),
            created,
        )));
    }
    store.commit(batch).await.unwrap();

    let now = end_of_2024() + Duration::minutes(1);
    let outcome = archive_if_due(&store, "w", now, period()).await.unwrap();
    let ArchiveOutcome::Archived { archive_id, .. } = outcome else {
        panic!("expected archival");
    };

    assert_eq!(store.comments("w").await.unwrap().len(), 0);
    assert_eq!(store.comments(&archive_id).await.unwrap().len(), 5);

    // The weekly topic is gone from the live set for good.
    let tombstone = store.topic("w").await.unwrap().unwrap();
    assert_eq!(tombstone.status, TopicStatus::Archived);
    assert!(store.published_topics().await.unwrap().is_empty());
}

#[tokio::test]
async fn generation_rule_lets_a_revoter_start_fresh_after_reset() {
    let store = MemStore::new();
    seed(&store, topic("t", TopicKind::Official)).await;

    let vote_day = end_of_2024() - Duration::days(3);
    cast_vote(&store, "t", "alice", "a", None, vote_day).await.unwrap();
    cast_vote(&store, "t", "alice", "b", Some("reconsidered"), vote_day + Duration::hours(2))
        .await
        .unwrap();

    let first_gen = store.topic("t").await.unwrap().unwrap();
    let marker = store.marker("t", "alice").await.unwrap();
    assert!(is_revoter(&first_gen, marker.as_ref()));

    // Rotate into a new generation.
    let now = end_of_2024() + Duration::seconds(5);
    archive_if_due(&store, "t", now, period()).await.unwrap();

    // The surviving marker predates the new generation: stale.
    let second_gen = store.topic("t").await.unwrap().unwrap();
    let marker = store.marker("t", "alice").await.unwrap();
    assert!(marker.is_some());
    assert!(!is_revoter(&second_gen, marker.as_ref()));

    // First vote of the new generation is free again.
    let outcome = cast_vote(&store, "t", "alice", "a", None, now + Duration::hours(1))
        .await
        .unwrap();
    assert!(!outcome.revote);

    // And a change still demands a justification.
    let err = cast_vote(&store, "t", "alice", "b", None, now + Duration::hours(2))
        .await
        .unwrap_err();
    assert!(matches!(err, agora::AgoraError::JustificationRequired));
}

#[tokio::test]
async fn racing_trigger_sources_agree_on_a_single_archival() {
    let store = Arc::new(MemStore::new());
    seed(&store, topic("t", TopicKind::Weekly)).await;

    let now = end_of_2024() + Duration::seconds(1);
    let ids = vec!["t".to_string()];

    // The scheduled sweep and a viewer-session check race each other.
    let (scheduled, session) = tokio::join!(
        sweep(store.as_ref(), now, period()),
        check_topics(store.as_ref(), &ids, now, period()),
    );

    assert_eq!(
        scheduled.archived + session.archived,
        1,
        "exactly one trigger source may archive"
    );
    assert_eq!(scheduled.failures + session.failures, 0);

    // Whoever lost saw it as already handled or post-archival not-due.
    let commits_after = store.commit_count().await;
    sweep(store.as_ref(), now + Duration::minutes(1), period()).await;
    assert_eq!(store.commit_count().await, commits_after);
}

#[tokio::test]
async fn proposal_rotation_is_idempotent_within_a_day() {
    let store = MemStore::new();

    let created = Utc.with_ymd_and_hms(2025, 1, 3, 12, 0, 0).unwrap();
    let mut batch = WriteBatch::new();
    for i in 0..4 {
        batch.push(WriteOp::PutProposal(ProposalDoc::new(
            &format!("idea {}", i),
            "",
            "someone",
            created,
        )));
    }
    store.commit(batch).await.unwrap();

    // Monday 2025-01-06, first sweep after 09:00 clears proposals.
    let monday_morning = Utc.with_ymd_and_hms(2025, 1, 6, 9, 10, 0).unwrap();
    let first = sweep(&store, monday_morning, period()).await;
    assert!(first.proposals_cleared);
    assert!(store.proposals().await.unwrap().is_empty());

    // A later trigger the same day is a no-op.
    let monday_evening = Utc.with_ymd_and_hms(2025, 1, 6, 20, 0, 0).unwrap();
    let second = sweep(&store, monday_evening, period()).await;
    assert!(!second.proposals_cleared);
}

#[tokio::test]
async fn tally_sum_matches_ledger_through_votes_revotes_and_archival() {
    let store = MemStore::new();
    seed(&store, topic("t", TopicKind::Official)).await;

    let day = end_of_2024() - Duration::days(2);
    cast_vote(&store, "t", "v1", "a", None, day).await.unwrap();
    cast_vote(&store, "t", "v2", "b", None, day).await.unwrap();
    cast_vote(&store, "t", "v3", "a", None, day).await.unwrap();
    cast_vote(&store, "t", "v1", "b", Some("swayed by the thread"), day + Duration::hours(1))
        .await
        .unwrap();

    let live = store.topic("t").await.unwrap().unwrap();
    assert_eq!(live.total_votes(), store.votes("t").await.unwrap().len() as i64);

    let now = end_of_2024() + Duration::seconds(10);
    let ArchiveOutcome::Archived { archive_id, votes_preserved } =
        archive_if_due(&store, "t", now, period()).await.unwrap()
    else {
        panic!("expected archival");
    };

    // Invariant holds on the archived generation too.
    let archive = store.topic(&archive_id).await.unwrap().unwrap();
    assert_eq!(archive.total_votes(), votes_preserved);
    assert_eq!(
        archive.total_votes(),
        store.votes(&archive_id).await.unwrap().len() as i64
    );
}
