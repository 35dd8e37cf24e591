//! Archive-and-rotate transaction
//!
//! Moves an elapsed topic's current generation into an immutable snapshot
//! and either resets the live record in place (official topics) or closes
//! it permanently (weekly topics). The whole unit - snapshot, ledger copy,
//! comment/justification relocation, live-record resolution - commits as
//! one batch carrying a `GuardNotArchived` op, so of any number of
//! concurrent triggers exactly one commit takes effect and the rest
//! observe `PreconditionFailed` and report the topic as already handled.
//!
//! Exactly one `kind=archive` record is created per rotation: the
//! snapshot. A retired weekly topic keeps `kind=weekly` and becomes a
//! `status=archived` tombstone pointing at its snapshot via
//! `archived_into`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::db::batch::{WriteBatch, WriteOp};
use crate::db::schemas::{TopicDoc, TopicKind, TopicStatus};
use crate::db::store::Store;
use crate::types::{AgoraError, Result};

/// Result of one archival attempt
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ArchiveOutcome {
    /// This caller won: the snapshot exists and the live record was
    /// resolved.
    Archived { archive_id: String, votes_preserved: i64 },
    /// Another caller got there first (or the record was archived all
    /// along). Success as far as the trigger is concerned.
    AlreadyHandled,
    /// Voting window not yet elapsed, or the topic is not published.
    NotDue,
}

/// Fetch a topic by id and archive it if due.
pub async fn archive_if_due(
    store: &dyn Store,
    topic_id: &str,
    now: DateTime<Utc>,
    period: Duration,
) -> Result<ArchiveOutcome> {
    let topic = store
        .topic(topic_id)
        .await?
        .ok_or_else(|| AgoraError::NotFound(format!("topic {}", topic_id)))?;
    archive_topic(store, &topic, now, period).await
}

/// Archive an already-loaded topic if due.
///
/// The precondition check here is advisory (it lets redundant triggers
/// bail out cheaply); the authoritative check is the guard op inside the
/// committed batch.
pub async fn archive_topic(
    store: &dyn Store,
    topic: &TopicDoc,
    now: DateTime<Utc>,
    period: Duration,
) -> Result<ArchiveOutcome> {
    if topic.id.is_empty() {
        return Err(AgoraError::MissingIdentifier("topic without id".to_string()));
    }
    if topic.is_archived() {
        return Ok(ArchiveOutcome::AlreadyHandled);
    }
    if !topic.is_due(now) {
        return Ok(ArchiveOutcome::NotDue);
    }

    // Read the dependent records before building the batch; the guard op
    // protects against the state moving between here and the commit.
    let votes = store.votes(&topic.id).await?;
    let comments = store.comments(&topic.id).await?;
    let justifications = store.justifications(&topic.id).await?;

    let votes_preserved = topic.total_votes();
    if votes_preserved != votes.len() as i64 {
        warn!(
            topic_id = %topic.id,
            tally = votes_preserved,
            ledger = votes.len(),
            "Tally/ledger mismatch at rotation; archiving counters as read"
        );
    }

    let archive_id = topic.archive_id(now);

    let mut snapshot = topic.clone();
    snapshot.id = archive_id.clone();
    snapshot.kind = TopicKind::Archive;
    snapshot.status = TopicStatus::Archived;
    snapshot.ends_at = now;
    snapshot.likes = 0;
    snapshot.archived_from = Some(topic.id.clone());
    snapshot.archived_into = None;
    snapshot.rotated_at = Some(now);

    let mut batch = WriteBatch::new();
    batch.push(WriteOp::GuardNotArchived { topic_id: topic.id.clone() });
    batch.push(WriteOp::PutTopic(snapshot));

    // Preserve who-voted-what for the archived generation.
    for vote in &votes {
        batch.push(WriteOp::PutVote(vote.rekeyed(&archive_id)));
    }

    // Relocate discussion records: copy under the archive id, delete from
    // the live id. Move semantics, not duplication.
    for comment in &comments {
        batch.push(WriteOp::PutComment(comment.relocated(&archive_id)));
        batch.push(WriteOp::DeleteComment {
            topic_id: topic.id.clone(),
            comment_id: comment.id.clone(),
        });
    }
    for post in &justifications {
        batch.push(WriteOp::PutJustification(post.relocated(&archive_id)));
        batch.push(WriteOp::DeleteJustification {
            topic_id: topic.id.clone(),
            justification_id: post.id.clone(),
        });
    }

    match topic.kind {
        TopicKind::Official => {
            // Reset in place: same identity, fresh generation. Clearing the
            // live ledger is safe because it was copied under the archive
            // id above; prior-generation re-vote markers go stale by the
            // starts_at comparison rather than by deletion.
            let mut reset = topic.clone();
            reset.starts_at = now;
            reset.ends_at = now + period;
            reset.tally = topic.zeroed_tally();
            reset.voters = Default::default();
            batch.push(WriteOp::PutTopic(reset));
            batch.push(WriteOp::DeleteVotes { topic_id: topic.id.clone() });
        }
        TopicKind::Weekly => {
            // Close permanently. The tombstone keeps its frozen ledger and
            // counters; the snapshot is the authoritative archive record.
            let mut closed = topic.clone();
            closed.status = TopicStatus::Archived;
            closed.archived_into = Some(archive_id.clone());
            closed.rotated_at = Some(now);
            batch.push(WriteOp::PutTopic(closed));
        }
        TopicKind::Archive => unreachable!("archived topics returned AlreadyHandled above"),
    }

    match store.commit(batch).await {
        Ok(()) => {
            info!(
                topic_id = %topic.id,
                archive_id = %archive_id,
                votes = votes_preserved,
                kind = ?topic.kind,
                "Topic rotated into archive"
            );
            Ok(ArchiveOutcome::Archived { archive_id, votes_preserved })
        }
        // Lost the race to a concurrent trigger; their commit counts.
        Err(AgoraError::PreconditionFailed(_)) => Ok(ArchiveOutcome::AlreadyHandled),
        Err(e) => Err(e),
    }
}
