//! In-memory store
//!
//! Backs unit tests and `--dev-mode` runs without MongoDB. A single
//! `RwLock` over plain maps makes every batch inherently atomic: the
//! validation pass and the apply pass run under one write guard, so a
//! failed guard leaves nothing behind and concurrent committers serialize.
//!
//! Commits are counted so tests can assert that an idempotent retry
//! performed zero additional writes.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::batch::{WriteBatch, WriteOp};
use crate::db::schemas::{
    ledger_key, CommentDoc, JustificationDoc, ProposalDoc, ReVoteMarker, RuntimeConfig, TopicDoc,
    VoteEntry,
};
use crate::db::store::Store;
use crate::types::{AgoraError, Result};

#[derive(Default)]
struct MemInner {
    topics: HashMap<String, TopicDoc>,
    /// Keyed by ledger key `{topic_id}:{voter_id}`.
    votes: HashMap<String, VoteEntry>,
    markers: HashMap<String, ReVoteMarker>,
    comments: HashMap<(String, String), CommentDoc>,
    justifications: HashMap<(String, String), JustificationDoc>,
    proposals: HashMap<String, ProposalDoc>,
    config: Option<RuntimeConfig>,
    commits: u64,
}

/// In-memory `Store`; not persisted across restarts.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<MemInner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successfully committed batches so far.
    pub async fn commit_count(&self) -> u64 {
        self.inner.read().await.commits
    }
}

/// Check that every op can apply against the current state. Runs before
/// any mutation so a rejected batch leaves the store untouched.
fn validate(inner: &MemInner, ops: &[WriteOp]) -> Result<()> {
    for op in ops {
        match op {
            WriteOp::GuardNotArchived { topic_id } => {
                let topic = inner.topics.get(topic_id).ok_or_else(|| {
                    AgoraError::PreconditionFailed(format!("topic {} does not exist", topic_id))
                })?;
                if topic.is_archived() {
                    return Err(AgoraError::PreconditionFailed(format!(
                        "topic {} is already archived",
                        topic_id
                    )));
                }
            }
            WriteOp::AdjustTally { topic_id, .. }
            | WriteOp::AddParticipant { topic_id, .. }
            | WriteOp::AdjustLikes { topic_id, .. } => {
                if !inner.topics.contains_key(topic_id) {
                    return Err(AgoraError::Database(format!("no such topic: {}", topic_id)));
                }
            }
            WriteOp::BumpComment { topic_id, comment_id, .. } => {
                let key = (topic_id.clone(), comment_id.clone());
                if !inner.comments.contains_key(&key) {
                    return Err(AgoraError::Database(format!("no such comment: {}", comment_id)));
                }
            }
            WriteOp::VoteProposal { proposal_id, .. } => {
                if !inner.proposals.contains_key(proposal_id) {
                    return Err(AgoraError::Database(format!(
                        "no such proposal: {}",
                        proposal_id
                    )));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn apply(inner: &mut MemInner, ops: Vec<WriteOp>) {
    for op in ops {
        match op {
            WriteOp::GuardNotArchived { .. } => {}

            WriteOp::PutTopic(topic) => {
                inner.topics.insert(topic.id.clone(), topic);
            }

            WriteOp::PutVote(entry) => {
                inner.votes.insert(entry.id.clone(), entry);
            }
            WriteOp::DeleteVotes { topic_id } => {
                inner.votes.retain(|_, v| v.topic_id != topic_id);
            }
            WriteOp::PutMarker(marker) => {
                inner.markers.insert(marker.id.clone(), marker);
            }

            WriteOp::PutComment(comment) => {
                inner
                    .comments
                    .insert((comment.topic_id.clone(), comment.id.clone()), comment);
            }
            WriteOp::DeleteComment { topic_id, comment_id } => {
                inner.comments.remove(&(topic_id, comment_id));
            }
            WriteOp::PutJustification(post) => {
                inner
                    .justifications
                    .insert((post.topic_id.clone(), post.id.clone()), post);
            }
            WriteOp::DeleteJustification { topic_id, justification_id } => {
                inner.justifications.remove(&(topic_id, justification_id));
            }

            WriteOp::AdjustTally { topic_id, deltas } => {
                if let Some(topic) = inner.topics.get_mut(&topic_id) {
                    for (option_id, delta) in deltas {
                        *topic.tally.entry(option_id).or_insert(0) += delta;
                    }
                }
            }
            WriteOp::AddParticipant { topic_id, voter_id } => {
                if let Some(topic) = inner.topics.get_mut(&topic_id) {
                    topic.voters.insert(voter_id);
                }
            }
            WriteOp::AdjustLikes { topic_id, delta } => {
                if let Some(topic) = inner.topics.get_mut(&topic_id) {
                    topic.likes += delta;
                }
            }
            WriteOp::BumpComment { topic_id, comment_id, likes, reports } => {
                if let Some(comment) = inner.comments.get_mut(&(topic_id, comment_id)) {
                    comment.likes += likes;
                    comment.reports += reports;
                }
            }

            WriteOp::PutProposal(proposal) => {
                inner.proposals.insert(proposal.id.clone(), proposal);
            }
            WriteOp::VoteProposal { proposal_id, voter_id } => {
                if let Some(proposal) = inner.proposals.get_mut(&proposal_id) {
                    if proposal.voter_ids.insert(voter_id) {
                        proposal.votes += 1;
                    }
                }
            }
            WriteOp::DeleteProposals => {
                inner.proposals.clear();
            }

            WriteOp::SetPhaseOverride(phase) => {
                let config = inner.config.get_or_insert_with(RuntimeConfig::default);
                config.phase_override = phase;
            }
            WriteOp::SetProposalWatermark(at) => {
                let config = inner.config.get_or_insert_with(RuntimeConfig::default);
                config.last_proposal_clear = Some(at);
            }
        }
    }
}

#[async_trait]
impl Store for MemStore {
    async fn topic(&self, topic_id: &str) -> Result<Option<TopicDoc>> {
        Ok(self.inner.read().await.topics.get(topic_id).cloned())
    }

    async fn published_topics(&self) -> Result<Vec<TopicDoc>> {
        let inner = self.inner.read().await;
        let mut topics: Vec<TopicDoc> = inner
            .topics
            .values()
            .filter(|t| t.status == crate::db::schemas::TopicStatus::Published)
            .cloned()
            .collect();
        topics.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(topics)
    }

    async fn vote(&self, topic_id: &str, voter_id: &str) -> Result<Option<VoteEntry>> {
        let key = ledger_key(topic_id, voter_id);
        Ok(self.inner.read().await.votes.get(&key).cloned())
    }

    async fn votes(&self, topic_id: &str) -> Result<Vec<VoteEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .votes
            .values()
            .filter(|v| v.topic_id == topic_id)
            .cloned()
            .collect())
    }

    async fn marker(&self, topic_id: &str, voter_id: &str) -> Result<Option<ReVoteMarker>> {
        let key = ledger_key(topic_id, voter_id);
        Ok(self.inner.read().await.markers.get(&key).cloned())
    }

    async fn comments(&self, topic_id: &str) -> Result<Vec<CommentDoc>> {
        let inner = self.inner.read().await;
        let mut comments: Vec<CommentDoc> = inner
            .comments
            .values()
            .filter(|c| c.topic_id == topic_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn justifications(&self, topic_id: &str) -> Result<Vec<JustificationDoc>> {
        let inner = self.inner.read().await;
        let mut posts: Vec<JustificationDoc> = inner
            .justifications
            .values()
            .filter(|j| j.topic_id == topic_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(posts)
    }

    async fn proposals(&self) -> Result<Vec<ProposalDoc>> {
        let inner = self.inner.read().await;
        let mut proposals: Vec<ProposalDoc> = inner.proposals.values().cloned().collect();
        proposals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(proposals)
    }

    async fn runtime_config(&self) -> Result<RuntimeConfig> {
        Ok(self.inner.read().await.config.clone().unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut inner = self.inner.write().await;
        validate(&inner, batch.ops())?;
        apply(&mut inner, batch.into_ops());
        inner.commits += 1;
        Ok(())
    }
}
