//! The `Store` trait
//!
//! Typed reads per collection plus a single transactional `commit`. All
//! mutations - vote casting, archival, rotation, admin writes - go through
//! `commit` so that every backend applies them with the same atomicity and
//! guard semantics.

use async_trait::async_trait;

use crate::db::batch::WriteBatch;
use crate::db::schemas::{
    CommentDoc, JustificationDoc, ProposalDoc, ReVoteMarker, RuntimeConfig, TopicDoc, VoteEntry,
};
use crate::types::Result;

#[async_trait]
pub trait Store: Send + Sync {
    async fn topic(&self, topic_id: &str) -> Result<Option<TopicDoc>>;

    /// All topics with status=published, malformed records skipped.
    async fn published_topics(&self) -> Result<Vec<TopicDoc>>;

    async fn vote(&self, topic_id: &str, voter_id: &str) -> Result<Option<VoteEntry>>;
    async fn votes(&self, topic_id: &str) -> Result<Vec<VoteEntry>>;
    async fn marker(&self, topic_id: &str, voter_id: &str) -> Result<Option<ReVoteMarker>>;

    async fn comments(&self, topic_id: &str) -> Result<Vec<CommentDoc>>;
    async fn justifications(&self, topic_id: &str) -> Result<Vec<JustificationDoc>>;

    async fn proposals(&self) -> Result<Vec<ProposalDoc>>;

    /// The singleton runtime config; a default document when none exists.
    async fn runtime_config(&self) -> Result<RuntimeConfig>;

    /// Apply the batch as one all-or-nothing unit.
    ///
    /// Returns `PreconditionFailed` when a `GuardNotArchived` op finds its
    /// topic already archived, and `BatchCommitFailed` when the backing
    /// store rejects the commit; in both cases nothing was applied.
    async fn commit(&self, batch: WriteBatch) -> Result<()>;
}
