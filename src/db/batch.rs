//! Write batches
//!
//! Every mutation in Agora is expressed as an ordered `WriteBatch` of
//! `WriteOp`s submitted to `Store::commit` as one all-or-nothing unit.
//! Counter changes are deltas and participant additions are set unions, so
//! backends can map them onto atomic primitives instead of read-modify-write.
//!
//! `GuardNotArchived` is the commit-time idempotency guard: the batch only
//! succeeds if the named topic is still not archived, evaluated atomically
//! with the batch itself. Archival never reverses, so a guard that passes
//! at commit time cannot be invalidated retroactively.

use chrono::{DateTime, Utc};

use crate::db::schemas::{
    CommentDoc, JustificationDoc, ProposalDoc, ReVoteMarker, TopicDoc, VoteEntry,
};
use crate::phase::Phase;

#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Fail the whole batch with `PreconditionFailed` unless the topic is
    /// still live (kind != archive, status != archived).
    GuardNotArchived { topic_id: String },

    PutTopic(TopicDoc),

    PutVote(VoteEntry),
    /// Remove every ledger entry under a topic id.
    DeleteVotes { topic_id: String },
    PutMarker(ReVoteMarker),

    PutComment(CommentDoc),
    DeleteComment { topic_id: String, comment_id: String },
    PutJustification(JustificationDoc),
    DeleteJustification { topic_id: String, justification_id: String },

    /// Atomic per-option counter deltas on a topic's tally.
    AdjustTally { topic_id: String, deltas: Vec<(String, i64)> },
    /// Atomic set-union of one voter into the topic's participant set.
    AddParticipant { topic_id: String, voter_id: String },
    /// The one mutation archive records admit.
    AdjustLikes { topic_id: String, delta: i64 },
    /// Atomic like/report counter deltas on a comment.
    BumpComment { topic_id: String, comment_id: String, likes: i64, reports: i64 },

    PutProposal(ProposalDoc),
    /// Count a proposal vote once per voter (set-guarded increment).
    VoteProposal { proposal_id: String, voter_id: String },
    DeleteProposals,

    SetPhaseOverride(Option<Phase>),
    SetProposalWatermark(DateTime<Utc>),
}

/// Ordered list of operations committed as one unit.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl From<Vec<WriteOp>> for WriteBatch {
    fn from(ops: Vec<WriteOp>) -> Self {
        Self { ops }
    }
}
