//! Document schemas for the Agora store
//!
//! Every record type carries its collection name alongside it. The
//! `kind`/`status` fields deserialize into closed enums, so unrecognized
//! values are rejected at the store boundary instead of leaking inward as
//! strings.

mod comment;
mod proposal;
mod runtime;
mod topic;
mod vote;

pub use comment::{CommentDoc, JustificationDoc, COMMENT_COLLECTION, JUSTIFICATION_COLLECTION};
pub use proposal::{ProposalDoc, PROPOSAL_COLLECTION};
pub use runtime::{RuntimeConfig, CONFIG_COLLECTION, CONFIG_DOC_ID};
pub use topic::{TopicDoc, TopicKind, TopicOption, TopicStatus, TOPIC_COLLECTION};
pub use vote::{
    ledger_key, ReVoteMarker, VoteEntry, MARKER_COLLECTION, MAX_JUSTIFICATION_LEN, VOTE_COLLECTION,
};
