//! Community topic proposals
//!
//! Proposals accumulate votes during the week and are cleared in bulk by
//! the Monday rotation, guarded by the persisted watermark in
//! `RuntimeConfig`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PROPOSAL_COLLECTION: &str = "proposals";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub submitted_by: String,

    #[serde(default)]
    pub votes: i64,

    /// Who already voted; guards the counter against double counting.
    #[serde(default)]
    pub voter_ids: HashSet<String>,

    pub created_at: DateTime<Utc>,
}

impl ProposalDoc {
    pub fn new(title: &str, description: &str, submitted_by: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            submitted_by: submitted_by.to_string(),
            votes: 0,
            voter_ids: HashSet::new(),
            created_at,
        }
    }
}
