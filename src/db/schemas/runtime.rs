//! Process-wide runtime configuration document
//!
//! A singleton record holding the administrative phase override and the
//! proposal-rotation watermark. The core only ever reads the override;
//! writes come through the admin route.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::phase::Phase;

pub const CONFIG_COLLECTION: &str = "runtime_config";
pub const CONFIG_DOC_ID: &str = "global";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(rename = "_id")]
    pub id: String,

    /// When set, short-circuits the phase clock unconditionally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_override: Option<Phase>,

    /// When proposals were last cleared; compared by calendar day so
    /// repeated Monday triggers are no-ops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_proposal_clear: Option<DateTime<Utc>>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            id: CONFIG_DOC_ID.to_string(),
            phase_override: None,
            last_proposal_clear: None,
        }
    }
}
