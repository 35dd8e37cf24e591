//! Weekly proposal rotation
//!
//! Community proposals are cleared in bulk once the new cycle opens on
//! Monday morning. A persisted watermark makes repeated triggers within
//! the same day no-ops; the watermark is written even when there was
//! nothing to delete, so the next tick's check stays a pure date
//! comparison.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use tracing::{debug, info};

use crate::db::batch::{WriteBatch, WriteOp};
use crate::db::store::Store;
use crate::phase::CYCLE_OPENS_HOUR;
use crate::types::Result;

/// Clear all proposals if the rotation is due. Returns whether a clear
/// happened on this invocation.
pub async fn rotate_proposals_if_due(store: &dyn Store, now: DateTime<Utc>) -> Result<bool> {
    if now.weekday() != Weekday::Mon || now.hour() < CYCLE_OPENS_HOUR {
        return Ok(false);
    }

    let config = store.runtime_config().await?;
    if let Some(last) = config.last_proposal_clear {
        if last.date_naive() == now.date_naive() {
            debug!("Proposal rotation already ran today");
            return Ok(false);
        }
    }

    let count = store.proposals().await?.len();

    let mut batch = WriteBatch::new();
    batch.push(WriteOp::DeleteProposals);
    batch.push(WriteOp::SetProposalWatermark(now));
    store.commit(batch).await?;

    info!(cleared = count, "Proposal rotation complete");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::ProposalDoc;
    use crate::db::MemStore;
    use chrono::TimeZone;

    fn monday(hour: u32, minute: u32) -> DateTime<Utc> {
        // 2025-01-06 is a Monday.
        Utc.with_ymd_and_hms(2025, 1, 6, hour, minute, 0).unwrap()
    }

    async fn seed_proposals(store: &MemStore, n: usize) {
        let created = Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap();
        let mut batch = WriteBatch::new();
        for i in 0..n {
            batch.push(WriteOp::PutProposal(ProposalDoc::new(
                &format!("proposal {}", i),
                "",
                "someone",
                created,
            )));
        }
        store.commit(batch).await.unwrap();
    }

    #[tokio::test]
    async fn clears_once_then_noops_same_day() {
        let store = MemStore::new();
        seed_proposals(&store, 3).await;

        assert!(rotate_proposals_if_due(&store, monday(9, 5)).await.unwrap());
        assert!(store.proposals().await.unwrap().is_empty());

        // Second trigger the same Monday: watermark already current-day.
        assert!(!rotate_proposals_if_due(&store, monday(13, 0)).await.unwrap());
    }

    #[tokio::test]
    async fn not_due_outside_monday_morning() {
        let store = MemStore::new();
        seed_proposals(&store, 1).await;

        // Monday before opening hour.
        assert!(!rotate_proposals_if_due(&store, monday(8, 59)).await.unwrap());
        // Tuesday.
        let tuesday = Utc.with_ymd_and_hms(2025, 1, 7, 12, 0, 0).unwrap();
        assert!(!rotate_proposals_if_due(&store, tuesday).await.unwrap());

        assert_eq!(store.proposals().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn watermark_written_even_when_nothing_to_delete() {
        let store = MemStore::new();

        assert!(rotate_proposals_if_due(&store, monday(9, 0)).await.unwrap());
        let config = store.runtime_config().await.unwrap();
        assert_eq!(config.last_proposal_clear, Some(monday(9, 0)));
    }

    #[tokio::test]
    async fn runs_again_the_following_week() {
        let store = MemStore::new();
        assert!(rotate_proposals_if_due(&store, monday(9, 0)).await.unwrap());

        seed_proposals(&store, 2).await;
        let next_monday = Utc.with_ymd_and_hms(2025, 1, 13, 9, 0, 0).unwrap();
        assert!(rotate_proposals_if_due(&store, next_monday).await.unwrap());
        assert!(store.proposals().await.unwrap().is_empty());
    }
}
