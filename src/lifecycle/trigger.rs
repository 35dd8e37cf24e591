//! Trigger sweep
//!
//! Both trigger sources - the scheduled caller and opportunistic viewer
//! sessions - run the same scan against the same precondition contract, so
//! whichever fires first produces identical results and the others become
//! no-ops. Failures are isolated per topic: one bad record never aborts
//! the rest of the scan, and a failed commit is simply left for a future
//! tick.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::db::schemas::TopicDoc;
use crate::db::store::Store;
use crate::lifecycle::archive::{archive_topic, ArchiveOutcome};
use crate::lifecycle::rotation::rotate_proposals_if_due;
use crate::types::AgoraError;

/// Outcome counts for one sweep invocation
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub archived: usize,
    pub already_handled: usize,
    pub not_due: usize,
    pub failures: usize,
    pub proposals_cleared: bool,
}

impl SweepReport {
    pub fn effective(&self) -> bool {
        self.archived > 0 || self.proposals_cleared
    }
}

async fn archive_each(
    store: &dyn Store,
    topics: &[TopicDoc],
    now: DateTime<Utc>,
    period: Duration,
) -> SweepReport {
    let mut report = SweepReport::default();

    for topic in topics {
        report.scanned += 1;
        match archive_topic(store, topic, now, period).await {
            Ok(ArchiveOutcome::Archived { archive_id, votes_preserved }) => {
                report.archived += 1;
                info!(
                    topic_id = %topic.id,
                    archive_id = %archive_id,
                    votes = votes_preserved,
                    "Sweep archived topic"
                );
            }
            Ok(ArchiveOutcome::AlreadyHandled) => report.already_handled += 1,
            Ok(ArchiveOutcome::NotDue) => report.not_due += 1,
            Err(AgoraError::MissingIdentifier(msg)) => {
                report.failures += 1;
                warn!(topic_id = %topic.id, "Skipping malformed topic: {}", msg);
            }
            Err(e) => {
                report.failures += 1;
                warn!(
                    topic_id = %topic.id,
                    error = %e,
                    "Archival failed; left for a future tick"
                );
            }
        }
    }

    report
}

/// Full sweep: every published topic, then the proposal rotation.
/// Used by the scheduled endpoint and the background job.
pub async fn sweep(store: &dyn Store, now: DateTime<Utc>, period: Duration) -> SweepReport {
    let topics = match store.published_topics().await {
        Ok(topics) => topics,
        Err(e) => {
            error!(error = %e, "Sweep could not list topics");
            return SweepReport::default();
        }
    };

    let mut report = archive_each(store, &topics, now, period).await;

    match rotate_proposals_if_due(store, now).await {
        Ok(cleared) => report.proposals_cleared = cleared,
        Err(e) => {
            report.failures += 1;
            error!(error = %e, "Proposal rotation failed; left for a future tick");
        }
    }

    debug!(
        scanned = report.scanned,
        archived = report.archived,
        failures = report.failures,
        "Sweep complete"
    );
    report
}

/// Opportunistic variant for a viewer session: checks only the topics the
/// session has loaded. Unknown ids are counted as failures and skipped.
pub async fn check_topics(
    store: &dyn Store,
    topic_ids: &[String],
    now: DateTime<Utc>,
    period: Duration,
) -> SweepReport {
    let mut topics = Vec::with_capacity(topic_ids.len());
    let mut report = SweepReport::default();

    for id in topic_ids {
        match store.topic(id).await {
            Ok(Some(topic)) => topics.push(topic),
            Ok(None) => {
                report.scanned += 1;
                report.failures += 1;
                warn!(topic_id = %id, "Session check references unknown topic");
            }
            Err(e) => {
                report.scanned += 1;
                report.failures += 1;
                warn!(topic_id = %id, error = %e, "Session check could not load topic");
            }
        }
    }

    let archived = archive_each(store, &topics, now, period).await;
    report.scanned += archived.scanned;
    report.archived += archived.archived;
    report.already_handled += archived.already_handled;
    report.not_due += archived.not_due;
    report.failures += archived.failures;
    report
}
