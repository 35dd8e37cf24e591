//! Sweeper loop
//!
//! In-process periodic trigger: runs the same sweep the scheduled HTTP
//! endpoint runs, on an interval. Redundant with the external scheduler
//! and with viewer-session checks on purpose - every trigger source is a
//! no-op when another already handled a topic.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::db::store::Store;
use crate::lifecycle::trigger;

/// Sweeper configuration
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Interval between sweeps (seconds)
    pub interval_secs: u64,
    /// Window length granted to an official topic on reset
    pub period: chrono::Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            period: chrono::Duration::days(7),
        }
    }
}

/// Spawn the sweep loop. The handle is returned for completeness; the loop
/// runs until the process exits.
pub fn spawn_sweeper(store: Arc<dyn Store>, config: SweeperConfig) -> JoinHandle<()> {
    info!(interval_secs = config.interval_secs, "Starting sweeper");

    tokio::spawn(async move {
        let interval = std::time::Duration::from_secs(config.interval_secs);
        loop {
            tokio::time::sleep(interval).await;

            let report = trigger::sweep(store.as_ref(), Utc::now(), config.period).await;
            if report.effective() {
                info!(
                    archived = report.archived,
                    proposals_cleared = report.proposals_cleared,
                    "Sweeper tick"
                );
            } else {
                debug!(scanned = report.scanned, "Sweeper tick idle");
            }
        }
    })
}
