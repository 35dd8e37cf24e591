//! Scheduled rotation endpoint
//!
//! `GET /internal/rotate`, called periodically by an external scheduler
//! with a bearer token matching the configured cron secret. Sweeps every
//! published topic and runs the proposal rotation, then reports counts.
//! Safe to call concurrently with viewer-session checks and the in-process
//! sweeper: the archive transaction's guard makes redundant triggers
//! no-ops.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::sync::Arc;
use tracing::{info, warn};

use crate::lifecycle::trigger;
use crate::routes::{error_response, json_response};
use crate::server::AppState;
use crate::types::AgoraError;

pub async fn handle_rotate(
    state: Arc<AppState>,
    auth_header: Option<&str>,
) -> Response<Full<Bytes>> {
    let authorized = state.cron.validate_bearer(auth_header)
        || (state.args.dev_mode && !state.cron.is_configured());
    if !authorized {
        warn!("Rejected rotation trigger with missing or invalid token");
        return error_response(&AgoraError::Unauthorized(
            "valid bearer token required".into(),
        ));
    }

    let report = trigger::sweep(
        state.store.as_ref(),
        chrono::Utc::now(),
        state.args.period(),
    )
    .await;

    info!(
        scanned = report.scanned,
        archived = report.archived,
        failures = report.failures,
        proposals_cleared = report.proposals_cleared,
        "Scheduled rotation complete"
    );
    json_response(StatusCode::OK, &report)
}
