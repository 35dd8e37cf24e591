//! Phase endpoint
//!
//! Reports the current cycle phase. The administrative override is read
//! from the runtime config document and passed into the clock per call.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::phase::{next_transition, phase_at, Phase};
use crate::routes::{error_response, json_response};
use crate::server::AppState;

#[derive(Serialize)]
pub struct PhaseResponse {
    pub phase: Phase,
    pub override_active: bool,
    /// Next table-driven change; meaningless while an override pins the
    /// phase, still reported for countdown display.
    pub next_transition: chrono::DateTime<chrono::Utc>,
}

pub async fn current_phase(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let config = match state.store.runtime_config().await {
        Ok(config) => config,
        Err(e) => return error_response(&e),
    };

    let now = chrono::Utc::now();
    let response = PhaseResponse {
        phase: phase_at(now, config.phase_override),
        override_active: config.phase_override.is_some(),
        next_transition: next_transition(now),
    };
    json_response(StatusCode::OK, &response)
}
