//! Health check endpoints
//!
//! - /health, /healthz - liveness probe (is the service running?)
//! - /ready, /readyz - readiness probe (can the store be reached?)

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::json_response;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub timestamp: String,
    pub mode: String,
    pub node_id: String,
    pub store: StoreHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct StoreHealth {
    pub backend: &'static str,
    pub reachable: bool,
}

fn build_health_response(state: &AppState, store_reachable: bool, error: Option<String>) -> HealthResponse {
    HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        node_id: state.args.node_id.to_string(),
        store: StoreHealth {
            backend: state.store_backend,
            reachable: store_reachable,
        },
        error,
    }
}

/// Liveness probe: 200 whenever the service is running.
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state, true, None);
    json_response(StatusCode::OK, &response)
}

/// Readiness probe: 200 only when the store answers.
pub async fn readiness_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let (reachable, error) = match state.store.runtime_config().await {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    let status = if reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = build_health_response(&state, reachable, error);
    json_response(status, &response)
}
