//! Administrative configuration writes
//!
//! The phase override and topic status are authored externally; these
//! endpoints are the write side the core never calls. Gated by the admin
//! secret.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::batch::{WriteBatch, WriteOp};
use crate::phase::Phase;
use crate::routes::{error_response, json_response, read_json};
use crate::server::AppState;
use crate::types::AgoraError;

fn authorize(state: &AppState, auth_header: Option<&str>) -> bool {
    state.admin.validate_bearer(auth_header) || (state.args.dev_mode && !state.admin.is_configured())
}

#[derive(Deserialize)]
struct OverrideRequest {
    /// One of the four phase keys; `null` clears the override.
    phase: Option<Phase>,
}

/// POST /admin/phase-override
pub async fn set_phase_override(
    state: Arc<AppState>,
    auth_header: Option<String>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    if !authorize(&state, auth_header.as_deref()) {
        warn!("Rejected admin write with missing or invalid token");
        return error_response(&AgoraError::Unauthorized("valid bearer token required".into()));
    }

    let body: OverrideRequest = match read_json(req).await {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };

    let mut batch = WriteBatch::new();
    batch.push(WriteOp::SetPhaseOverride(body.phase));
    match state.store.commit(batch).await {
        Ok(()) => {
            match body.phase {
                Some(phase) => info!(phase = %phase, "Phase override set"),
                None => info!("Phase override cleared"),
            }
            json_response(
                StatusCode::OK,
                &serde_json::json!({ "phase_override": body.phase }),
            )
        }
        Err(e) => error_response(&e),
    }
}

/// DELETE /admin/phase-override
pub async fn clear_phase_override(
    state: Arc<AppState>,
    auth_header: Option<&str>,
) -> Response<Full<Bytes>> {
    if !authorize(&state, auth_header) {
        warn!("Rejected admin write with missing or invalid token");
        return error_response(&AgoraError::Unauthorized("valid bearer token required".into()));
    }

    let mut batch = WriteBatch::new();
    batch.push(WriteOp::SetPhaseOverride(None));
    match state.store.commit(batch).await {
        Ok(()) => {
            info!("Phase override cleared");
            json_response(StatusCode::OK, &serde_json::json!({ "phase_override": null }))
        }
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize)]
struct StatusRequest {
    status: crate::db::schemas::TopicStatus,
}

/// POST /admin/topics/{id}/status
///
/// Flip a topic between published and pending. Archived is terminal and
/// not settable here.
pub async fn set_topic_status(
    state: Arc<AppState>,
    topic_id: &str,
    auth_header: Option<String>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    if !authorize(&state, auth_header.as_deref()) {
        warn!("Rejected admin write with missing or invalid token");
        return error_response(&AgoraError::Unauthorized("valid bearer token required".into()));
    }

    let body: StatusRequest = match read_json(req).await {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };
    if body.status == crate::db::schemas::TopicStatus::Archived {
        return error_response(&AgoraError::BadRequest(
            "archived status is set by rotation, not by hand".into(),
        ));
    }

    let mut topic = match state.store.topic(topic_id).await {
        Ok(Some(topic)) => topic,
        Ok(None) => return error_response(&AgoraError::NotFound(format!("topic {}", topic_id))),
        Err(e) => return error_response(&e),
    };
    if topic.is_archived() {
        return error_response(&AgoraError::TopicClosed(topic_id.to_string()));
    }

    topic.status = body.status;

    let mut batch = WriteBatch::new();
    batch.push(WriteOp::GuardNotArchived { topic_id: topic_id.to_string() });
    batch.push(WriteOp::PutTopic(topic));
    match state.store.commit(batch).await {
        Ok(()) => {
            info!(topic_id = %topic_id, status = ?body.status, "Topic status updated");
            json_response(
                StatusCode::OK,
                &serde_json::json!({ "topic_id": topic_id, "status": body.status }),
            )
        }
        Err(e) => error_response(&e),
    }
}
