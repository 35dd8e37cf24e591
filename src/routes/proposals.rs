//! Proposal routes
//!
//! Community topic candidates. They accumulate votes during the week and
//! are swept away wholesale by the Monday rotation.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::batch::{WriteBatch, WriteOp};
use crate::db::schemas::ProposalDoc;
use crate::routes::{error_response, json_response, read_json};
use crate::server::AppState;
use crate::types::AgoraError;

/// GET /api/v1/proposals
pub async fn list(state: Arc<AppState>) -> Response<Full<Bytes>> {
    match state.store.proposals().await {
        Ok(proposals) => json_response(
            StatusCode::OK,
            &serde_json::json!({ "proposals": proposals }),
        ),
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize)]
struct CreateRequest {
    title: String,
    #[serde(default)]
    description: String,
    submitted_by: String,
}

/// POST /api/v1/proposals
pub async fn create(state: Arc<AppState>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let body: CreateRequest = match read_json(req).await {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };
    if body.title.trim().is_empty() || body.submitted_by.is_empty() {
        return error_response(&AgoraError::BadRequest(
            "title and submitted_by are required".into(),
        ));
    }

    let proposal = ProposalDoc::new(
        body.title.trim(),
        &body.description,
        &body.submitted_by,
        chrono::Utc::now(),
    );

    let mut batch = WriteBatch::new();
    batch.push(WriteOp::PutProposal(proposal.clone()));
    match state.store.commit(batch).await {
        Ok(()) => json_response(StatusCode::CREATED, &proposal),
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize)]
struct ProposalVoteRequest {
    voter_id: String,
}

/// POST /api/v1/proposals/{id}/vote
///
/// Counts at most once per voter; repeats are no-ops.
pub async fn vote(
    state: Arc<AppState>,
    proposal_id: &str,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let body: ProposalVoteRequest = match read_json(req).await {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };
    if body.voter_id.is_empty() {
        return error_response(&AgoraError::BadRequest("voter_id is required".into()));
    }

    let mut batch = WriteBatch::new();
    batch.push(WriteOp::VoteProposal {
        proposal_id: proposal_id.to_string(),
        voter_id: body.voter_id,
    });
    match state.store.commit(batch).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &serde_json::json!({ "proposal_id": proposal_id }),
        ),
        Err(AgoraError::Database(msg)) if msg.starts_with("no such proposal") => {
            error_response(&AgoraError::NotFound(format!("proposal {}", proposal_id)))
        }
        Err(e) => error_response(&e),
    }
}
