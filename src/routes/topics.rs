//! Topic routes
//!
//! Read endpoints for published topics, the vote endpoint, the
//! opportunistic per-session archive check, archive likes, and the
//! discussion sub-records.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::batch::{WriteBatch, WriteOp};
use crate::db::schemas::{CommentDoc, TopicDoc, TopicKind, TopicOption, TopicStatus};
use crate::lifecycle::{archive_if_due, cast_vote, check_topics, is_revoter};
use crate::phase::{phase_at, Phase};
use crate::routes::{error_response, json_response, query_param, read_json};
use crate::server::AppState;
use crate::types::AgoraError;

/// Client-facing topic shape (`_id` exposed as `id`).
#[derive(Serialize)]
pub struct TopicView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub options: Vec<TopicOption>,
    pub kind: TopicKind,
    pub status: TopicStatus,
    pub starts_at: chrono::DateTime<chrono::Utc>,
    pub ends_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub announce_at: Option<chrono::DateTime<chrono::Utc>>,
    pub tally: HashMap<String, i64>,
    pub total_votes: i64,
    pub likes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_into: Option<String>,
}

impl From<&TopicDoc> for TopicView {
    fn from(doc: &TopicDoc) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            description: doc.description.clone(),
            options: doc.options.clone(),
            kind: doc.kind,
            status: doc.status,
            starts_at: doc.starts_at,
            ends_at: doc.ends_at,
            announce_at: doc.announce_at,
            tally: doc.tally.clone(),
            total_votes: doc.total_votes(),
            likes: doc.likes,
            archived_from: doc.archived_from.clone(),
            archived_into: doc.archived_into.clone(),
        }
    }
}

#[derive(Serialize)]
struct TopicListResponse {
    phase: Phase,
    topics: Vec<TopicView>,
}

/// GET /api/v1/topics
pub async fn list_topics(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let config = match state.store.runtime_config().await {
        Ok(config) => config,
        Err(e) => return error_response(&e),
    };
    let topics = match state.store.published_topics().await {
        Ok(topics) => topics,
        Err(e) => return error_response(&e),
    };

    let response = TopicListResponse {
        phase: phase_at(chrono::Utc::now(), config.phase_override),
        topics: topics.iter().map(TopicView::from).collect(),
    };
    json_response(StatusCode::OK, &response)
}

#[derive(Serialize)]
struct TopicDetailResponse {
    phase: Phase,
    topic: TopicView,
    #[serde(skip_serializing_if = "Option::is_none")]
    your_vote: Option<String>,
    revoter: bool,
}

/// GET /api/v1/topics/{id}[?voter_id=...]
pub async fn get_topic(
    state: Arc<AppState>,
    topic_id: &str,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    let topic = match state.store.topic(topic_id).await {
        Ok(Some(topic)) => topic,
        Ok(None) => return error_response(&AgoraError::NotFound(format!("topic {}", topic_id))),
        Err(e) => return error_response(&e),
    };
    let config = match state.store.runtime_config().await {
        Ok(config) => config,
        Err(e) => return error_response(&e),
    };

    let (your_vote, revoter) = match query_param(query, "voter_id") {
        Some(voter_id) => {
            let vote = match state.store.vote(topic_id, voter_id).await {
                Ok(vote) => vote,
                Err(e) => return error_response(&e),
            };
            let marker = match state.store.marker(topic_id, voter_id).await {
                Ok(marker) => marker,
                Err(e) => return error_response(&e),
            };
            (vote.map(|v| v.option_id), is_revoter(&topic, marker.as_ref()))
        }
        None => (None, false),
    };

    let response = TopicDetailResponse {
        phase: phase_at(chrono::Utc::now(), config.phase_override),
        topic: TopicView::from(&topic),
        your_vote,
        revoter,
    };
    json_response(StatusCode::OK, &response)
}

#[derive(Deserialize)]
struct VoteRequest {
    voter_id: String,
    option_id: String,
    #[serde(default)]
    justification: Option<String>,
}

/// POST /api/v1/topics/{id}/vote
pub async fn vote(
    state: Arc<AppState>,
    topic_id: &str,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let body: VoteRequest = match read_json(req).await {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };
    if body.voter_id.is_empty() {
        return error_response(&AgoraError::BadRequest("voter_id is required".into()));
    }

    match cast_vote(
        state.store.as_ref(),
        topic_id,
        &body.voter_id,
        &body.option_id,
        body.justification.as_deref(),
        chrono::Utc::now(),
    )
    .await
    {
        Ok(outcome) => json_response(StatusCode::OK, &outcome),
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize)]
struct CheckRequest {
    /// Additional loaded topic ids to check alongside the one in the path.
    #[serde(default)]
    topic_ids: Vec<String>,
}

/// POST /api/v1/topics/{id}/check
///
/// Opportunistic trigger from a viewer session. Always 200; losing the
/// race to another caller is a success.
pub async fn check(
    state: Arc<AppState>,
    topic_id: &str,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let body: CheckRequest = match read_json(req).await {
        Ok(body) => body,
        // An empty body is fine; only the path topic gets checked.
        Err(_) => CheckRequest { topic_ids: Vec::new() },
    };

    let now = chrono::Utc::now();
    let period = state.args.period();

    if body.topic_ids.is_empty() {
        match archive_if_due(state.store.as_ref(), topic_id, now, period).await {
            Ok(outcome) => json_response(StatusCode::OK, &outcome),
            Err(e) => error_response(&e),
        }
    } else {
        let mut ids = vec![topic_id.to_string()];
        ids.extend(body.topic_ids);
        let report = check_topics(state.store.as_ref(), &ids, now, period).await;
        json_response(StatusCode::OK, &report)
    }
}

/// POST /api/v1/topics/{id}/like
///
/// Archive records are immutable except for this counter.
pub async fn like(state: Arc<AppState>, topic_id: &str) -> Response<Full<Bytes>> {
    let topic = match state.store.topic(topic_id).await {
        Ok(Some(topic)) => topic,
        Ok(None) => return error_response(&AgoraError::NotFound(format!("topic {}", topic_id))),
        Err(e) => return error_response(&e),
    };
    if topic.kind != TopicKind::Archive {
        return error_response(&AgoraError::BadRequest(
            "only archived topics accept likes".into(),
        ));
    }

    let mut batch = WriteBatch::new();
    batch.push(WriteOp::AdjustLikes { topic_id: topic_id.to_string(), delta: 1 });
    match state.store.commit(batch).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &serde_json::json!({ "topic_id": topic_id, "likes": topic.likes + 1 }),
        ),
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/topics/{id}/comments
pub async fn list_comments(state: Arc<AppState>, topic_id: &str) -> Response<Full<Bytes>> {
    let comments = match state.store.comments(topic_id).await {
        Ok(comments) => comments,
        Err(e) => return error_response(&e),
    };
    let justifications = match state.store.justifications(topic_id).await {
        Ok(posts) => posts,
        Err(e) => return error_response(&e),
    };

    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "topic_id": topic_id,
            "comments": comments,
            "justifications": justifications,
        }),
    )
}

#[derive(Deserialize)]
struct CommentRequest {
    author_id: String,
    body: String,
    #[serde(default)]
    tag: Option<String>,
}

/// POST /api/v1/topics/{id}/comments
pub async fn create_comment(
    state: Arc<AppState>,
    topic_id: &str,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let body: CommentRequest = match read_json(req).await {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };
    if body.author_id.is_empty() || body.body.trim().is_empty() {
        return error_response(&AgoraError::BadRequest(
            "author_id and body are required".into(),
        ));
    }

    let topic = match state.store.topic(topic_id).await {
        Ok(Some(topic)) => topic,
        Ok(None) => return error_response(&AgoraError::NotFound(format!("topic {}", topic_id))),
        Err(e) => return error_response(&e),
    };
    if topic.is_archived() {
        return error_response(&AgoraError::TopicClosed(topic_id.to_string()));
    }

    let comment = CommentDoc::new(
        topic_id,
        &body.author_id,
        body.body.trim(),
        body.tag,
        chrono::Utc::now(),
    );

    let mut batch = WriteBatch::new();
    batch.push(WriteOp::GuardNotArchived { topic_id: topic_id.to_string() });
    batch.push(WriteOp::PutComment(comment.clone()));
    match state.store.commit(batch).await {
        Ok(()) => json_response(StatusCode::CREATED, &comment),
        Err(e) => error_response(&e),
    }
}

/// POST /api/v1/topics/{id}/comments/{cid}/like and .../report
pub async fn bump_comment(
    state: Arc<AppState>,
    topic_id: &str,
    comment_id: &str,
    report: bool,
) -> Response<Full<Bytes>> {
    let (likes, reports) = if report { (0, 1) } else { (1, 0) };

    let mut batch = WriteBatch::new();
    batch.push(WriteOp::BumpComment {
        topic_id: topic_id.to_string(),
        comment_id: comment_id.to_string(),
        likes,
        reports,
    });
    match state.store.commit(batch).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &serde_json::json!({ "topic_id": topic_id, "comment_id": comment_id }),
        ),
        Err(AgoraError::Database(msg)) if msg.starts_with("no such comment") => {
            error_response(&AgoraError::NotFound(format!("comment {}", comment_id)))
        }
        Err(e) => error_response(&e),
    }
}
