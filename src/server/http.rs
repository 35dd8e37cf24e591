//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one spawned task per connection, and a
//! hand-rolled method/path router over the shared `AppState`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::SecretValidator;
use crate::config::Args;
use crate::db::store::Store;
use crate::routes;
use crate::types::AgoraError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Arc<dyn Store>,
    /// "mongodb" or "memory"; surfaced by the health endpoints.
    pub store_backend: &'static str,
    pub cron: SecretValidator,
    pub admin: SecretValidator,
}

impl AppState {
    pub fn new(args: Args, store: Arc<dyn Store>, store_backend: &'static str) -> Self {
        let cron = SecretValidator::new(args.cron_secret.clone());
        let admin = SecretValidator::new(args.admin_secret.clone());
        Self { args, store, store_backend, cron, admin }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), AgoraError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Agora listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - unconfigured secrets accept all callers");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|s| s.to_string());
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Health probes
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(state))
        }
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            to_boxed(routes::readiness_check(state).await)
        }

        // CORS preflight
        (Method::OPTIONS, _) => to_boxed(preflight_response()),

        (Method::GET, "/api/v1/phase") => to_boxed(routes::phase::current_phase(state).await),

        (Method::GET, "/api/v1/topics") => to_boxed(routes::topics::list_topics(state).await),
        (method, p) if p.starts_with("/api/v1/topics/") => {
            handle_topic_request(state, method, p, query.as_deref(), req).await
        }

        (Method::GET, "/api/v1/proposals") => to_boxed(routes::proposals::list(state).await),
        (Method::POST, "/api/v1/proposals") => {
            to_boxed(routes::proposals::create(state, req).await)
        }
        (method, p) if p.starts_with("/api/v1/proposals/") => {
            handle_proposal_request(state, method, p, req).await
        }

        // Scheduled trigger
        (Method::GET, "/internal/rotate") => {
            to_boxed(routes::rotate::handle_rotate(state, auth_header.as_deref()).await)
        }

        // Administrative writes
        (Method::POST, "/admin/phase-override") => {
            to_boxed(routes::admin::set_phase_override(state, auth_header, req).await)
        }
        (Method::DELETE, "/admin/phase-override") => {
            to_boxed(routes::admin::clear_phase_override(state, auth_header.as_deref()).await)
        }
        (method, p) if p.starts_with("/admin/topics/") => {
            handle_admin_topic_request(state, method, p, auth_header, req).await
        }

        // Not found
        _ => to_boxed(not_found_response(&path)),
    };

    Ok(response)
}

/// Sub-routes under /api/v1/topics/{id}
async fn handle_topic_request(
    state: Arc<AppState>,
    method: Method,
    path: &str,
    query: Option<&str>,
    req: Request<Incoming>,
) -> Response<BoxBody> {
    let rest = path.strip_prefix("/api/v1/topics/").unwrap_or("");
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    let response = match (method, segments.as_slice()) {
        (Method::GET, [id]) => routes::topics::get_topic(state, id, query).await,
        (Method::POST, [id, "vote"]) => routes::topics::vote(state, id, req).await,
        (Method::POST, [id, "check"]) => routes::topics::check(state, id, req).await,
        (Method::POST, [id, "like"]) => routes::topics::like(state, id).await,
        (Method::GET, [id, "comments"]) => routes::topics::list_comments(state, id).await,
        (Method::POST, [id, "comments"]) => routes::topics::create_comment(state, id, req).await,
        (Method::POST, [id, "comments", cid, "like"]) => {
            routes::topics::bump_comment(state, id, cid, false).await
        }
        (Method::POST, [id, "comments", cid, "report"]) => {
            routes::topics::bump_comment(state, id, cid, true).await
        }
        _ => not_found_response(path),
    };
    to_boxed(response)
}

/// Sub-routes under /api/v1/proposals/{id}
async fn handle_proposal_request(
    state: Arc<AppState>,
    method: Method,
    path: &str,
    req: Request<Incoming>,
) -> Response<BoxBody> {
    let rest = path.strip_prefix("/api/v1/proposals/").unwrap_or("");
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    let response = match (method, segments.as_slice()) {
        (Method::POST, [id, "vote"]) => routes::proposals::vote(state, id, req).await,
        _ => not_found_response(path),
    };
    to_boxed(response)
}

/// Sub-routes under /admin/topics/{id}
async fn handle_admin_topic_request(
    state: Arc<AppState>,
    method: Method,
    path: &str,
    auth_header: Option<String>,
    req: Request<Incoming>,
) -> Response<BoxBody> {
    let rest = path.strip_prefix("/admin/topics/").unwrap_or("");
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    let response = match (method, segments.as_slice()) {
        (Method::POST, [id, "status"]) => {
            routes::admin::set_topic_status(state, id, auth_header, req).await
        }
        _ => not_found_response(path),
    };
    to_boxed(response)
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, DELETE, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
