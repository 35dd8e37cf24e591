//! HTTP routes for Agora

pub mod admin;
pub mod health;
pub mod phase;
pub mod proposals;
pub mod rotate;
pub mod topics;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::{AgoraError, Result};

pub use health::{health_check, readiness_check};

/// Serialize a value as a JSON response with the given status.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(value)
        .unwrap_or_else(|_| r#"{"error":"Serialization failed"}"#.to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Map a typed error onto its status code and a JSON body.
pub fn error_response(err: &AgoraError) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": err.code(),
        "message": err.to_string(),
    });
    json_response(err.status_code(), &body)
}

/// Collect and parse a JSON request body.
pub async fn read_json<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T> {
    let bytes = req
        .collect()
        .await
        .map_err(|e| AgoraError::BadRequest(format!("Failed to read request body: {}", e)))?
        .to_bytes();
    serde_json::from_slice(&bytes)
        .map_err(|e| AgoraError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// Pull one key out of a query string (`?voter_id=alice`).
pub fn query_param<'a>(query: Option<&'a str>, key: &str) -> Option<&'a str> {
    query.and_then(|q| {
        q.split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    })
}
