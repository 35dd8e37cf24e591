//! Error types for Agora

use hyper::StatusCode;

/// Main error type for Agora operations
#[derive(Debug, thiserror::Error)]
pub enum AgoraError {
    // Vote-path errors: user-facing, recoverable by correcting input.
    #[error("Changing a vote requires a justification")]
    JustificationRequired,

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Topic is closed: {0}")]
    TopicClosed(String),

    // Archive-path errors: another caller already handled the topic, or the
    // backing store refused the batch. Neither is fatal; the sweep catches
    // them per topic and moves on.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Batch commit failed: {0}")]
    BatchCommitFailed(String),

    #[error("Malformed record: {0}")]
    MissingIdentifier(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgoraError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::JustificationRequired => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UnknownOption(_) => StatusCode::BAD_REQUEST,
            Self::TopicClosed(_) => StatusCode::CONFLICT,
            Self::PreconditionFailed(_) => StatusCode::CONFLICT,
            Self::BatchCommitFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::MissingIdentifier(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for JSON error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::JustificationRequired => "justification_required",
            Self::UnknownOption(_) => "unknown_option",
            Self::TopicClosed(_) => "topic_closed",
            Self::PreconditionFailed(_) => "precondition_failed",
            Self::BatchCommitFailed(_) => "batch_commit_failed",
            Self::MissingIdentifier(_) => "missing_identifier",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

// From conversions for common error types

impl From<std::io::Error> for AgoraError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AgoraError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for AgoraError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for AgoraError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for Agora operations
pub type Result<T> = std::result::Result<T, AgoraError>;
