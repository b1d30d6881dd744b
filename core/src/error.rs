use serde::Serialize;
use utoipa::ToSchema;

/// Structured error body for non-chat failures.
/// Chat turns never use this shape; they answer with a `ChatResponse`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "method_not_allowed", "rate_limited")
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// Request ID for tracing and debugging
    pub request_id: String,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

/// Error codes used across the API
pub mod codes {
    pub const METHOD_NOT_ALLOWED: &str = "method_not_allowed";
    pub const NOT_FOUND: &str = "not_found";
    pub const RATE_LIMITED: &str = "rate_limited";
}

/// Faults inside a single turn. None of these reach the caller; the engine
/// boundary turns them into a failure response.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("phrase bank '{0}' has no lines")]
    EmptyBank(&'static str),
    #[error("reply for '{0}' is empty after budgeting")]
    EmptyReply(&'static str),
    #[error("internal error: {0}")]
    Internal(String),
}
