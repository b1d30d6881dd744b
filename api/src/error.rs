use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use witness_core::error::{self, ApiError};

/// Failures outside the chat contract. Chat turns never produce these; the
/// engine answers every turn with a `ChatResponse`.
#[derive(Debug)]
pub enum AppError {
    /// Unknown route (404)
    NotFound { path: String },
    /// Known route, unsupported method (405)
    MethodNotAllowed { method: String, path: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::NotFound { path } => (
                StatusCode::NOT_FOUND,
                ApiError {
                    error: error::codes::NOT_FOUND.to_string(),
                    message: format!("No route for '{path}'"),
                    request_id,
                    docs_hint: Some(
                        "See GET /api-doc/openapi.json for the available endpoints.".to_string(),
                    ),
                },
            ),
            AppError::MethodNotAllowed { method, path } => (
                StatusCode::METHOD_NOT_ALLOWED,
                ApiError {
                    error: error::codes::METHOD_NOT_ALLOWED.to_string(),
                    message: format!("{method} is not supported on '{path}'"),
                    request_id,
                    docs_hint: None,
                },
            ),
        };

        (status, Json(api_error)).into_response()
    }
}
