use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::IntoParams;
use witness_core::{ChatResponse, Persona};

use crate::extract::ChatBody;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/v1/chat",
        post(chat)
            .get(status)
            .options(preflight)
            .fallback(method_not_allowed),
    )
}

/// One trainee turn.
///
/// Always answers 200: malformed bodies are read as an empty message and
/// internal faults come back as `ok: false` with an apologetic reply.
#[utoipa::path(
    post,
    path = "/v1/chat",
    request_body = witness_core::ChatRequest,
    responses(
        (status = 200, description = "Witness reply", body = ChatResponse),
        (status = 429, description = "Rate limited", body = witness_core::error::ApiError)
    ),
    tag = "chat"
)]
pub async fn chat(State(state): State<AppState>, ChatBody(request): ChatBody) -> Json<ChatResponse> {
    let response = state.engine.respond(&request);
    if !response.ok {
        tracing::warn!("chat turn answered with failure response");
    }
    Json(response)
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// `Freda` selects the second persona; anything else is Betty.
    pub persona: Option<String>,
}

/// Liveness check in the chat contract's shape.
#[utoipa::path(
    get,
    path = "/v1/chat",
    params(StatusQuery),
    responses((status = 200, description = "Witness is live", body = ChatResponse)),
    tag = "chat"
)]
pub async fn status(Query(query): Query<StatusQuery>) -> Json<ChatResponse> {
    let persona = Persona::from_request(query.persona.as_deref());
    Json(ChatResponse {
        ok: true,
        reply: format!("{} is live. Use POST with {{message}}.", persona.first_name()),
        done: None,
        marker: None,
        error: None,
        analysis: None,
    })
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ChatResponse {
            ok: false,
            reply: "Use POST with {message}.".to_string(),
            done: None,
            marker: None,
            error: Some("Method not allowed".to_string()),
            analysis: None,
        }),
    )
}
