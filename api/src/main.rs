use std::net::SocketAddr;

use axum::Router;
use axum::extract::OriginalUri;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod error;
mod extract;
mod middleware;
mod routes;
mod state;

use error::AppError;
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Witness Dialogue API",
        version = "0.1.0",
        description = "In-character witness for anti-bribery compliance role-play. Stateless: every request carries the full transcript."
    ),
    paths(
        routes::health::health_check,
        routes::chat::chat,
        routes::chat::status,
    ),
    components(schemas(
        HealthResponse,
        witness_core::ChatRequest,
        witness_core::ChatResponse,
        witness_core::analysis::Analysis,
        witness_core::analysis::PolicyPoint,
        witness_core::analysis::RiskFlag,
        witness_core::analysis::StageTransition,
        witness_core::tone::Tone,
        witness_core::tone::Stance,
        witness_core::error::ApiError,
    ))
)]
struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

fn build_router(state: AppState, rate_limited: bool) -> Router {
    let chat = if rate_limited {
        routes::chat::router().layer(middleware::rate_limit::chat_layer())
    } else {
        routes::chat::router()
    };

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(chat)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::security_headers::apply))
                .layer(middleware::cors::build_cors_layer()),
        )
        .with_state(state)
}

async fn not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::NotFound {
        path: uri.path().to_string(),
    }
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "witness_api=debug,witness_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let app_state = AppState::from_env();

    // Rate limiting on /v1/chat (disable with WITNESS_RATE_LIMIT=false)
    let rate_limited = std::env::var("WITNESS_RATE_LIMIT")
        .map(|v| v != "false")
        .unwrap_or(true);

    let app = build_router(app_state, rate_limited);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Witness API listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "failed to bind {}", addr);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!(error = %e, "server exited with error");
        std::process::exit(1);
    }
}
