use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Build a CORS layer from the `WITNESS_CORS_ORIGINS` env var.
///
/// - Origins: comma-separated list, or `*` for any origin (default: `*`)
/// - Methods: GET, POST, OPTIONS
/// - Headers: Content-Type, Accept
/// - Max age: 3600s
pub fn build_cors_layer() -> CorsLayer {
    let origins_str = std::env::var("WITNESS_CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
    cors_layer_for(&origins_str)
}

fn cors_layer_for(origins_str: &str) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origins(origins_str))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("accept"),
        ])
        .max_age(std::time::Duration::from_secs(3600))
}

fn allowed_origins(origins_str: &str) -> AllowOrigin {
    let entries: Vec<&str> = origins_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if entries.is_empty() || entries.contains(&"*") {
        return AllowOrigin::any();
    }

    let origins: Vec<HeaderValue> = entries
        .into_iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    AllowOrigin::list(origins)
}
