pub mod api;
pub mod config;
pub mod error;
pub mod service;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    http::{header, Method, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub use error::ServiceError;
pub use service::IntakeService;

pub struct AppState {
    pub service: IntakeService,
    pub static_dir: PathBuf,
}

pub fn get_service_version() -> String {
    // Release builds can stamp the commit they were built from.
    match option_env!("INTAKE_GIT_HASH") {
        Some(git_hash) if git_hash.len() >= 8 => {
            format!("{}+{}", env!("CARGO_PKG_VERSION"), &git_hash[..8])
        }
        Some(git_hash) if !git_hash.is_empty() => {
            format!("{}+{}", env!("CARGO_PKG_VERSION"), git_hash)
        }
        _ => env!("CARGO_PKG_VERSION").to_string(),
    }
}

async fn health_check() -> Result<Json<serde_json::Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "intake",
        "version": get_service_version(),
    })))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
}

/// The complete application: health check, API, and the frontend for
/// everything else. Unknown paths get `index.html` so client-side routes work.
pub fn build_router(state: Arc<AppState>) -> Router {
    let frontend = ServeDir::new(&state.static_dir)
        .fallback(ServeFile::new(state.static_dir.join("index.html")));

    Router::new()
        .route("/health", get(health_check))
        .merge(api::api_router())
        .fallback_service(frontend)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        )
        .with_state(state)
}
