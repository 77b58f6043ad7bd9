//! HTTP router construction.

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use reminder_core::config::ServerConfig;

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server);

    Router::new()
        .route("/health", get(api::health))
        .route("/alarms", get(api::list_alarms).post(api::create_alarm))
        .route("/alarms/{id}", delete(api::delete_alarm))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origin = match server.cors_origin.as_str() {
        "*" => AllowOrigin::any(),
        origin => match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                tracing::warn!(origin, error = %e, "invalid CORS origin, allowing any");
                AllowOrigin::any()
            }
        },
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}
