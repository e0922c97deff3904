//! API routes.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::clips::{create_clip, list_clips};
use crate::handlers::health::health;
use crate::handlers::recaps::request_recap;
use crate::state::AppState;
use crate::webhook::{clip_event, stream_event};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/clips", post(create_clip))
        .route("/channels/:channel_id/clips", get(list_clips))
        .route("/recaps", post(request_recap));

    let webhook_routes = Router::new()
        .route("/webhook/clip", post(clip_event))
        .route("/webhook/stream", post(stream_event));

    let health_routes = Router::new().route("/health", get(health));

    Router::new()
        .nest("/api", api_routes)
        .merge(webhook_routes)
        .merge(health_routes)
        // Generated artifacts and clip media are plain static files
        .nest_service("/videos", ServeDir::new(&state.engine_config.videos_dir))
        .nest_service("/clips", ServeDir::new(&state.engine_config.clips_dir))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
