//! HTTP command surface
//!
//! JSON endpoints for Play/Stop/status and the announcement document, plus
//! an SSE stream of dispatch events.

pub mod handlers;
pub mod sse;

use crate::dispatch::PlaybackDispatcher;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub dispatcher: Arc<PlaybackDispatcher>,
}

impl AppContext {
    pub fn new(dispatcher: Arc<PlaybackDispatcher>) -> Self {
        Self { dispatcher }
    }
}

/// Build application router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Trigger commands
        .route("/announcements/:slot/play", post(handlers::play_slot))
        .route("/announcements/stop", post(handlers::stop))
        .route("/announcements/play-file", post(handlers::play_file))
        .route("/announcements/status", get(handlers::status))
        // Single-endpoint form used by the plugin page
        .route("/trigger", get(handlers::trigger).post(handlers::trigger))
        // Announcement document
        .route("/config", get(handlers::get_config).put(handlers::put_config))
        .route("/events", get(sse::event_stream))
        .with_state(ctx)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}
