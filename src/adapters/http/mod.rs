//! HTTP adapters - axum endpoints.

pub mod webhooks;

pub use webhooks::{webhook_router, WebhookAppState};

use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

/// Webhook router with tracing and body size layers applied.
///
/// There is no timeout layer: `server.request_timeout()` bounds how long a
/// request waits for processing, after which it is acknowledged while
/// processing continues.
pub fn service_router(state: WebhookAppState, server: &ServerConfig) -> Router {
    webhook_router()
        .with_state(state.with_processing_timeout(server.request_timeout()))
        .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
}
