//! Axum router configuration for webhook endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    handle_cloudpayments_webhook, handle_yookassa_webhook, health, WebhookAppState,
};

/// Create the provider callback routes.
///
/// # Routes
/// - `POST /cloudpayments` - CloudPayments notifications
/// - `POST /yookassa` - YooKassa notifications
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new()
        .route("/cloudpayments", post(handle_cloudpayments_webhook))
        .route("/yookassa", post(handle_yookassa_webhook))
}

/// Create the complete service router, mounted at the root.
///
/// # Example
///
/// ```ignore
/// let app = webhook_router().with_state(WebhookAppState::new(handler));
/// ```
pub fn webhook_router() -> Router<WebhookAppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/webhooks", webhook_routes())
}
