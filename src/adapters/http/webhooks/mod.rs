//! HTTP adapter for payment provider callbacks.
//!
//! - `POST /webhooks/cloudpayments` - CloudPayments notifications
//! - `POST /webhooks/yookassa` - YooKassa notifications
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{AcknowledgementResponse, ErrorResponse, HealthResponse};
pub use handlers::{WebhookApiError, WebhookAppState, STILL_PROCESSING};
pub use routes::webhook_router;
