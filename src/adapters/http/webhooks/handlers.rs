//! Axum handlers for payment provider callbacks.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::application::handlers::{HandlePaymentWebhookCommand, HandlePaymentWebhookHandler};
use crate::domain::payment::{PaymentProvider, WebhookError};

use super::dto::{AcknowledgementResponse, ErrorResponse, HealthResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

const DEFAULT_PROCESSING_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome label sent when processing outlives `processing_timeout`.
pub const STILL_PROCESSING: &str = "processing";

/// Shared state for webhook routes.
#[derive(Clone)]
pub struct WebhookAppState {
    pub handler: Arc<HandlePaymentWebhookHandler>,
    /// How long a request waits for an accepted callback to finish before
    /// it is acknowledged anyway. Processing itself is never cut short.
    pub processing_timeout: Duration,
}

impl WebhookAppState {
    pub fn new(handler: HandlePaymentWebhookHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            processing_timeout: DEFAULT_PROCESSING_TIMEOUT,
        }
    }

    pub fn with_processing_timeout(mut self, timeout: Duration) -> Self {
        self.processing_timeout = timeout;
        self
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/cloudpayments
pub async fn handle_cloudpayments_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AcknowledgementResponse>, WebhookApiError> {
    receive(&state, PaymentProvider::CloudPayments, &headers, body).await
}

/// POST /webhooks/yookassa
pub async fn handle_yookassa_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AcknowledgementResponse>, WebhookApiError> {
    receive(&state, PaymentProvider::YooKassa, &headers, body).await
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

async fn receive(
    state: &WebhookAppState,
    provider: PaymentProvider,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Json<AcknowledgementResponse>, WebhookApiError> {
    let signature = state
        .handler
        .signature_headers(provider)
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let cmd = HandlePaymentWebhookCommand {
        provider,
        payload: body.to_vec(),
        signature,
    };

    let event = state.handler.accept(&cmd).await?;
    let transaction_id = event.transaction_id.clone();

    // Accepted events are applied on their own task, so a dropped connection
    // cannot stop them between the status write and the aggregate updates.
    let handler = state.handler.clone();
    let mut task =
        tokio::spawn(async move { handler.process_accepted(event, &cmd.payload).await });

    match tokio::time::timeout(state.processing_timeout, &mut task).await {
        Ok(Ok(outcome)) => Ok(Json(AcknowledgementResponse::new(outcome.label()))),
        Ok(Err(join_error)) => Err(WebhookError::Processing(format!(
            "webhook task for transaction {} failed: {}",
            transaction_id, join_error
        ))
        .into()),
        Err(_) => {
            warn!(
                provider = %provider,
                transaction_id = %transaction_id,
                timeout_ms = state.processing_timeout.as_millis() as u64,
                "Webhook still processing, acknowledging"
            );
            Ok(Json(AcknowledgementResponse::new(STILL_PROCESSING)))
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts webhook errors to HTTP responses.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        if self.0.is_acknowledged() {
            tracing::error!(error = %self.0, "Webhook processing aborted, acknowledging");
            let body = AcknowledgementResponse::new("processing_failed");
            return (StatusCode::OK, Json(body)).into_response();
        }
        let status = self.0.status_code();
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn authentication_error_maps_to_401() {
        let response = WebhookApiError(WebhookError::Authentication).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"], "UNAUTHORIZED");
        assert_eq!(json["code"], 401);
    }

    #[tokio::test]
    async fn missing_field_maps_to_400() {
        let response = WebhookApiError(WebhookError::MissingField("TransactionId")).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "MISSING_FIELD");
    }

    #[tokio::test]
    async fn processing_error_is_acknowledged() {
        let response =
            WebhookApiError(WebhookError::Processing("pool timed out".into())).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["code"], 0);
        assert_eq!(json["received"], true);
    }
}
