//! HTTP DTOs for webhook endpoints.
//!
//! Providers only look at the status code and, for CloudPayments, the
//! numeric `code` field. Everything else is for operators reading logs.

use serde::{Deserialize, Serialize};

use crate::domain::payment::WebhookError;

/// CloudPayments treats `code: 0` as "accepted, stop retrying".
pub const ACCEPTED_CODE: u16 = 0;

/// Body returned for every acknowledged callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgementResponse {
    pub code: u16,
    pub received: bool,
    /// Outcome label, e.g. "completed", "duplicate", "ignored".
    pub outcome: String,
}

impl AcknowledgementResponse {
    pub fn new(outcome: impl Into<String>) -> Self {
        Self {
            code: ACCEPTED_CODE,
            received: true,
            outcome: outcome.into(),
        }
    }
}

/// Body returned for rejected callbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status repeated in the body; never zero.
    pub code: u16,
    /// Error code for programmatic handling.
    pub error: String,
    /// Generic message. Never carries internal detail.
    pub message: String,
}

impl From<&WebhookError> for ErrorResponse {
    fn from(err: &WebhookError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            error: err.error_code().to_string(),
            message: err.public_message().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
