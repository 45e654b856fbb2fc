//! Webhook error types.
//!
//! Every error carries the HTTP status the provider receives. Providers
//! retry anything that is not 2xx, so only failures that can never succeed
//! on redelivery, or that happen before we trust the caller, are surfaced.

use http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::ValidationError;

#[derive(Debug, Error)]
pub enum WebhookError {
    /// Body is not valid JSON or a field has an unusable value.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A mandatory identifying field is absent.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Signature header missing or not matching the body.
    #[error("Invalid signature")]
    Authentication,

    /// A secret needed to authenticate this provider is not deployed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Storage or downstream failure after the callback was accepted.
    #[error("Processing error: {0}")]
    Processing(String),
}

impl WebhookError {
    /// Maps the error to the status code returned to the provider.
    ///
    /// - 400: the callback can never succeed, stop retrying
    /// - 401: not authenticated
    /// - 503: not deployable until an operator sets the secret
    /// - 200: accepted; recovery is from logs, not redelivery
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::Validation(_) | WebhookError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::Authentication => StatusCode::UNAUTHORIZED,
            WebhookError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            WebhookError::Processing(_) => StatusCode::OK,
        }
    }

    /// True if the provider receives a 2xx for this error.
    pub fn is_acknowledged(&self) -> bool {
        self.status_code().is_success()
    }

    /// Stable machine-readable error code for response bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            WebhookError::Validation(_) => "VALIDATION_FAILED",
            WebhookError::MissingField(_) => "MISSING_FIELD",
            WebhookError::Authentication => "UNAUTHORIZED",
            WebhookError::Configuration(_) => "NOT_CONFIGURED",
            WebhookError::Processing(_) => "PROCESSING_FAILED",
        }
    }

    /// Message safe to return to the caller. Never includes internal detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            WebhookError::Validation(_) => "Malformed webhook payload",
            WebhookError::MissingField(_) => "Webhook payload is missing a required field",
            WebhookError::Authentication => "Webhook authentication failed",
            WebhookError::Configuration(_) => "Webhook endpoint is not configured",
            WebhookError::Processing(_) => "Webhook accepted",
        }
    }
}

impl From<ValidationError> for WebhookError {
    fn from(err: ValidationError) -> Self {
        WebhookError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::Validation(format!("invalid JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Status Code Mapping Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn validation_errors_are_bad_request() {
        assert_eq!(
            WebhookError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::MissingField("TransactionId").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn authentication_is_unauthorized() {
        assert_eq!(
            WebhookError::Authentication.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn configuration_is_distinct_from_authentication() {
        let err = WebhookError::Configuration("secret missing".into());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_ne!(err.error_code(), WebhookError::Authentication.error_code());
    }

    #[test]
    fn processing_errors_are_acknowledged() {
        let err = WebhookError::Processing("database down".into());
        assert_eq!(err.status_code(), StatusCode::OK);
        assert!(err.is_acknowledged());
    }

    #[test]
    fn rejected_errors_are_not_acknowledged() {
        assert!(!WebhookError::Authentication.is_acknowledged());
        assert!(!WebhookError::MissingField("id").is_acknowledged());
        assert!(!WebhookError::Configuration("x".into()).is_acknowledged());
    }

    // ══════════════════════════════════════════════════════════════
    // Message Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn missing_field_displays_field_name() {
        let err = WebhookError::MissingField("TransactionId");
        assert_eq!(format!("{}", err), "Missing field: TransactionId");
    }

    #[test]
    fn public_message_hides_detail() {
        let err = WebhookError::Configuration("YOOKASSA secret absent".into());
        assert!(!err.public_message().contains("YOOKASSA"));

        let err = WebhookError::Validation("expected value at line 1".into());
        assert!(!err.public_message().contains("line 1"));
    }

    #[test]
    fn json_errors_become_validation() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: WebhookError = json_err.into();
        assert!(matches!(err, WebhookError::Validation(_)));
    }
}
