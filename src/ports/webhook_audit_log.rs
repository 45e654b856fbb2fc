//! WebhookAuditLog port - append-only record of received callbacks.
//!
//! One row per delivery, including duplicates and rejected callbacks, for
//! manual reconciliation. Writes are best-effort and the log is never read
//! to decide whether a callback was already applied; idempotence comes from
//! the conditional donation writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::foundation::DomainError;
use crate::domain::payment::PaymentProvider;

/// Record of one received webhook delivery.
#[derive(Debug, Clone)]
pub struct WebhookAuditRecord {
    pub provider: PaymentProvider,

    /// Provider transaction id, when the body could be normalized.
    pub transaction_id: Option<String>,

    /// Provider event or status name, when the body could be normalized.
    pub event_type: Option<String>,

    /// Outcome label, e.g. "completed", "duplicate", "rejected".
    pub outcome: String,

    /// Error message if processing failed or the callback was rejected.
    pub error_message: Option<String>,

    /// Original payload. Non-JSON bodies are stored as a string.
    pub payload: serde_json::Value,

    pub received_at: DateTime<Utc>,
}

impl WebhookAuditRecord {
    /// Creates a record for a callback that was accepted and processed.
    pub fn processed(
        provider: PaymentProvider,
        transaction_id: impl Into<String>,
        event_type: impl Into<String>,
        outcome: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            provider,
            transaction_id: Some(transaction_id.into()),
            event_type: Some(event_type.into()),
            outcome: outcome.into(),
            error_message: None,
            payload,
            received_at: Utc::now(),
        }
    }

    /// Creates a record for a callback whose processing failed after acceptance.
    pub fn failed(
        provider: PaymentProvider,
        transaction_id: impl Into<String>,
        event_type: impl Into<String>,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            provider,
            transaction_id: Some(transaction_id.into()),
            event_type: Some(event_type.into()),
            outcome: "processing_failed".to_string(),
            error_message: Some(error.into()),
            payload,
            received_at: Utc::now(),
        }
    }

    /// Creates a record for a callback rejected before normalization finished.
    pub fn rejected(
        provider: PaymentProvider,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            provider,
            transaction_id: None,
            event_type: None,
            outcome: "rejected".to_string(),
            error_message: Some(error.into()),
            payload,
            received_at: Utc::now(),
        }
    }
}

/// Converts a raw body to a storable payload.
pub fn payload_from_body(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(body).into_owned()))
}

#[async_trait]
pub trait WebhookAuditLog: Send + Sync {
    /// Append a delivery record.
    async fn record(&self, record: WebhookAuditRecord) -> Result<(), DomainError>;

    /// Delete records received before the specified timestamp.
    ///
    /// Returns the number of records deleted. Used for retention cleanup.
    async fn delete_before(&self, timestamp: DateTime<Utc>) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn WebhookAuditLog) {}

    // ══════════════════════════════════════════════════════════════
    // WebhookAuditRecord Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn processed_record_has_no_error() {
        let record = WebhookAuditRecord::processed(
            PaymentProvider::CloudPayments,
            "1001",
            "Completed",
            "completed",
            serde_json::json!({"TransactionId": 1001}),
        );

        assert_eq!(record.transaction_id.as_deref(), Some("1001"));
        assert_eq!(record.outcome, "completed");
        assert!(record.error_message.is_none());
    }

    #[test]
    fn failed_record_includes_error() {
        let record = WebhookAuditRecord::failed(
            PaymentProvider::YooKassa,
            "p1",
            "payment.succeeded",
            "Database connection failed",
            serde_json::json!({}),
        );

        assert_eq!(record.outcome, "processing_failed");
        assert_eq!(
            record.error_message.as_deref(),
            Some("Database connection failed")
        );
    }

    #[test]
    fn rejected_record_has_no_transaction() {
        let record = WebhookAuditRecord::rejected(
            PaymentProvider::YooKassa,
            "Invalid signature",
            serde_json::json!({}),
        );

        assert_eq!(record.outcome, "rejected");
        assert!(record.transaction_id.is_none());
        assert!(record.event_type.is_none());
    }

    #[test]
    fn payload_keeps_json_and_wraps_garbage() {
        assert_eq!(
            payload_from_body(br#"{"a":1}"#),
            serde_json::json!({"a": 1})
        );
        assert_eq!(
            payload_from_body(b"{not json"),
            serde_json::Value::String("{not json".to_string())
        );
    }
}
