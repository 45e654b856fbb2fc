//! CloudPayments notification payloads.
//!
//! Pay, Fail and Refund notifications share one PascalCase shape. Checkout
//! puts our donation id in `InvoiceId`, either as a JSON object or as the
//! bare id string.

use serde::Deserialize;
use serde_json::Value;

use super::normalizer::{
    ensure_correlated, non_blank, parse_amount, parse_body, scalar_to_string, WebhookNormalizer,
};
use super::{PaymentEvent, PaymentProvider, PaymentStatus, WebhookError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CloudPaymentsNotification {
    pub transaction_id: Option<Value>,
    /// Original payment on Refund notifications.
    pub payment_transaction_id: Option<Value>,
    pub status: Option<String>,
    pub amount: Option<Value>,
    pub currency: Option<String>,
    pub invoice_id: Option<Value>,
    #[serde(alias = "SubscriptionId")]
    pub recurring_id: Option<String>,
    #[serde(alias = "CardHolderMessage")]
    pub reason: Option<String>,
}

/// Structured form of `InvoiceId` written by checkout.
#[derive(Debug, Deserialize)]
struct InvoiceReference {
    #[serde(rename = "donationId", alias = "donation_id")]
    donation_id: Option<Value>,
}

/// Resolves the correlation key from `InvoiceId`.
///
/// Tries the structured JSON form first, then treats the raw value as the id.
pub fn parse_invoice_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str::<InvoiceReference>(raw) {
        Ok(reference) => scalar_to_string(reference.donation_id.as_ref()),
        Err(_) => Some(raw.to_string()),
    }
}

fn correlation_from_invoice(invoice_id: Option<&Value>) -> Option<String> {
    let invoice_id = invoice_id?;
    if invoice_id.is_object() {
        let reference = InvoiceReference::deserialize(invoice_id).ok()?;
        return scalar_to_string(reference.donation_id.as_ref());
    }
    scalar_to_string(Some(invoice_id)).and_then(|raw| parse_invoice_id(&raw))
}

fn map_status(status: Option<&str>) -> PaymentStatus {
    match status.map(str::trim) {
        Some("Completed") | Some("Authorized") => PaymentStatus::Succeeded,
        Some("Declined") | Some("Cancelled") => PaymentStatus::Declined { reason: None },
        Some("Refunded") => PaymentStatus::Refunded,
        _ => PaymentStatus::Unknown,
    }
}

pub struct CloudPaymentsNormalizer;

impl WebhookNormalizer for CloudPaymentsNormalizer {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::CloudPayments
    }

    fn normalize(&self, body: &[u8]) -> Result<PaymentEvent, WebhookError> {
        let notification: CloudPaymentsNotification = parse_body(body)?;

        let transaction_id = scalar_to_string(notification.transaction_id.as_ref())
            .ok_or(WebhookError::MissingField("TransactionId"))?;

        let status = match map_status(notification.status.as_deref()) {
            PaymentStatus::Declined { .. } => PaymentStatus::Declined {
                reason: non_blank(notification.reason.as_deref()),
            },
            other => other,
        };

        let event = PaymentEvent {
            provider: PaymentProvider::CloudPayments,
            event_type: notification
                .status
                .clone()
                .unwrap_or_else(|| "unspecified".to_string()),
            transaction_id,
            original_transaction_id: scalar_to_string(notification.payment_transaction_id.as_ref()),
            correlation_key: correlation_from_invoice(notification.invoice_id.as_ref()),
            status,
            amount: parse_amount(notification.amount.as_ref(), notification.currency.as_deref())?,
            recurring_id: non_blank(notification.recurring_id.as_deref()),
        };

        ensure_correlated(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DONATION: &str = "1b4e28ba-2fa1-11d2-883f-0016d3cca427";

    fn normalize(body: Value) -> Result<PaymentEvent, WebhookError> {
        CloudPaymentsNormalizer.normalize(body.to_string().as_bytes())
    }

    // ══════════════════════════════════════════════════════════════
    // InvoiceId Decoding Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invoice_id_structured_form() {
        let raw = format!(r#"{{"donationId":"{}","subscription":false}}"#, DONATION);
        assert_eq!(parse_invoice_id(&raw), Some(DONATION.to_string()));
    }

    #[test]
    fn invoice_id_bare_string_falls_back() {
        assert_eq!(parse_invoice_id(DONATION), Some(DONATION.to_string()));
        assert_eq!(parse_invoice_id("D1"), Some("D1".to_string()));
    }

    #[test]
    fn invoice_id_object_without_donation_has_no_key() {
        assert_eq!(
            parse_invoice_id(r#"{"subscription":true,"subscriptionId":"s1"}"#),
            None
        );
        assert_eq!(parse_invoice_id("  "), None);
    }

    // ══════════════════════════════════════════════════════════════
    // Normalization Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn completed_payment_normalizes() {
        let event = normalize(json!({
            "TransactionId": 1001,
            "Amount": 500,
            "Currency": "RUB",
            "Status": "Completed",
            "InvoiceId": format!(r#"{{"donationId":"{}"}}"#, DONATION),
        }))
        .unwrap();

        assert_eq!(event.provider, PaymentProvider::CloudPayments);
        assert_eq!(event.transaction_id, "1001");
        assert_eq!(event.correlation_key.as_deref(), Some(DONATION));
        assert_eq!(event.status, PaymentStatus::Succeeded);
        assert_eq!(event.amount.unwrap().minor_units(), 50000);
        assert!(event.recurring_id.is_none());
    }

    #[test]
    fn invoice_id_as_inline_object() {
        let event = normalize(json!({
            "TransactionId": 1008,
            "Status": "Completed",
            "InvoiceId": { "donationId": DONATION },
        }))
        .unwrap();
        assert_eq!(event.correlation_key.as_deref(), Some(DONATION));
    }

    #[test]
    fn authorized_counts_as_success() {
        let event = normalize(json!({
            "TransactionId": "1002",
            "Status": "Authorized",
            "InvoiceId": DONATION,
        }))
        .unwrap();
        assert_eq!(event.status, PaymentStatus::Succeeded);
        assert!(event.amount.is_none());
    }

    #[test]
    fn declined_carries_reason() {
        let event = normalize(json!({
            "TransactionId": 1003,
            "Status": "Declined",
            "Reason": "InsufficientFunds",
            "InvoiceId": DONATION,
        }))
        .unwrap();
        assert_eq!(event.failure_reason(), Some("InsufficientFunds"));
    }

    #[test]
    fn card_holder_message_is_reason_alias() {
        let event = normalize(json!({
            "TransactionId": 1004,
            "Status": "Cancelled",
            "CardHolderMessage": "Card expired",
            "InvoiceId": DONATION,
        }))
        .unwrap();
        assert_eq!(event.failure_reason(), Some("Card expired"));
    }

    #[test]
    fn subscription_id_is_recurring_alias() {
        let event = normalize(json!({
            "TransactionId": 1005,
            "Status": "Authorized",
            "SubscriptionId": "sc_8cf8a9338fb8ebf7202b08d09c938",
            "Amount": 300,
            "Currency": "RUB",
        }))
        .unwrap();
        assert_eq!(
            event.recurring_id.as_deref(),
            Some("sc_8cf8a9338fb8ebf7202b08d09c938")
        );
        assert!(event.correlation_key.is_none());
    }

    #[test]
    fn refund_keeps_original_transaction() {
        let event = normalize(json!({
            "TransactionId": 2001,
            "PaymentTransactionId": 1001,
            "Status": "Refunded",
            "InvoiceId": DONATION,
        }))
        .unwrap();
        assert_eq!(event.status, PaymentStatus::Refunded);
        assert_eq!(event.original_transaction_id.as_deref(), Some("1001"));
    }

    #[test]
    fn unrecognized_status_is_unknown_not_error() {
        let event = normalize(json!({
            "TransactionId": 1006,
            "Status": "AwaitingAuthentication",
        }))
        .unwrap();
        assert_eq!(event.status, PaymentStatus::Unknown);
        assert_eq!(event.event_type, "AwaitingAuthentication");
    }

    #[test]
    fn missing_transaction_id_is_rejected() {
        let err = normalize(json!({
            "Status": "Completed",
            "InvoiceId": DONATION,
        }))
        .unwrap_err();
        assert!(matches!(err, WebhookError::MissingField("TransactionId")));
    }

    #[test]
    fn missing_correlation_key_is_rejected() {
        let err = normalize(json!({
            "TransactionId": 1007,
            "Status": "Completed",
        }))
        .unwrap_err();
        assert!(matches!(err, WebhookError::MissingField("correlation key")));
    }

    #[test]
    fn malformed_json_is_validation_error() {
        let err = CloudPaymentsNormalizer.normalize(b"{not json").unwrap_err();
        assert!(matches!(err, WebhookError::Validation(_)));
    }
}
