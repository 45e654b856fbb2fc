//! YooKassa notification payloads.
//!
//! Notifications wrap a payment or refund object. Checkout stores our
//! donation id in the object's `metadata` map.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::normalizer::{
    ensure_correlated, non_blank, parse_amount, parse_body, scalar_to_string, WebhookNormalizer,
};
use super::{PaymentEvent, PaymentProvider, PaymentStatus, WebhookError};

#[derive(Debug, Deserialize)]
pub struct YooKassaNotification {
    pub event: Option<String>,
    pub object: Option<YooKassaObject>,
}

#[derive(Debug, Deserialize)]
pub struct YooKassaObject {
    pub id: Option<Value>,
    /// Set on refund objects.
    pub payment_id: Option<String>,
    pub amount: Option<YooKassaAmount>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub payment_method: Option<YooKassaPaymentMethod>,
    pub cancellation_details: Option<YooKassaCancellation>,
}

#[derive(Debug, Deserialize)]
pub struct YooKassaAmount {
    pub value: Value,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct YooKassaPaymentMethod {
    pub id: Option<String>,
    #[serde(default)]
    pub saved: bool,
}

#[derive(Debug, Deserialize)]
pub struct YooKassaCancellation {
    pub reason: Option<String>,
}

fn map_event(event: &str) -> PaymentStatus {
    match event.trim() {
        "payment.succeeded" => PaymentStatus::Succeeded,
        "payment.canceled" => PaymentStatus::Declined { reason: None },
        "refund.succeeded" => PaymentStatus::Refunded,
        _ => PaymentStatus::Unknown,
    }
}

fn metadata_value(metadata: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| scalar_to_string(metadata.get(*key)))
}

impl YooKassaObject {
    fn recurring_id(&self) -> Option<String> {
        metadata_value(&self.metadata, &["subscriptionId", "subscription_id"]).or_else(|| {
            self.payment_method
                .as_ref()
                .filter(|method| method.saved)
                .and_then(|method| non_blank(method.id.as_deref()))
        })
    }
}

pub struct YooKassaNormalizer;

impl WebhookNormalizer for YooKassaNormalizer {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::YooKassa
    }

    fn normalize(&self, body: &[u8]) -> Result<PaymentEvent, WebhookError> {
        let notification: YooKassaNotification = parse_body(body)?;

        let event_type = non_blank(notification.event.as_deref())
            .ok_or(WebhookError::MissingField("event"))?;
        let object = notification
            .object
            .ok_or(WebhookError::MissingField("object"))?;
        let transaction_id =
            scalar_to_string(object.id.as_ref()).ok_or(WebhookError::MissingField("object.id"))?;

        let status = match map_event(&event_type) {
            PaymentStatus::Declined { .. } => PaymentStatus::Declined {
                reason: object
                    .cancellation_details
                    .as_ref()
                    .and_then(|details| non_blank(details.reason.as_deref())),
            },
            other => other,
        };

        let amount = match &object.amount {
            Some(amount) => parse_amount(Some(&amount.value), amount.currency.as_deref())?,
            None => None,
        };

        let event = PaymentEvent {
            provider: PaymentProvider::YooKassa,
            transaction_id,
            original_transaction_id: non_blank(object.payment_id.as_deref()),
            correlation_key: metadata_value(&object.metadata, &["donationId", "donation_id"]),
            recurring_id: object.recurring_id(),
            status,
            amount,
            event_type,
        };

        ensure_correlated(event)
    }
}
