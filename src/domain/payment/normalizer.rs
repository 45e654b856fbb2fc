//! Provider payload normalization.
//!
//! Each provider gets one `WebhookNormalizer`. Adding a provider means adding
//! a normalizer; nothing downstream branches on the provider's payload shape.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::foundation::{Currency, Money};

use super::{PaymentEvent, PaymentProvider, WebhookError};

pub trait WebhookNormalizer: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    /// Parses a raw callback body into a canonical event.
    ///
    /// # Errors
    ///
    /// - `Validation` - malformed JSON or unusable field values
    /// - `MissingField` - no transaction id, or no correlation key on a
    ///   known, non-recurring event
    fn normalize(&self, body: &[u8]) -> Result<PaymentEvent, WebhookError>;
}

pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, WebhookError> {
    Ok(serde_json::from_slice(body)?)
}

/// Reads an identifier that providers send as either a string or a number.
///
/// Blank strings count as absent.
pub(crate) fn scalar_to_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parses an amount sent as a JSON number or a decimal string.
pub(crate) fn parse_amount(
    amount: Option<&Value>,
    currency: Option<&str>,
) -> Result<Option<Money>, WebhookError> {
    let raw = match amount {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(WebhookError::Validation(
                "amount must be a number or decimal string".to_string(),
            ))
        }
    };
    let currency = non_blank(currency).ok_or(WebhookError::MissingField("currency"))?;
    let currency = Currency::parse(&currency)?;
    Ok(Some(Money::from_decimal_str(&raw, currency)?))
}

/// Enforces that a known event can be located.
///
/// Recurring charges correlate through the subscription, so a recurring id
/// stands in for the correlation key. Unknown events are ignored downstream
/// and need neither.
pub(crate) fn ensure_correlated(event: PaymentEvent) -> Result<PaymentEvent, WebhookError> {
    if event.status.is_known() && event.correlation_key.is_none() && event.recurring_id.is_none()
    {
        return Err(WebhookError::MissingField("correlation key"));
    }
    Ok(event)
}
