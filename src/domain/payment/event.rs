//! Canonical payment event produced by every provider normalizer.

use serde::{Deserialize, Serialize};

use crate::domain::donation::DonationStatus;
use crate::domain::foundation::Money;

use super::PaymentProvider;

/// Outcome reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaymentStatus {
    Succeeded,
    Declined { reason: Option<String> },
    Refunded,
    /// Anything we do not act on. Acknowledged and ignored.
    Unknown,
}

impl PaymentStatus {
    /// Donation status this outcome settles to, if any.
    pub fn target_donation_status(&self) -> Option<DonationStatus> {
        match self {
            PaymentStatus::Succeeded => Some(DonationStatus::Completed),
            PaymentStatus::Declined { .. } => Some(DonationStatus::Failed),
            PaymentStatus::Refunded => Some(DonationStatus::Refunded),
            PaymentStatus::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, PaymentStatus::Unknown)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Declined { .. } => "declined",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub provider: PaymentProvider,
    /// Raw provider event or status name, kept for logs and the audit log.
    pub event_type: String,
    /// Provider identifier of the operation this callback reports.
    pub transaction_id: String,
    /// For refunds, the payment the refund belongs to.
    pub original_transaction_id: Option<String>,
    /// Internal donation identifier as embedded by checkout. Not yet parsed.
    pub correlation_key: Option<String>,
    pub status: PaymentStatus,
    pub amount: Option<Money>,
    /// Provider recurring-charge identifier, present on subscription charges.
    pub recurring_id: Option<String>,
}

impl PaymentEvent {
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            PaymentStatus::Declined { reason } => reason.as_deref(),
            _ => None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.recurring_id.is_some()
    }
}
