//! Notification ports - outbound delivery and recipient lookup.
//!
//! Delivery is best-effort. Channels report failures through
//! `NotificationError`; the dispatcher logs and drops them.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{
    CampaignId, DomainError, DonationId, DonorId, Money, SubscriptionId, Timestamp, UserId,
};

/// Downstream notification produced by a reconciled callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Thank-you to the donor for a completed one-time donation.
    DonationConfirmed {
        donor_id: DonorId,
        donation_id: DonationId,
        amount: Money,
    },

    /// Tells a campaign owner their campaign received funds.
    CampaignFundsReceived {
        owner_id: UserId,
        campaign_id: CampaignId,
        campaign_title: String,
        amount: Money,
        /// `None` for anonymous donations.
        donor_id: Option<DonorId>,
        current_amount: i64,
    },

    SubscriptionRenewed {
        donor_id: DonorId,
        subscription_id: SubscriptionId,
        amount: Money,
        next_billing_date: Timestamp,
    },

    SubscriptionPaymentFailed {
        donor_id: DonorId,
        subscription_id: SubscriptionId,
        reason: Option<String>,
    },
}

impl Notification {
    /// The user who receives this notification.
    pub fn recipient_id(&self) -> UserId {
        match self {
            Notification::DonationConfirmed { donor_id, .. }
            | Notification::SubscriptionRenewed { donor_id, .. }
            | Notification::SubscriptionPaymentFailed { donor_id, .. } => (*donor_id).into(),
            Notification::CampaignFundsReceived { owner_id, .. } => *owner_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::DonationConfirmed { .. } => "donation_confirmed",
            Notification::CampaignFundsReceived { .. } => "campaign_funds_received",
            Notification::SubscriptionRenewed { .. } => "subscription_renewed",
            Notification::SubscriptionPaymentFailed { .. } => "subscription_payment_failed",
        }
    }
}

/// Contact details for a notification recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    /// Recipient has no address for this channel.
    #[error("Recipient {0} has no address for this channel")]
    NoAddress(UserId),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// One outbound delivery channel (e-mail, messenger, log).
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(
        &self,
        notification: &Notification,
        recipient: &Recipient,
    ) -> Result<(), NotificationError>;
}

/// Resolves user ids to contact details.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Returns `None` if the user does not exist.
    async fn find_recipient(&self, user_id: &UserId) -> Result<Option<Recipient>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Currency;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn NotificationChannel, _: &dyn RecipientDirectory) {}

    fn rub(minor: i64) -> Money {
        Money::new(minor, Currency::parse("RUB").unwrap()).unwrap()
    }

    #[test]
    fn donor_notifications_go_to_donor() {
        let donor_id = DonorId::new();
        let notification = Notification::DonationConfirmed {
            donor_id,
            donation_id: DonationId::new(),
            amount: rub(500),
        };
        assert_eq!(notification.recipient_id().as_uuid(), donor_id.as_uuid());
    }

    #[test]
    fn campaign_notifications_go_to_owner() {
        let owner_id = UserId::new();
        let notification = Notification::CampaignFundsReceived {
            owner_id,
            campaign_id: CampaignId::new(),
            campaign_title: "Well".into(),
            amount: rub(500),
            donor_id: None,
            current_amount: 500,
        };
        assert_eq!(notification.recipient_id(), owner_id);
        assert_eq!(notification.kind(), "campaign_funds_received");
    }

    #[test]
    fn rejected_error_displays_status() {
        let err = NotificationError::Rejected {
            status: 422,
            body: "invalid from".into(),
        };
        assert_eq!(err.to_string(), "Delivery rejected with status 422: invalid from");
    }
}
