//! Donation aggregate entity.
//!
//! A donation is one payment attempt. It is created elsewhere when checkout
//! starts and is settled here when the provider reports the outcome.
//!
//! # Invariants
//!
//! - Status only moves `pending → completed | failed` or `completed → refunded`
//! - Once settled, only the refund edge may change the record
//! - A donation targets at most one campaign and at most one fund

use crate::domain::foundation::{
    CampaignId, DomainError, DonationId, DonorId, ErrorCode, FundId, Money, StateMachine,
    SubscriptionId, Timestamp,
};
use crate::domain::payment::PaymentProvider;
use crate::domain::subscription::Subscription;
use serde::{Deserialize, Serialize};

use super::{DonationStatus, DonationType};

/// A conditional status change applied by the transition engine.
///
/// Storage applies it only when the row still holds `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub expected: DonationStatus,
    pub target: DonationStatus,
    pub provider_transaction_id: Option<String>,
    pub at: Timestamp,
}

impl StatusChange {
    /// Builds the change that reaches `target` from its only legal predecessor.
    pub fn to(target: DonationStatus, provider_transaction_id: Option<String>) -> Option<Self> {
        let expected = target.required_predecessor()?;
        Some(Self {
            expected,
            target,
            provider_transaction_id,
            at: Timestamp::now(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    pub id: DonationId,
    pub donor_id: DonorId,
    pub campaign_id: Option<CampaignId>,
    pub fund_id: Option<FundId>,
    pub subscription_id: Option<SubscriptionId>,
    pub amount: Money,
    pub donation_type: DonationType,
    pub status: DonationStatus,
    pub provider: PaymentProvider,
    pub provider_transaction_id: Option<String>,
    /// Hides the donor from campaign owners.
    pub is_anonymous: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl Donation {
    /// Creates a pending one-time donation awaiting a provider callback.
    pub fn pending(
        id: DonationId,
        donor_id: DonorId,
        amount: Money,
        provider: PaymentProvider,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            donor_id,
            campaign_id: None,
            fund_id: None,
            subscription_id: None,
            amount,
            donation_type: DonationType::OneTime,
            status: DonationStatus::Pending,
            provider,
            provider_transaction_id: None,
            is_anonymous: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn for_campaign(mut self, campaign_id: CampaignId) -> Self {
        self.campaign_id = Some(campaign_id);
        self
    }

    pub fn for_fund(mut self, fund_id: FundId) -> Self {
        self.fund_id = Some(fund_id);
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.is_anonymous = true;
        self
    }

    /// Materializes a successful subscription charge as an already-completed
    /// recurring donation.
    pub fn recurring_charge(
        subscription: &Subscription,
        provider_transaction_id: impl Into<String>,
        charged_at: Timestamp,
    ) -> Self {
        Self {
            id: DonationId::new(),
            donor_id: subscription.donor_id,
            campaign_id: None,
            fund_id: None,
            subscription_id: Some(subscription.id),
            amount: subscription.amount.clone(),
            donation_type: DonationType::Recurring,
            status: DonationStatus::Completed,
            provider: subscription.provider,
            provider_transaction_id: Some(provider_transaction_id.into()),
            is_anonymous: false,
            created_at: charged_at,
            updated_at: charged_at,
            completed_at: Some(charged_at),
        }
    }

    /// Applies a status change in memory.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when the current status differs from
    /// the expected one or the edge is not part of the state machine.
    pub fn apply(&mut self, change: &StatusChange) -> Result<(), DomainError> {
        if self.status != change.expected {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Donation is {} but {} was expected",
                    self.status, change.expected
                ),
            ));
        }

        self.status = self
            .status
            .transition_to(change.target)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;

        if let Some(tx) = &change.provider_transaction_id {
            self.provider_transaction_id = Some(tx.clone());
        }
        if change.target == DonationStatus::Completed {
            self.completed_at = Some(change.at);
        }
        self.updated_at = change.at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Currency;

    fn pending_donation() -> Donation {
        Donation::pending(
            DonationId::new(),
            DonorId::new(),
            Money::new(50000, Currency::parse("RUB").unwrap()).unwrap(),
            PaymentProvider::CloudPayments,
        )
    }

    #[test]
    fn pending_donation_has_no_target_by_default() {
        let donation = pending_donation();
        assert_eq!(donation.status, DonationStatus::Pending);
        assert_eq!(donation.donation_type, DonationType::OneTime);
        assert!(donation.campaign_id.is_none());
        assert!(donation.fund_id.is_none());
        assert!(!donation.is_anonymous);
    }

    #[test]
    fn status_change_picks_legal_predecessor() {
        let complete = StatusChange::to(DonationStatus::Completed, None).unwrap();
        assert_eq!(complete.expected, DonationStatus::Pending);

        let refund = StatusChange::to(DonationStatus::Refunded, None).unwrap();
        assert_eq!(refund.expected, DonationStatus::Completed);

        assert!(StatusChange::to(DonationStatus::Pending, None).is_none());
    }

    #[test]
    fn apply_completes_and_stamps_transaction() {
        let mut donation = pending_donation();
        let change = StatusChange::to(DonationStatus::Completed, Some("tx-1".into())).unwrap();

        donation.apply(&change).unwrap();

        assert_eq!(donation.status, DonationStatus::Completed);
        assert_eq!(donation.provider_transaction_id.as_deref(), Some("tx-1"));
        assert_eq!(donation.completed_at, Some(change.at));
    }

    #[test]
    fn apply_rejects_stale_expectation() {
        let mut donation = pending_donation();
        let change = StatusChange::to(DonationStatus::Completed, None).unwrap();
        donation.apply(&change).unwrap();

        let err = donation.apply(&change).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
        assert_eq!(donation.status, DonationStatus::Completed);
    }

    #[test]
    fn refund_does_not_clear_completion_time() {
        let mut donation = pending_donation();
        donation
            .apply(&StatusChange::to(DonationStatus::Completed, None).unwrap())
            .unwrap();
        let completed_at = donation.completed_at;

        donation
            .apply(&StatusChange::to(DonationStatus::Refunded, None).unwrap())
            .unwrap();

        assert_eq!(donation.status, DonationStatus::Refunded);
        assert_eq!(donation.completed_at, completed_at);
    }
}
