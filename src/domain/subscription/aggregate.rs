//! Subscription aggregate entity.
//!
//! A subscription is a recurring donation agreement charged by the provider
//! on its own schedule. We only mirror the outcome of each charge.
//!
//! # Invariants
//!
//! - While active, `next_billing_date` is after the last successful charge
//! - A failed charge never moves `next_billing_date`
//! - A provider transaction is recorded as a successful charge at most once
//! - `last_payment_date` only moves forward

use crate::domain::foundation::{
    DomainError, DonorId, ErrorCode, Money, SubscriptionId, Timestamp,
};
use crate::domain::payment::PaymentProvider;
use serde::{Deserialize, Serialize};

use super::{BillingFrequency, SubscriptionStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub donor_id: DonorId,
    pub tier: String,
    pub amount: Money,
    pub frequency: BillingFrequency,
    pub status: SubscriptionStatus,
    pub provider: PaymentProvider,
    /// Recurring-charge identifier issued by the provider.
    pub provider_recurring_id: String,
    pub next_billing_date: Timestamp,
    pub last_payment_date: Option<Timestamp>,
    pub last_payment_transaction_id: Option<String>,
    pub last_payment_failed_at: Option<Timestamp>,
    pub last_payment_failure_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Fields written by a successful charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeSuccess {
    pub transaction_id: String,
    pub charged_at: Timestamp,
    pub next_billing_date: Timestamp,
}

/// Fields written by a declined charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeFailure {
    pub failed_at: Timestamp,
    pub reason: String,
}

impl Subscription {
    /// Creates an active subscription whose first charge is due at `next_billing_date`.
    pub fn active(
        donor_id: DonorId,
        tier: impl Into<String>,
        amount: Money,
        frequency: BillingFrequency,
        provider: PaymentProvider,
        provider_recurring_id: impl Into<String>,
        next_billing_date: Timestamp,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            donor_id,
            tier: tier.into(),
            amount,
            frequency,
            status: SubscriptionStatus::Active,
            provider,
            provider_recurring_id: provider_recurring_id.into(),
            next_billing_date,
            last_payment_date: None,
            last_payment_transaction_id: None,
            last_payment_failed_at: None,
            last_payment_failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True if `transaction_id` is already the last recorded successful charge.
    pub fn has_recorded(&self, transaction_id: &str) -> bool {
        self.last_payment_transaction_id.as_deref() == Some(transaction_id)
    }

    /// True unless the last recorded charge is newer than `charged_at`.
    pub fn accepts_charge_at(&self, charged_at: &Timestamp) -> bool {
        self.last_payment_date
            .map_or(true, |last| !last.is_after(charged_at))
    }

    /// Computes the successful-charge update for this subscription.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the subscription is not billable and
    /// `ValidationFailed` if the next date would overflow.
    pub fn plan_charge(
        &self,
        transaction_id: impl Into<String>,
        charged_at: Timestamp,
    ) -> Result<ChargeSuccess, DomainError> {
        self.ensure_billable()?;
        let next_billing_date = self.frequency.next_billing_date(charged_at)?;
        Ok(ChargeSuccess {
            transaction_id: transaction_id.into(),
            charged_at,
            next_billing_date,
        })
    }

    /// Applies a successful charge in memory.
    ///
    /// Returns `false` without modifying anything when the transaction was
    /// already recorded or is older than the last recorded charge.
    pub fn record_charge(&mut self, charge: &ChargeSuccess) -> Result<bool, DomainError> {
        self.ensure_billable()?;
        if self.has_recorded(&charge.transaction_id)
            || !self.accepts_charge_at(&charge.charged_at)
        {
            return Ok(false);
        }
        self.next_billing_date = charge.next_billing_date;
        self.last_payment_date = Some(charge.charged_at);
        self.last_payment_transaction_id = Some(charge.transaction_id.clone());
        self.updated_at = charge.charged_at;
        Ok(true)
    }

    /// Stamps a declined charge. The billing date is left untouched.
    pub fn record_failure(&mut self, failure: &ChargeFailure) {
        self.last_payment_failed_at = Some(failure.failed_at);
        self.last_payment_failure_reason = Some(failure.reason.clone());
        self.updated_at = failure.failed_at;
    }

    fn ensure_billable(&self) -> Result<(), DomainError> {
        if self.status.is_billable() {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Subscription {} is {} and cannot be charged", self.id, self.status),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Currency;
    use chrono::{DateTime, Utc};

    fn at(rfc3339: &str) -> Timestamp {
        Timestamp::from_datetime(
            DateTime::parse_from_rfc3339(rfc3339)
                .unwrap()
                .with_timezone(&Utc),
        )
    }

    fn monthly() -> Subscription {
        Subscription::active(
            DonorId::new(),
            "supporter",
            Money::new(30000, Currency::parse("RUB").unwrap()).unwrap(),
            BillingFrequency::Monthly,
            PaymentProvider::CloudPayments,
            "sc_123",
            at("2024-05-10T09:00:00Z"),
        )
    }

    #[test]
    fn plan_charge_advances_from_charge_time() {
        let sub = monthly();
        let charge = sub.plan_charge("tx-1", at("2024-05-10T09:05:00Z")).unwrap();
        assert_eq!(charge.next_billing_date, at("2024-06-10T09:05:00Z"));
    }

    #[test]
    fn record_charge_is_idempotent_per_transaction() {
        let mut sub = monthly();
        let charge = sub.plan_charge("tx-1", at("2024-05-10T09:05:00Z")).unwrap();

        assert!(sub.record_charge(&charge).unwrap());
        let replay = sub.plan_charge("tx-1", at("2024-05-10T10:00:00Z")).unwrap();
        assert!(!sub.record_charge(&replay).unwrap());

        assert_eq!(sub.next_billing_date, at("2024-06-10T09:05:00Z"));
        assert_eq!(sub.last_payment_transaction_id.as_deref(), Some("tx-1"));
    }

    #[test]
    fn older_charge_does_not_rewind_schedule() {
        let mut sub = monthly();
        let first = sub.plan_charge("tx-1", at("2024-05-10T09:05:00Z")).unwrap();
        let second = sub.plan_charge("tx-2", at("2024-06-10T09:05:00Z")).unwrap();
        assert!(sub.record_charge(&first).unwrap());
        assert!(sub.record_charge(&second).unwrap());

        assert!(!sub.accepts_charge_at(&first.charged_at));
        assert!(!sub.record_charge(&first).unwrap());

        assert_eq!(sub.next_billing_date, at("2024-07-10T09:05:00Z"));
        assert_eq!(sub.last_payment_date, Some(at("2024-06-10T09:05:00Z")));
        assert_eq!(sub.last_payment_transaction_id.as_deref(), Some("tx-2"));
    }

    #[test]
    fn failure_keeps_billing_date() {
        let mut sub = monthly();
        let before = sub.next_billing_date;

        sub.record_failure(&ChargeFailure {
            failed_at: at("2024-05-10T09:05:00Z"),
            reason: "Insufficient funds".into(),
        });

        assert_eq!(sub.next_billing_date, before);
        assert_eq!(sub.last_payment_failure_reason.as_deref(), Some("Insufficient funds"));
        assert!(sub.last_payment_failed_at.is_some());
    }

    #[test]
    fn paused_subscription_cannot_be_charged() {
        let mut sub = monthly();
        sub.status = SubscriptionStatus::Paused;

        let err = sub.plan_charge("tx-1", Timestamp::now()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }
}
