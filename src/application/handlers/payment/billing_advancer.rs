//! BillingAdvancer - books recurring charges against their subscription.
//!
//! A successful charge becomes a new, already-completed recurring donation
//! and moves the subscription's billing date forward one period from the
//! charge time. A decline only stamps the failure.
//!
//! Both writes are conditional. The donation is keyed on
//! `(provider, provider_transaction_id)` and the subscription update is
//! guarded on `last_payment_transaction_id` and `last_payment_date`, so a
//! replay after a partial failure finishes the missing half without
//! repeating the other. A replay is dated by its stored donation, so an
//! older charge redelivered after a newer one leaves the schedule alone.

use std::sync::Arc;
use tracing::{info, warn};

use super::{AggregateFanout, NotificationDispatcher};
use crate::domain::donation::Donation;
use crate::domain::foundation::{DomainError, DonationId, SubscriptionId, Timestamp};
use crate::domain::payment::{PaymentEvent, PaymentStatus};
use crate::domain::subscription::{ChargeFailure, Subscription};
use crate::ports::{DonationRepository, Notification, SaveResult, SubscriptionRepository};

const DEFAULT_FAILURE_REASON: &str = "declined";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingOutcome {
    /// This callback created the recurring donation or advanced the schedule.
    Charged {
        subscription_id: SubscriptionId,
        /// `None` when the donation already existed and only the schedule moved.
        donation_id: Option<DonationId>,
        next_billing_date: Timestamp,
    },
    /// The charge was already fully booked.
    AlreadyCharged { subscription_id: SubscriptionId },
    ChargeFailed { subscription_id: SubscriptionId },
    NoActiveSubscription { recurring_id: String },
    NotApplicable,
}

impl BillingOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            BillingOutcome::Charged { .. } => "charged",
            BillingOutcome::AlreadyCharged { .. } => "already_charged",
            BillingOutcome::ChargeFailed { .. } => "charge_failed",
            BillingOutcome::NoActiveSubscription { .. } => "no_active_subscription",
            BillingOutcome::NotApplicable => "not_applicable",
        }
    }
}

pub struct BillingAdvancer {
    subscriptions: Arc<dyn SubscriptionRepository>,
    donations: Arc<dyn DonationRepository>,
    fanout: Arc<AggregateFanout>,
    notifications: NotificationDispatcher,
}

impl BillingAdvancer {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        donations: Arc<dyn DonationRepository>,
        fanout: Arc<AggregateFanout>,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            subscriptions,
            donations,
            fanout,
            notifications,
        }
    }

    /// Books `event` against the active subscription holding its recurring id.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` if a repository call fails
    /// - `ValidationFailed` if the next billing date cannot be represented
    pub async fn advance(&self, event: &PaymentEvent) -> Result<BillingOutcome, DomainError> {
        let Some(recurring_id) = event.recurring_id.as_deref() else {
            return Ok(BillingOutcome::NotApplicable);
        };
        if !matches!(
            event.status,
            PaymentStatus::Succeeded | PaymentStatus::Declined { .. }
        ) {
            return Ok(BillingOutcome::NotApplicable);
        }

        let Some(subscription) = self
            .subscriptions
            .find_active_by_recurring_id(event.provider, recurring_id)
            .await?
        else {
            warn!(
                provider = %event.provider,
                recurring_id,
                transaction_id = %event.transaction_id,
                "No active subscription for recurring charge, acknowledging"
            );
            return Ok(BillingOutcome::NoActiveSubscription {
                recurring_id: recurring_id.to_string(),
            });
        };

        match event.status {
            PaymentStatus::Succeeded => self.book_charge(event, subscription).await,
            _ => self.book_failure(event, subscription).await,
        }
    }

    async fn book_charge(
        &self,
        event: &PaymentEvent,
        subscription: Subscription,
    ) -> Result<BillingOutcome, DomainError> {
        if subscription.has_recorded(&event.transaction_id) {
            info!(
                subscription_id = %subscription.id,
                transaction_id = %event.transaction_id,
                "Recurring charge already booked"
            );
            return Ok(BillingOutcome::AlreadyCharged {
                subscription_id: subscription.id,
            });
        }

        if let Some(amount) = &event.amount {
            if *amount != subscription.amount {
                warn!(
                    subscription_id = %subscription.id,
                    expected = %subscription.amount,
                    reported = %amount,
                    "Recurring charge amount differs from subscription amount"
                );
            }
        }

        let donation =
            Donation::recurring_charge(&subscription, &event.transaction_id, Timestamp::now());
        let (inserted, charged_at) = match self.donations.insert_if_absent(&donation).await? {
            SaveResult::Inserted => {
                self.fanout.apply_completed(&donation).await;
                (true, donation.created_at)
            }
            SaveResult::AlreadyExists => {
                info!(
                    subscription_id = %subscription.id,
                    transaction_id = %event.transaction_id,
                    "Donation for recurring charge already exists"
                );
                let existing = self
                    .donations
                    .find_by_provider_transaction(event.provider, &event.transaction_id)
                    .await?;
                let charged_at = existing
                    .map(|d| d.completed_at.unwrap_or(d.created_at))
                    .unwrap_or_else(Timestamp::now);
                (false, charged_at)
            }
        };

        // An already-booked charge older than the last one must not rewind the schedule.
        if !inserted && !subscription.accepts_charge_at(&charged_at) {
            info!(
                subscription_id = %subscription.id,
                transaction_id = %event.transaction_id,
                "Recurring charge predates the last booked charge"
            );
            return Ok(BillingOutcome::AlreadyCharged {
                subscription_id: subscription.id,
            });
        }

        let charge = subscription.plan_charge(event.transaction_id.clone(), charged_at)?;
        let advanced = self
            .subscriptions
            .record_charge_success(&subscription.id, &charge)
            .await?;

        if advanced {
            info!(
                subscription_id = %subscription.id,
                transaction_id = %event.transaction_id,
                next_billing_date = %charge.next_billing_date.as_datetime(),
                "Subscription billing advanced"
            );
            self.notifications.dispatch(Notification::SubscriptionRenewed {
                donor_id: subscription.donor_id,
                subscription_id: subscription.id,
                amount: subscription.amount.clone(),
                next_billing_date: charge.next_billing_date,
            });
        }

        if inserted || advanced {
            Ok(BillingOutcome::Charged {
                subscription_id: subscription.id,
                donation_id: inserted.then_some(donation.id),
                next_billing_date: charge.next_billing_date,
            })
        } else {
            Ok(BillingOutcome::AlreadyCharged {
                subscription_id: subscription.id,
            })
        }
    }

    async fn book_failure(
        &self,
        event: &PaymentEvent,
        subscription: Subscription,
    ) -> Result<BillingOutcome, DomainError> {
        let reason = event.failure_reason().map(str::to_string);
        let failure = ChargeFailure {
            failed_at: Timestamp::now(),
            reason: reason
                .clone()
                .unwrap_or_else(|| DEFAULT_FAILURE_REASON.to_string()),
        };

        self.subscriptions
            .record_charge_failure(&subscription.id, &failure)
            .await?;

        warn!(
            subscription_id = %subscription.id,
            transaction_id = %event.transaction_id,
            reason = %failure.reason,
            "Recurring charge declined"
        );
        self.notifications.dispatch(Notification::SubscriptionPaymentFailed {
            donor_id: subscription.donor_id,
            subscription_id: subscription.id,
            reason,
        });

        Ok(BillingOutcome::ChargeFailed {
            subscription_id: subscription.id,
        })
    }
}
