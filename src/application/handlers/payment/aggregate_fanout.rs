//! AggregateFanout - credits a completed donation to its running totals.
//!
//! Runs at most once per donation: callers invoke it only after winning the
//! `pending → completed` write or inserting a new recurring donation. The
//! donor, campaign and fund increments are independent. One failing does not
//! stop the others, and none of them roll back the donation status.

use std::sync::Arc;
use tracing::{error, info};

use super::NotificationDispatcher;
use crate::domain::donation::Donation;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{AggregateStore, Notification};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    /// The donation is not linked to this aggregate.
    Skipped,
    Failed(String),
}

impl StepOutcome {
    fn from_result<T>(result: Result<T, DomainError>) -> Self {
        match result {
            Ok(_) => StepOutcome::Applied,
            Err(e) => StepOutcome::Failed(e.to_string()),
        }
    }
}

/// Per-aggregate result of one fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutReport {
    pub donor: StepOutcome,
    pub campaign: StepOutcome,
    pub fund: StepOutcome,
}

impl FanoutReport {
    pub fn has_failures(&self) -> bool {
        [&self.donor, &self.campaign, &self.fund]
            .iter()
            .any(|step| matches!(step, StepOutcome::Failed(_)))
    }
}

pub struct AggregateFanout {
    aggregates: Arc<dyn AggregateStore>,
    notifications: NotificationDispatcher,
}

impl AggregateFanout {
    pub fn new(aggregates: Arc<dyn AggregateStore>, notifications: NotificationDispatcher) -> Self {
        Self {
            aggregates,
            notifications,
        }
    }

    /// Increments every aggregate `donation` is linked to.
    ///
    /// Never fails; partial failures are logged and reported for manual repair.
    pub async fn apply_completed(&self, donation: &Donation) -> FanoutReport {
        let (donor, campaign, fund) = tokio::join!(
            self.credit_donor(donation),
            self.credit_campaign(donation),
            self.credit_fund(donation),
        );

        let report = FanoutReport {
            donor,
            campaign,
            fund,
        };

        if report.has_failures() {
            error!(
                donation_id = %donation.id,
                donor = ?report.donor,
                campaign = ?report.campaign,
                fund = ?report.fund,
                "Aggregate fan-out partially failed, totals need manual reconciliation"
            );
        } else {
            info!(donation_id = %donation.id, amount = %donation.amount, "Aggregates credited");
        }

        report
    }

    async fn credit_donor(&self, donation: &Donation) -> StepOutcome {
        let result = self
            .aggregates
            .increment_donor_total(&donation.donor_id, &donation.amount)
            .await;
        if let Err(e) = &result {
            error!(
                donation_id = %donation.id,
                donor_id = %donation.donor_id,
                error = %e,
                "Failed to credit donor total"
            );
        }
        StepOutcome::from_result(result)
    }

    async fn credit_campaign(&self, donation: &Donation) -> StepOutcome {
        let Some(campaign_id) = donation.campaign_id else {
            return StepOutcome::Skipped;
        };

        match self
            .aggregates
            .increment_campaign_amount(&campaign_id, &donation.amount)
            .await
        {
            Ok(totals) => {
                self.notifications.dispatch(Notification::CampaignFundsReceived {
                    owner_id: totals.owner_id,
                    campaign_id,
                    campaign_title: totals.title,
                    amount: donation.amount.clone(),
                    donor_id: (!donation.is_anonymous).then_some(donation.donor_id),
                    current_amount: totals.current_amount,
                });
                StepOutcome::Applied
            }
            Err(e) => {
                error!(
                    donation_id = %donation.id,
                    campaign_id = %campaign_id,
                    not_found = e.code == ErrorCode::CampaignNotFound,
                    error = %e,
                    "Failed to credit campaign"
                );
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    async fn credit_fund(&self, donation: &Donation) -> StepOutcome {
        let Some(fund_id) = donation.fund_id else {
            return StepOutcome::Skipped;
        };

        let result = self
            .aggregates
            .increment_fund_total(&fund_id, &donation.amount)
            .await;
        if let Err(e) = &result {
            error!(
                donation_id = %donation.id,
                fund_id = %fund_id,
                error = %e,
                "Failed to credit fund"
            );
        }
        StepOutcome::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryAggregateStore, InMemoryRecipientDirectory};
    use crate::domain::foundation::{
        CampaignId, Currency, DonationId, DonorId, FundId, Money, UserId,
    };
    use crate::domain::payment::PaymentProvider;

    fn rub(minor: i64) -> Money {
        Money::new(minor, Currency::parse("RUB").unwrap()).unwrap()
    }

    fn silent_dispatcher() -> NotificationDispatcher {
        NotificationDispatcher::new(Vec::new(), Arc::new(InMemoryRecipientDirectory::new()))
    }

    fn donation_of(amount: i64) -> Donation {
        Donation::pending(
            DonationId::new(),
            DonorId::new(),
            rub(amount),
            PaymentProvider::CloudPayments,
        )
    }

    #[tokio::test]
    async fn credits_donor_campaign_and_fund() {
        let store = Arc::new(InMemoryAggregateStore::new());
        let campaign_id = CampaignId::new();
        let fund_id = FundId::new();
        store.add_campaign(campaign_id, UserId::new(), "Roof repair").await;
        store.add_fund(fund_id).await;
        let fanout = AggregateFanout::new(store.clone(), silent_dispatcher());

        let donation = donation_of(50000).for_campaign(campaign_id).for_fund(fund_id);
        let report = fanout.apply_completed(&donation).await;

        assert!(!report.has_failures());
        assert_eq!(store.donor_total(&donation.donor_id).await, 50000);
        assert_eq!(store.campaign_amount(&campaign_id).await, Some(50000));
        assert_eq!(store.campaign_donors(&campaign_id).await, Some(1));
        assert_eq!(store.fund_total(&fund_id).await, Some(50000));
    }

    #[tokio::test]
    async fn unlinked_aggregates_are_skipped() {
        let store = Arc::new(InMemoryAggregateStore::new());
        let fanout = AggregateFanout::new(store.clone(), silent_dispatcher());

        let donation = donation_of(1000);
        let report = fanout.apply_completed(&donation).await;

        assert_eq!(
            report,
            FanoutReport {
                donor: StepOutcome::Applied,
                campaign: StepOutcome::Skipped,
                fund: StepOutcome::Skipped,
            }
        );
        assert_eq!(store.donor_total(&donation.donor_id).await, 1000);
    }

    #[tokio::test]
    async fn missing_campaign_does_not_stop_other_steps() {
        let store = Arc::new(InMemoryAggregateStore::new());
        let fund_id = FundId::new();
        store.add_fund(fund_id).await;
        let fanout = AggregateFanout::new(store.clone(), silent_dispatcher());

        let donation = donation_of(700).for_campaign(CampaignId::new()).for_fund(fund_id);
        let report = fanout.apply_completed(&donation).await;

        assert!(report.has_failures());
        assert!(matches!(report.campaign, StepOutcome::Failed(_)));
        assert_eq!(report.fund, StepOutcome::Applied);
        assert_eq!(store.donor_total(&donation.donor_id).await, 700);
        assert_eq!(store.fund_total(&fund_id).await, Some(700));
    }

    #[tokio::test]
    async fn concurrent_donations_do_not_lose_updates() {
        let store = Arc::new(InMemoryAggregateStore::new());
        let campaign_id = CampaignId::new();
        store.add_campaign(campaign_id, UserId::new(), "Shelter").await;
        let fanout = AggregateFanout::new(store.clone(), silent_dispatcher());

        let first = donation_of(10000).for_campaign(campaign_id);
        let second = donation_of(25000).for_campaign(campaign_id);
        tokio::join!(fanout.apply_completed(&first), fanout.apply_completed(&second));

        assert_eq!(store.campaign_amount(&campaign_id).await, Some(35000));
        assert_eq!(store.campaign_donors(&campaign_id).await, Some(2));
    }
}
