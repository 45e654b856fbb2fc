//! AggregateStore port - atomic increments on running totals.
//!
//! Campaign, fund and donor totals are derived from completed donations.
//! Every mutation is a single "add N to field" operation so concurrent
//! donations to the same aggregate never lose updates.

use async_trait::async_trait;

use crate::domain::foundation::{CampaignId, DomainError, DonorId, FundId, Money, UserId};

/// Campaign state returned by a campaign increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignTotals {
    pub campaign_id: CampaignId,
    pub owner_id: UserId,
    pub title: String,
    /// Running total in minor units after the increment.
    pub current_amount: i64,
    pub donors_count: i64,
}

#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Add `amount` to the donor's lifetime total, creating the profile row
    /// if needed.
    async fn increment_donor_total(&self, donor_id: &DonorId, amount: &Money)
        -> Result<(), DomainError>;

    /// Add `amount` to the campaign's current amount and bump its donor count.
    ///
    /// # Errors
    ///
    /// - `CampaignNotFound` if the campaign does not exist
    /// - `DatabaseError` on persistence failure
    async fn increment_campaign_amount(
        &self,
        campaign_id: &CampaignId,
        amount: &Money,
    ) -> Result<CampaignTotals, DomainError>;

    /// Add `amount` to the fund's total raised.
    ///
    /// # Errors
    ///
    /// - `FundNotFound` if the fund does not exist
    /// - `DatabaseError` on persistence failure
    async fn increment_fund_total(&self, fund_id: &FundId, amount: &Money)
        -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn AggregateStore) {}
}
