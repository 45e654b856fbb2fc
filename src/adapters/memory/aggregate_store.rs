use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::foundation::{
    CampaignId, DomainError, DonorId, ErrorCode, FundId, Money, UserId,
};
use crate::ports::{AggregateStore, CampaignTotals};

#[derive(Debug, Clone)]
struct CampaignRow {
    owner_id: UserId,
    title: String,
    current_amount: i64,
    donors_count: i64,
}

#[derive(Default)]
struct Totals {
    campaigns: HashMap<CampaignId, CampaignRow>,
    funds: HashMap<FundId, i64>,
    donors: HashMap<DonorId, i64>,
}

/// In-memory campaign, fund and donor totals.
#[derive(Default)]
pub struct InMemoryAggregateStore {
    totals: Mutex<Totals>,
}

impl InMemoryAggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_campaign(&self, campaign_id: CampaignId, owner_id: UserId, title: &str) {
        self.totals.lock().await.campaigns.insert(
            campaign_id,
            CampaignRow {
                owner_id,
                title: title.to_string(),
                current_amount: 0,
                donors_count: 0,
            },
        );
    }

    pub async fn add_fund(&self, fund_id: FundId) {
        self.totals.lock().await.funds.insert(fund_id, 0);
    }

    pub async fn campaign_amount(&self, campaign_id: &CampaignId) -> Option<i64> {
        self.totals
            .lock()
            .await
            .campaigns
            .get(campaign_id)
            .map(|c| c.current_amount)
    }

    pub async fn campaign_donors(&self, campaign_id: &CampaignId) -> Option<i64> {
        self.totals
            .lock()
            .await
            .campaigns
            .get(campaign_id)
            .map(|c| c.donors_count)
    }

    pub async fn fund_total(&self, fund_id: &FundId) -> Option<i64> {
        self.totals.lock().await.funds.get(fund_id).copied()
    }

    /// Lifetime total, zero for donors without a profile row.
    pub async fn donor_total(&self, donor_id: &DonorId) -> i64 {
        self.totals
            .lock()
            .await
            .donors
            .get(donor_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl AggregateStore for InMemoryAggregateStore {
    async fn increment_donor_total(
        &self,
        donor_id: &DonorId,
        amount: &Money,
    ) -> Result<(), DomainError> {
        *self.totals.lock().await.donors.entry(*donor_id).or_insert(0) += amount.minor_units();
        Ok(())
    }

    async fn increment_campaign_amount(
        &self,
        campaign_id: &CampaignId,
        amount: &Money,
    ) -> Result<CampaignTotals, DomainError> {
        let mut totals = self.totals.lock().await;
        let campaign = totals.campaigns.get_mut(campaign_id).ok_or_else(|| {
            DomainError::new(ErrorCode::CampaignNotFound, "Campaign not found")
                .with_detail("campaign_id", campaign_id.to_string())
        })?;
        campaign.current_amount += amount.minor_units();
        campaign.donors_count += 1;

        Ok(CampaignTotals {
            campaign_id: *campaign_id,
            owner_id: campaign.owner_id,
            title: campaign.title.clone(),
            current_amount: campaign.current_amount,
            donors_count: campaign.donors_count,
        })
    }

    async fn increment_fund_total(
        &self,
        fund_id: &FundId,
        amount: &Money,
    ) -> Result<(), DomainError> {
        let mut totals = self.totals.lock().await;
        let total = totals.funds.get_mut(fund_id).ok_or_else(|| {
            DomainError::new(ErrorCode::FundNotFound, "Fund not found")
                .with_detail("fund_id", fund_id.to_string())
        })?;
        *total += amount.minor_units();
        Ok(())
    }
}
