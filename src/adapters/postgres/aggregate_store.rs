//! PostgreSQL implementation of AggregateStore.
//!
//! Every increment is one `UPDATE … SET x = x + $n` statement, so concurrent
//! completions serialize on the row lock instead of racing a read-modify-write.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    CampaignId, DomainError, DonorId, ErrorCode, FundId, Money, UserId,
};
use crate::ports::{AggregateStore, CampaignTotals};

pub struct PostgresAggregateStore {
    pool: PgPool,
}

impl PostgresAggregateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CampaignTotalsRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    current_amount: i64,
    donors_count: i64,
}

impl From<CampaignTotalsRow> for CampaignTotals {
    fn from(row: CampaignTotalsRow) -> Self {
        Self {
            campaign_id: CampaignId::from_uuid(row.id),
            owner_id: UserId::from_uuid(row.owner_id),
            title: row.title,
            current_amount: row.current_amount,
            donors_count: row.donors_count,
        }
    }
}

#[async_trait]
impl AggregateStore for PostgresAggregateStore {
    async fn increment_donor_total(
        &self,
        donor_id: &DonorId,
        amount: &Money,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO donor_profiles (donor_id, total_donated, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (donor_id) DO UPDATE SET
                total_donated = donor_profiles.total_donated + EXCLUDED.total_donated,
                updated_at = NOW()
            "#,
        )
        .bind(donor_id.as_uuid())
        .bind(amount.minor_units())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to increment donor total", e))?;

        Ok(())
    }

    async fn increment_campaign_amount(
        &self,
        campaign_id: &CampaignId,
        amount: &Money,
    ) -> Result<CampaignTotals, DomainError> {
        let row: Option<CampaignTotalsRow> = sqlx::query_as(
            r#"
            UPDATE campaigns SET
                current_amount = current_amount + $2,
                donors_count = donors_count + 1,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, owner_id, title, current_amount, donors_count
            "#,
        )
        .bind(campaign_id.as_uuid())
        .bind(amount.minor_units())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to increment campaign amount", e))?;

        row.map(CampaignTotals::from).ok_or_else(|| {
            DomainError::new(ErrorCode::CampaignNotFound, "Campaign not found")
                .with_detail("campaign_id", campaign_id.to_string())
        })
    }

    async fn increment_fund_total(
        &self,
        fund_id: &FundId,
        amount: &Money,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE funds SET
                total_raised = total_raised + $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(fund_id.as_uuid())
        .bind(amount.minor_units())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to increment fund total", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::FundNotFound, "Fund not found")
                .with_detail("fund_id", fund_id.to_string()));
        }
        Ok(())
    }
}
