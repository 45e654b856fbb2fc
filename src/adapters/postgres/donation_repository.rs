//! PostgreSQL implementation of DonationRepository.
//!
//! Status changes are a single `UPDATE … WHERE id = $1 AND status = $2`.
//! Concurrent deliveries of the same callback race on that predicate and
//! exactly one of them gets a row back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{money_from_columns, parse_column};
use crate::domain::donation::{Donation, DonationStatus, StatusChange};
use crate::domain::foundation::{
    CampaignId, DomainError, DonationId, DonorId, FundId, SubscriptionId, Timestamp,
};
use crate::domain::payment::PaymentProvider;
use crate::ports::{DonationRepository, SaveResult};

const DONATION_COLUMNS: &str = "id, donor_id, campaign_id, fund_id, subscription_id, amount, \
     currency, donation_type, status, provider, provider_transaction_id, is_anonymous, \
     created_at, updated_at, completed_at";

pub struct PostgresDonationRepository {
    pool: PgPool,
}

impl PostgresDonationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DonationRow {
    id: Uuid,
    donor_id: Uuid,
    campaign_id: Option<Uuid>,
    fund_id: Option<Uuid>,
    subscription_id: Option<Uuid>,
    amount: i64,
    currency: String,
    donation_type: String,
    status: String,
    provider: String,
    provider_transaction_id: Option<String>,
    is_anonymous: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<DonationRow> for Donation {
    type Error = DomainError;

    fn try_from(row: DonationRow) -> Result<Self, Self::Error> {
        Ok(Donation {
            id: DonationId::from_uuid(row.id),
            donor_id: DonorId::from_uuid(row.donor_id),
            campaign_id: row.campaign_id.map(CampaignId::from_uuid),
            fund_id: row.fund_id.map(FundId::from_uuid),
            subscription_id: row.subscription_id.map(SubscriptionId::from_uuid),
            amount: money_from_columns(row.amount, &row.currency)?,
            donation_type: parse_column("donation_type", &row.donation_type)?,
            status: parse_column("status", &row.status)?,
            provider: parse_column("provider", &row.provider)?,
            provider_transaction_id: row.provider_transaction_id,
            is_anonymous: row.is_anonymous,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            completed_at: row.completed_at.map(Timestamp::from_datetime),
        })
    }
}

#[async_trait]
impl DonationRepository for PostgresDonationRepository {
    async fn find_by_id(&self, id: &DonationId) -> Result<Option<Donation>, DomainError> {
        let row: Option<DonationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM donations WHERE id = $1",
            DONATION_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch donation", e))?;

        row.map(Donation::try_from).transpose()
    }

    async fn find_by_provider_transaction(
        &self,
        provider: PaymentProvider,
        provider_transaction_id: &str,
    ) -> Result<Option<Donation>, DomainError> {
        let row: Option<DonationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM donations WHERE provider = $1 AND provider_transaction_id = $2",
            DONATION_COLUMNS
        ))
        .bind(provider.as_str())
        .bind(provider_transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch donation by transaction", e))?;

        row.map(Donation::try_from).transpose()
    }

    async fn compare_and_set_status(
        &self,
        id: &DonationId,
        change: &StatusChange,
    ) -> Result<Option<Donation>, DomainError> {
        let completed_at = (change.target == DonationStatus::Completed)
            .then(|| *change.at.as_datetime());

        let row: Option<DonationRow> = sqlx::query_as(&format!(
            r#"
            UPDATE donations SET
                status = $3,
                provider_transaction_id = COALESCE($4, provider_transaction_id),
                completed_at = COALESCE($5, completed_at),
                updated_at = $6
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            DONATION_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(change.expected.as_str())
        .bind(change.target.as_str())
        .bind(&change.provider_transaction_id)
        .bind(completed_at)
        .bind(change.at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update donation status", e))?;

        row.map(Donation::try_from).transpose()
    }

    async fn insert_if_absent(&self, donation: &Donation) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO donations (
                id, donor_id, campaign_id, fund_id, subscription_id, amount, currency,
                donation_type, status, provider, provider_transaction_id, is_anonymous,
                created_at, updated_at, completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(donation.id.as_uuid())
        .bind(donation.donor_id.as_uuid())
        .bind(donation.campaign_id.map(|id| *id.as_uuid()))
        .bind(donation.fund_id.map(|id| *id.as_uuid()))
        .bind(donation.subscription_id.map(|id| *id.as_uuid()))
        .bind(donation.amount.minor_units())
        .bind(donation.amount.currency().as_str())
        .bind(donation.donation_type.as_str())
        .bind(donation.status.as_str())
        .bind(donation.provider.as_str())
        .bind(&donation.provider_transaction_id)
        .bind(donation.is_anonymous)
        .bind(donation.created_at.as_datetime())
        .bind(donation.updated_at.as_datetime())
        .bind(donation.completed_at.map(|at| *at.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to insert donation", e))?;

        if result.rows_affected() == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }
}
