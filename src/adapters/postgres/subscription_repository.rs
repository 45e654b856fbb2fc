//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{money_from_columns, parse_column};
use crate::domain::foundation::{DomainError, DonorId, ErrorCode, SubscriptionId, Timestamp};
use crate::domain::payment::PaymentProvider;
use crate::domain::subscription::{ChargeFailure, ChargeSuccess, Subscription};
use crate::ports::SubscriptionRepository;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    donor_id: Uuid,
    tier: String,
    amount: i64,
    currency: String,
    frequency: String,
    status: String,
    provider: String,
    provider_recurring_id: String,
    next_billing_date: DateTime<Utc>,
    last_payment_date: Option<DateTime<Utc>>,
    last_payment_transaction_id: Option<String>,
    last_payment_failed_at: Option<DateTime<Utc>>,
    last_payment_failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            donor_id: DonorId::from_uuid(row.donor_id),
            tier: row.tier,
            amount: money_from_columns(row.amount, &row.currency)?,
            frequency: parse_column("frequency", &row.frequency)?,
            status: parse_column("status", &row.status)?,
            provider: parse_column("provider", &row.provider)?,
            provider_recurring_id: row.provider_recurring_id,
            next_billing_date: Timestamp::from_datetime(row.next_billing_date),
            last_payment_date: row.last_payment_date.map(Timestamp::from_datetime),
            last_payment_transaction_id: row.last_payment_transaction_id,
            last_payment_failed_at: row.last_payment_failed_at.map(Timestamp::from_datetime),
            last_payment_failure_reason: row.last_payment_failure_reason,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_active_by_recurring_id(
        &self,
        provider: PaymentProvider,
        recurring_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, donor_id, tier, amount, currency, frequency, status, provider,
                   provider_recurring_id, next_billing_date, last_payment_date,
                   last_payment_transaction_id, last_payment_failed_at,
                   last_payment_failure_reason, created_at, updated_at
            FROM subscriptions
            WHERE provider = $1 AND provider_recurring_id = $2 AND status = 'active'
            "#,
        )
        .bind(provider.as_str())
        .bind(recurring_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn record_charge_success(
        &self,
        id: &SubscriptionId,
        charge: &ChargeSuccess,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                next_billing_date = $2,
                last_payment_date = $3,
                last_payment_transaction_id = $4,
                updated_at = $3
            WHERE id = $1
              AND status = 'active'
              AND last_payment_transaction_id IS DISTINCT FROM $4
              AND (last_payment_date IS NULL OR last_payment_date <= $3)
            "#,
        )
        .bind(id.as_uuid())
        .bind(charge.next_billing_date.as_datetime())
        .bind(charge.charged_at.as_datetime())
        .bind(&charge.transaction_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to record subscription charge", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_charge_failure(
        &self,
        id: &SubscriptionId,
        failure: &ChargeFailure,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                last_payment_failed_at = $2,
                last_payment_failure_reason = $3,
                updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(failure.failed_at.as_datetime())
        .bind(&failure.reason)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to record subscription failure", e))?;

        if result.rows_affected() == 0 {
            return Err(
                DomainError::new(ErrorCode::SubscriptionNotFound, "Subscription not found")
                    .with_detail("subscription_id", id.to_string()),
            );
        }
        Ok(())
    }
}
