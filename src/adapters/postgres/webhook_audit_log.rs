//! PostgreSQL implementation of WebhookAuditLog over `webhook_events`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::DomainError;
use crate::ports::{WebhookAuditLog, WebhookAuditRecord};

pub struct PostgresWebhookAuditLog {
    pool: PgPool,
}

impl PostgresWebhookAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookAuditLog for PostgresWebhookAuditLog {
    async fn record(&self, record: WebhookAuditRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO webhook_events (
                provider, transaction_id, event_type, outcome, error_message, payload, received_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.provider.as_str())
        .bind(&record.transaction_id)
        .bind(&record.event_type)
        .bind(&record.outcome)
        .bind(&record.error_message)
        .bind(&record.payload)
        .bind(record.received_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to record webhook event", e))?;

        Ok(())
    }

    async fn delete_before(&self, timestamp: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM webhook_events WHERE received_at < $1")
            .bind(timestamp)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to delete webhook events", e))?;

        Ok(result.rows_affected())
    }
}
