//! PostgreSQL adapters - Database implementations for the storage ports.
//!
//! - `PostgresDonationRepository` - conditional status writes, insert-if-absent
//! - `PostgresAggregateStore` - single-statement increments on running totals
//! - `PostgresSubscriptionRepository` - guarded billing updates
//! - `PostgresWebhookAuditLog` - `webhook_events` rows
//! - `PostgresRecipientDirectory` - contact details from `users`

mod aggregate_store;
mod donation_repository;
mod recipient_directory;
mod subscription_repository;
mod webhook_audit_log;

pub use aggregate_store::PostgresAggregateStore;
pub use donation_repository::PostgresDonationRepository;
pub use recipient_directory::PostgresRecipientDirectory;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use webhook_audit_log::PostgresWebhookAuditLog;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::str::FromStr;

use crate::config::DatabaseConfig;
use crate::domain::foundation::{Currency, DomainError, ErrorCode, Money, ValidationError};

/// Opens the connection pool and, when enabled, applies pending migrations.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .connect(config.url())
        .await?;

    if config.run_migrations {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    Ok(pool)
}

/// Parses a text column into a domain enum.
fn parse_column<T>(column: &str, value: &str) -> Result<T, DomainError>
where
    T: FromStr<Err = ValidationError>,
{
    value.parse().map_err(|e: ValidationError| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value '{}': {}", column, value, e),
        )
    })
}

fn money_from_columns(amount: i64, currency: &str) -> Result<Money, DomainError> {
    let currency = Currency::parse(currency.trim())
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid currency: {}", e)))?;
    Money::new(amount, currency)
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid amount: {}", e)))
}
