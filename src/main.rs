//! Donation Reconciler service - HTTP entry point for payment webhooks.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use donation_reconciler::adapters::http::{service_router, WebhookAppState};
use donation_reconciler::adapters::memory::{
    InMemoryAggregateStore, InMemoryDonationRepository, InMemoryRecipientDirectory,
    InMemorySubscriptionRepository, InMemoryWebhookAuditLog,
};
use donation_reconciler::adapters::notifications::{LogChannel, ResendConfig, ResendEmailChannel};
use donation_reconciler::adapters::postgres::{
    self, PostgresAggregateStore, PostgresDonationRepository, PostgresRecipientDirectory,
    PostgresSubscriptionRepository, PostgresWebhookAuditLog,
};
use donation_reconciler::application::handlers::{
    HandlePaymentWebhookHandler, NotificationDispatcher, ProviderRegistry,
};
use donation_reconciler::config::{AppConfig, DatabaseConfig, EmailConfig};
use donation_reconciler::ports::{
    AggregateStore, DonationRepository, NotificationChannel, RecipientDirectory,
    SubscriptionRepository, WebhookAuditLog,
};

const AUDIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60 * 60);

struct Stores {
    donations: Arc<dyn DonationRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    aggregates: Arc<dyn AggregateStore>,
    audit_log: Arc<dyn WebhookAuditLog>,
    recipients: Arc<dyn RecipientDirectory>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);

    config.validate()?;
    tracing::info!(
        environment = ?config.server.environment,
        database = config.database.is_some(),
        email = config.email.is_enabled(),
        "Configuration loaded"
    );

    for provider in config.payment.unverified_providers() {
        tracing::warn!(
            provider = %provider,
            "Webhook secret not configured, signature verification is disabled"
        );
    }
    if config.payment.yookassa_secret().is_none() {
        tracing::warn!("YooKassa webhook secret not configured, callbacks will be answered with 503");
    }

    let stores = match &config.database {
        Some(database) => postgres_stores(database).await?,
        None => {
            tracing::warn!("No database configured, using in-memory stores");
            memory_stores()
        }
    };

    let dispatcher = NotificationDispatcher::new(channels(&config.email)?, stores.recipients);
    let handler = HandlePaymentWebhookHandler::new(
        ProviderRegistry::standard(
            config.payment.cloudpayments_secret(),
            config.payment.yookassa_secret(),
        ),
        stores.donations,
        stores.subscriptions,
        stores.aggregates,
        stores.audit_log.clone(),
        dispatcher,
    );

    if let Some(retention) = config.payment.audit_retention() {
        spawn_audit_pruning(stores.audit_log, retention);
    }

    let app = service_router(WebhookAppState::new(handler), &config.server);

    let addr = config.server.socket_addr()?;
    tracing::info!(listen_addr = %addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

async fn postgres_stores(database: &DatabaseConfig) -> Result<Stores, Box<dyn std::error::Error>> {
    let pool = postgres::connect(database).await?;

    Ok(Stores {
        donations: Arc::new(PostgresDonationRepository::new(pool.clone())),
        subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        aggregates: Arc::new(PostgresAggregateStore::new(pool.clone())),
        audit_log: Arc::new(PostgresWebhookAuditLog::new(pool.clone())),
        recipients: Arc::new(PostgresRecipientDirectory::new(pool)),
    })
}

fn memory_stores() -> Stores {
    Stores {
        donations: Arc::new(InMemoryDonationRepository::new()),
        subscriptions: Arc::new(InMemorySubscriptionRepository::new()),
        aggregates: Arc::new(InMemoryAggregateStore::new()),
        audit_log: Arc::new(InMemoryWebhookAuditLog::new()),
        recipients: Arc::new(InMemoryRecipientDirectory::new()),
    }
}

fn channels(
    email: &EmailConfig,
) -> Result<Vec<Arc<dyn NotificationChannel>>, Box<dyn std::error::Error>> {
    let mut channels: Vec<Arc<dyn NotificationChannel>> = vec![Arc::new(LogChannel)];
    if let Some(api_key) = &email.resend_api_key {
        channels.push(Arc::new(ResendEmailChannel::new(ResendConfig {
            api_key: api_key.clone(),
            from: email.from_header(),
            api_base_url: email.api_base_url.clone(),
            timeout: email.timeout(),
        })?));
    }
    Ok(channels)
}

fn spawn_audit_pruning(audit_log: Arc<dyn WebhookAuditLog>, retention: chrono::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(AUDIT_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            match audit_log.delete_before(chrono::Utc::now() - retention).await {
                Ok(0) => {}
                Ok(deleted) => tracing::info!(deleted, "Pruned webhook audit records"),
                Err(e) => tracing::warn!(error = %e, "Failed to prune webhook audit records"),
            }
        }
    });
}
