//! HandlePaymentWebhookHandler - Command handler for payment provider callbacks.
//!
//! Pipeline: authenticate → normalize → transition → fan-out → billing →
//! audit. Only authentication and normalization failures reach the
//! provider as errors. Anything failing after that is logged, audited and
//! acknowledged, because redelivery would not fix it and could double-apply
//! the steps that already succeeded.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::{
    AggregateFanout, BillingAdvancer, BillingOutcome, NotificationDispatcher, ProviderRegistry,
    TransitionEngine, TransitionResult,
};
use crate::domain::donation::DonationType;
use crate::domain::foundation::DomainError;
use crate::domain::payment::{PaymentEvent, PaymentProvider, PaymentStatus, WebhookError};
use crate::ports::{
    payload_from_body, AggregateStore, DonationRepository, Notification, SubscriptionRepository,
    WebhookAuditLog, WebhookAuditRecord,
};

/// Command to handle one provider callback.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    pub provider: PaymentProvider,
    /// Raw request body, exactly as signed.
    pub payload: Vec<u8>,
    /// Signature header value, if the request carried one.
    pub signature: Option<String>,
}

/// Result of an accepted callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Event type we do not act on.
    Ignored { event_type: String },
    Processed {
        transition: Option<TransitionResult>,
        billing: Option<BillingOutcome>,
    },
    /// Accepted, but a downstream write failed. Needs manual reconciliation.
    ProcessingFailed { reason: String },
}

impl WebhookOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            WebhookOutcome::Ignored { .. } => "ignored",
            WebhookOutcome::Processed {
                transition: Some(transition),
                ..
            } => transition.label(),
            WebhookOutcome::Processed {
                transition: None,
                billing: Some(billing),
            } => billing.label(),
            WebhookOutcome::Processed { .. } => "not_applicable",
            WebhookOutcome::ProcessingFailed { .. } => "processing_failed",
        }
    }
}

pub struct HandlePaymentWebhookHandler {
    registry: ProviderRegistry,
    engine: TransitionEngine,
    fanout: Arc<AggregateFanout>,
    billing: BillingAdvancer,
    notifications: NotificationDispatcher,
    audit_log: Arc<dyn WebhookAuditLog>,
}

impl HandlePaymentWebhookHandler {
    pub fn new(
        registry: ProviderRegistry,
        donations: Arc<dyn DonationRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        aggregates: Arc<dyn AggregateStore>,
        audit_log: Arc<dyn WebhookAuditLog>,
        notifications: NotificationDispatcher,
    ) -> Self {
        let fanout = Arc::new(AggregateFanout::new(aggregates, notifications.clone()));
        Self {
            registry,
            engine: TransitionEngine::new(donations.clone()),
            billing: BillingAdvancer::new(
                subscriptions,
                donations,
                fanout.clone(),
                notifications.clone(),
            ),
            fanout,
            notifications,
            audit_log,
        }
    }

    /// Header names that may carry `provider`'s signature.
    pub fn signature_headers(&self, provider: PaymentProvider) -> &'static [&'static str] {
        self.registry
            .get(provider)
            .map(|entry| entry.verifier.signature_headers())
            .unwrap_or(&[])
    }

    /// Processes one callback end to end.
    ///
    /// # Errors
    ///
    /// Same as [`accept`](Self::accept).
    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<WebhookOutcome, WebhookError> {
        let event = self.accept(&cmd).await?;
        Ok(self.process_accepted(event, &cmd.payload).await)
    }

    /// Authenticates and normalizes a callback. Rejections are audited.
    ///
    /// # Errors
    ///
    /// - `Configuration` - provider not registered or its mandatory secret missing
    /// - `Authentication` - signature missing or wrong
    /// - `Validation` / `MissingField` - body cannot be normalized
    pub async fn accept(
        &self,
        cmd: &HandlePaymentWebhookCommand,
    ) -> Result<PaymentEvent, WebhookError> {
        match self.verify_and_normalize(cmd) {
            Ok(event) => Ok(event),
            Err(e) => {
                warn!(provider = %cmd.provider, error = %e, "Webhook rejected");
                self.audit(WebhookAuditRecord::rejected(
                    cmd.provider,
                    e.to_string(),
                    payload_from_body(&cmd.payload),
                ))
                .await;
                Err(e)
            }
        }
    }

    /// Applies an accepted event and audits the outcome.
    ///
    /// Never fails: storage errors become `ProcessingFailed`.
    pub async fn process_accepted(&self, event: PaymentEvent, payload: &[u8]) -> WebhookOutcome {
        let outcome = if event.status == PaymentStatus::Unknown {
            info!(
                provider = %event.provider,
                event_type = %event.event_type,
                transaction_id = %event.transaction_id,
                "Ignoring webhook event type"
            );
            WebhookOutcome::Ignored {
                event_type: event.event_type.clone(),
            }
        } else {
            match self.process(&event).await {
                Ok((transition, billing)) => WebhookOutcome::Processed { transition, billing },
                Err(e) => {
                    error!(
                        provider = %event.provider,
                        transaction_id = %event.transaction_id,
                        correlation_key = ?event.correlation_key,
                        recurring_id = ?event.recurring_id,
                        error = %e,
                        "Webhook processing failed, acknowledging for manual reconciliation"
                    );
                    WebhookOutcome::ProcessingFailed {
                        reason: e.to_string(),
                    }
                }
            }
        };

        let payload = payload_from_body(payload);
        let record = match &outcome {
            WebhookOutcome::ProcessingFailed { reason } => WebhookAuditRecord::failed(
                event.provider,
                &event.transaction_id,
                &event.event_type,
                reason,
                payload,
            ),
            _ => WebhookAuditRecord::processed(
                event.provider,
                &event.transaction_id,
                &event.event_type,
                outcome.label(),
                payload,
            ),
        };
        self.audit(record).await;

        outcome
    }

    fn verify_and_normalize(
        &self,
        cmd: &HandlePaymentWebhookCommand,
    ) -> Result<PaymentEvent, WebhookError> {
        let entry = self.registry.get(cmd.provider).ok_or_else(|| {
            WebhookError::Configuration(format!("{} is not registered", cmd.provider))
        })?;

        entry
            .verifier
            .authenticate(&cmd.payload, cmd.signature.as_deref())?;
        entry.normalizer.normalize(&cmd.payload)
    }

    async fn process(
        &self,
        event: &PaymentEvent,
    ) -> Result<(Option<TransitionResult>, Option<BillingOutcome>), DomainError> {
        let transition = match event.correlation_key {
            Some(_) => Some(self.engine.apply(event).await?),
            None => None,
        };

        if let Some(TransitionResult::Completed(donation)) = &transition {
            self.fanout.apply_completed(donation).await;
            if donation.donation_type == DonationType::OneTime {
                self.notifications.dispatch(Notification::DonationConfirmed {
                    donor_id: donation.donor_id,
                    donation_id: donation.id,
                    amount: donation.amount.clone(),
                });
            }
        }

        let billing = match event.recurring_id {
            Some(_) => Some(self.billing.advance(event).await?),
            None => None,
        };

        Ok((transition, billing))
    }

    async fn audit(&self, record: WebhookAuditRecord) {
        if let Err(e) = self.audit_log.record(record).await {
            warn!(error = %e, "Failed to write webhook audit record");
        }
    }
}
