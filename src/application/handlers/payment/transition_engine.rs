//! TransitionEngine - applies a payment outcome to its donation exactly once.
//!
//! The engine issues one compare-and-set write per callback. When it affects
//! no row, the callback is either a replay of an outcome already applied or
//! refers to a donation we do not have; both are acknowledged. A follow-up
//! read classifies which, for logging only.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::donation::{Donation, DonationStatus, StatusChange};
use crate::domain::foundation::{DomainError, DonationId};
use crate::domain::payment::{PaymentEvent, PaymentStatus};
use crate::ports::DonationRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// `pending → completed` was applied by this callback. Fan-out follows.
    Completed(Donation),
    /// `pending → failed` was applied by this callback.
    Failed(Donation),
    /// `completed → refunded` was applied by this callback.
    Refunded(Donation),
    /// The donation had already left the expected status.
    Duplicate {
        donation_id: DonationId,
        current: DonationStatus,
    },
    /// No donation matches the correlation key.
    UnknownDonation { correlation_key: String },
    /// The event does not settle a donation (unknown status or no key).
    NotApplicable,
}

impl TransitionResult {
    pub fn label(&self) -> &'static str {
        match self {
            TransitionResult::Completed(_) => "completed",
            TransitionResult::Failed(_) => "failed",
            TransitionResult::Refunded(_) => "refunded",
            TransitionResult::Duplicate { .. } => "duplicate",
            TransitionResult::UnknownDonation { .. } => "unknown_donation",
            TransitionResult::NotApplicable => "not_applicable",
        }
    }
}

pub struct TransitionEngine {
    donations: Arc<dyn DonationRepository>,
}

impl TransitionEngine {
    pub fn new(donations: Arc<dyn DonationRepository>) -> Self {
        Self { donations }
    }

    /// Applies `event` to the donation named by its correlation key.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the conditional write or the classifying read
    /// fails. Nothing has been changed in that case.
    pub async fn apply(&self, event: &PaymentEvent) -> Result<TransitionResult, DomainError> {
        let Some(target) = event.status.target_donation_status() else {
            return Ok(TransitionResult::NotApplicable);
        };
        let Some(key) = event.correlation_key.as_deref() else {
            return Ok(TransitionResult::NotApplicable);
        };

        let donation_id = match key.parse::<DonationId>() {
            Ok(id) => id,
            Err(_) => return Ok(self.unknown(event, key)),
        };

        // A refund carries its own operation id; keep the payment's id on the row.
        let transaction_id = match event.status {
            PaymentStatus::Refunded => None,
            _ => Some(event.transaction_id.clone()),
        };
        let Some(change) = StatusChange::to(target, transaction_id) else {
            return Ok(TransitionResult::NotApplicable);
        };

        match self
            .donations
            .compare_and_set_status(&donation_id, &change)
            .await?
        {
            Some(donation) => Ok(self.applied(event, donation)),
            None => self.classify_miss(event, &donation_id, key, target).await,
        }
    }

    fn applied(&self, event: &PaymentEvent, donation: Donation) -> TransitionResult {
        if let Some(amount) = &event.amount {
            if *amount != donation.amount {
                warn!(
                    donation_id = %donation.id,
                    provider = %event.provider,
                    transaction_id = %event.transaction_id,
                    expected = %donation.amount,
                    reported = %amount,
                    "Provider amount differs from donation amount"
                );
            }
        }
        if event.provider != donation.provider {
            warn!(
                donation_id = %donation.id,
                expected = %donation.provider,
                reported = %event.provider,
                "Donation settled by a different provider than it was created for"
            );
        }

        info!(
            donation_id = %donation.id,
            provider = %event.provider,
            transaction_id = %event.transaction_id,
            status = %donation.status,
            "Donation transitioned"
        );

        match donation.status {
            DonationStatus::Completed => TransitionResult::Completed(donation),
            DonationStatus::Failed => TransitionResult::Failed(donation),
            DonationStatus::Refunded => {
                if let (Some(original), Some(paid)) = (
                    event.original_transaction_id.as_deref(),
                    donation.provider_transaction_id.as_deref(),
                ) {
                    if original != paid {
                        warn!(
                            donation_id = %donation.id,
                            refunded_payment = original,
                            recorded_payment = paid,
                            "Refund references a different payment than the donation"
                        );
                    }
                }
                // Refunds leave campaign, fund and donor totals unchanged.
                info!(
                    donation_id = %donation.id,
                    "Refund recorded on donation only, aggregates unchanged"
                );
                TransitionResult::Refunded(donation)
            }
            DonationStatus::Pending => TransitionResult::NotApplicable,
        }
    }

    async fn classify_miss(
        &self,
        event: &PaymentEvent,
        donation_id: &DonationId,
        key: &str,
        target: DonationStatus,
    ) -> Result<TransitionResult, DomainError> {
        match self.donations.find_by_id(donation_id).await? {
            Some(donation) => {
                if donation.status == target {
                    info!(
                        donation_id = %donation_id,
                        provider = %event.provider,
                        transaction_id = %event.transaction_id,
                        status = %donation.status,
                        "Duplicate webhook delivery, donation already transitioned"
                    );
                } else {
                    warn!(
                        donation_id = %donation_id,
                        provider = %event.provider,
                        transaction_id = %event.transaction_id,
                        current = %donation.status,
                        requested = %target,
                        "Webhook outcome conflicts with donation status, ignoring"
                    );
                }
                Ok(TransitionResult::Duplicate {
                    donation_id: *donation_id,
                    current: donation.status,
                })
            }
            None => Ok(self.unknown(event, key)),
        }
    }

    fn unknown(&self, event: &PaymentEvent, key: &str) -> TransitionResult {
        warn!(
            correlation_key = key,
            provider = %event.provider,
            transaction_id = %event.transaction_id,
            event_type = %event.event_type,
            "No donation matches webhook correlation key, acknowledging"
        );
        TransitionResult::UnknownDonation {
            correlation_key: key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryDonationRepository;
    use crate::domain::foundation::{Currency, DonorId, ErrorCode, Money};
    use crate::domain::payment::PaymentProvider;
    use crate::ports::SaveResult;
    use async_trait::async_trait;

    fn rub(minor: i64) -> Money {
        Money::new(minor, Currency::parse("RUB").unwrap()).unwrap()
    }

    fn event(key: &str, status: PaymentStatus) -> PaymentEvent {
        PaymentEvent {
            provider: PaymentProvider::CloudPayments,
            event_type: "Completed".into(),
            transaction_id: "1001".into(),
            original_transaction_id: None,
            correlation_key: Some(key.to_string()),
            status,
            amount: Some(rub(50000)),
            recurring_id: None,
        }
    }

    async fn setup() -> (Arc<InMemoryDonationRepository>, TransitionEngine, Donation) {
        let repo = Arc::new(InMemoryDonationRepository::new());
        let donation = Donation::pending(
            DonationId::new(),
            DonorId::new(),
            rub(50000),
            PaymentProvider::CloudPayments,
        );
        repo.insert(donation.clone()).await;
        let engine = TransitionEngine::new(repo.clone());
        (repo, engine, donation)
    }

    // ══════════════════════════════════════════════════════════════
    // Transition Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn succeeded_completes_pending_donation() {
        let (repo, engine, donation) = setup().await;

        let result = engine
            .apply(&event(&donation.id.to_string(), PaymentStatus::Succeeded))
            .await
            .unwrap();

        assert!(matches!(result, TransitionResult::Completed(_)));
        let stored = repo.get(&donation.id).await.unwrap();
        assert_eq!(stored.status, DonationStatus::Completed);
        assert_eq!(stored.provider_transaction_id.as_deref(), Some("1001"));
    }

    #[tokio::test]
    async fn declined_fails_pending_donation() {
        let (repo, engine, donation) = setup().await;

        let result = engine
            .apply(&event(
                &donation.id.to_string(),
                PaymentStatus::Declined { reason: None },
            ))
            .await
            .unwrap();

        assert!(matches!(result, TransitionResult::Failed(_)));
        assert_eq!(repo.get(&donation.id).await.unwrap().status, DonationStatus::Failed);
    }

    #[tokio::test]
    async fn replay_is_duplicate() {
        let (_, engine, donation) = setup().await;
        let completed = event(&donation.id.to_string(), PaymentStatus::Succeeded);

        engine.apply(&completed).await.unwrap();
        let replay = engine.apply(&completed).await.unwrap();

        assert_eq!(
            replay,
            TransitionResult::Duplicate {
                donation_id: donation.id,
                current: DonationStatus::Completed,
            }
        );
    }

    #[tokio::test]
    async fn late_decline_does_not_override_completion() {
        let (repo, engine, donation) = setup().await;
        let key = donation.id.to_string();

        engine.apply(&event(&key, PaymentStatus::Succeeded)).await.unwrap();
        let result = engine
            .apply(&event(&key, PaymentStatus::Declined { reason: None }))
            .await
            .unwrap();

        assert!(matches!(result, TransitionResult::Duplicate { .. }));
        assert_eq!(repo.get(&donation.id).await.unwrap().status, DonationStatus::Completed);
    }

    #[tokio::test]
    async fn refund_requires_completed_donation() {
        let (repo, engine, donation) = setup().await;
        let key = donation.id.to_string();

        let early = engine.apply(&event(&key, PaymentStatus::Refunded)).await.unwrap();
        assert!(matches!(
            early,
            TransitionResult::Duplicate {
                current: DonationStatus::Pending,
                ..
            }
        ));

        engine.apply(&event(&key, PaymentStatus::Succeeded)).await.unwrap();
        let mut refund = event(&key, PaymentStatus::Refunded);
        refund.transaction_id = "2001".into();
        let result = engine.apply(&refund).await.unwrap();

        assert!(matches!(result, TransitionResult::Refunded(_)));
        let stored = repo.get(&donation.id).await.unwrap();
        assert_eq!(stored.status, DonationStatus::Refunded);
        assert_eq!(stored.provider_transaction_id.as_deref(), Some("1001"));
    }

    #[tokio::test]
    async fn amount_mismatch_still_transitions() {
        let (_, engine, donation) = setup().await;
        let mut completed = event(&donation.id.to_string(), PaymentStatus::Succeeded);
        completed.amount = Some(rub(1));

        let result = engine.apply(&completed).await.unwrap();

        assert!(matches!(result, TransitionResult::Completed(_)));
    }

    // ══════════════════════════════════════════════════════════════
    // Unknown / Not Applicable Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_donation_is_unknown() {
        let (_, engine, _) = setup().await;
        let key = DonationId::new().to_string();

        let result = engine.apply(&event(&key, PaymentStatus::Succeeded)).await.unwrap();

        assert_eq!(result, TransitionResult::UnknownDonation { correlation_key: key });
    }

    #[tokio::test]
    async fn non_uuid_key_is_unknown() {
        let (_, engine, _) = setup().await;

        let result = engine.apply(&event("D1", PaymentStatus::Succeeded)).await.unwrap();

        assert!(matches!(result, TransitionResult::UnknownDonation { .. }));
    }

    #[tokio::test]
    async fn unknown_status_is_not_applicable() {
        let (repo, engine, donation) = setup().await;

        let result = engine
            .apply(&event(&donation.id.to_string(), PaymentStatus::Unknown))
            .await
            .unwrap();

        assert_eq!(result, TransitionResult::NotApplicable);
        assert_eq!(repo.get(&donation.id).await.unwrap().status, DonationStatus::Pending);
    }

    #[tokio::test]
    async fn concurrent_deliveries_transition_once() {
        let (_, engine, donation) = setup().await;
        let engine = Arc::new(engine);
        let completed = event(&donation.id.to_string(), PaymentStatus::Succeeded);

        let (a, b) = tokio::join!(engine.apply(&completed), engine.apply(&completed));
        let results = [a.unwrap(), b.unwrap()];

        let winners = results
            .iter()
            .filter(|r| matches!(r, TransitionResult::Completed(_)))
            .count();
        assert_eq!(winners, 1);
    }

    // ══════════════════════════════════════════════════════════════
    // Storage Failure Tests
    // ══════════════════════════════════════════════════════════════

    struct UnavailableRepository;

    #[async_trait]
    impl DonationRepository for UnavailableRepository {
        async fn find_by_id(&self, _id: &DonationId) -> Result<Option<Donation>, DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "connection refused"))
        }

        async fn find_by_provider_transaction(
            &self,
            _provider: PaymentProvider,
            _provider_transaction_id: &str,
        ) -> Result<Option<Donation>, DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "connection refused"))
        }

        async fn compare_and_set_status(
            &self,
            _id: &DonationId,
            _change: &StatusChange,
        ) -> Result<Option<Donation>, DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "connection refused"))
        }

        async fn insert_if_absent(&self, _donation: &Donation) -> Result<SaveResult, DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "connection refused"))
        }
    }

    #[tokio::test]
    async fn storage_failure_propagates() {
        let engine = TransitionEngine::new(Arc::new(UnavailableRepository));

        let err = engine
            .apply(&event(&DonationId::new().to_string(), PaymentStatus::Succeeded))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
