use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId};
use crate::domain::payment::PaymentProvider;
use crate::domain::subscription::{ChargeFailure, ChargeSuccess, Subscription};
use crate::ports::SubscriptionRepository;

#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: Mutex<HashMap<SubscriptionId, Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, subscription: Subscription) {
        self.subscriptions
            .lock()
            .await
            .insert(subscription.id, subscription);
    }

    pub async fn get(&self, id: &SubscriptionId) -> Option<Subscription> {
        self.subscriptions.lock().await.get(id).cloned()
    }
}

fn not_found(id: &SubscriptionId) -> DomainError {
    DomainError::new(ErrorCode::SubscriptionNotFound, "Subscription not found")
        .with_detail("subscription_id", id.to_string())
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn find_active_by_recurring_id(
        &self,
        provider: PaymentProvider,
        recurring_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .lock()
            .await
            .values()
            .find(|s| {
                s.provider == provider
                    && s.provider_recurring_id == recurring_id
                    && s.status.is_billable()
            })
            .cloned())
    }

    async fn record_charge_success(
        &self,
        id: &SubscriptionId,
        charge: &ChargeSuccess,
    ) -> Result<bool, DomainError> {
        let mut subscriptions = self.subscriptions.lock().await;
        let subscription = subscriptions.get_mut(id).ok_or_else(|| not_found(id))?;
        if !subscription.status.is_billable() {
            return Ok(false);
        }
        subscription.record_charge(charge)
    }

    async fn record_charge_failure(
        &self,
        id: &SubscriptionId,
        failure: &ChargeFailure,
    ) -> Result<(), DomainError> {
        let mut subscriptions = self.subscriptions.lock().await;
        let subscription = subscriptions.get_mut(id).ok_or_else(|| not_found(id))?;
        subscription.record_failure(failure);
        Ok(())
    }
}
