//! SubscriptionRepository port - recurring charge bookkeeping.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SubscriptionId};
use crate::domain::payment::PaymentProvider;
use crate::domain::subscription::{ChargeFailure, ChargeSuccess, Subscription};

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find the active subscription holding a provider recurring id.
    ///
    /// Paused, cancelled and expired subscriptions are never returned.
    async fn find_active_by_recurring_id(
        &self,
        provider: PaymentProvider,
        recurring_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Record a successful charge as one conditional write.
    ///
    /// The write applies only while the subscription is active, its
    /// `last_payment_transaction_id` differs from `charge.transaction_id` and
    /// its `last_payment_date` is unset or not later than `charge.charged_at`.
    /// Returns `true` when the row was advanced, `false` when this charge was
    /// already recorded, is older than the last one, or the subscription
    /// stopped being active.
    async fn record_charge_success(
        &self,
        id: &SubscriptionId,
        charge: &ChargeSuccess,
    ) -> Result<bool, DomainError>;

    /// Stamp a declined charge. Never touches `next_billing_date`.
    async fn record_charge_failure(
        &self,
        id: &SubscriptionId,
        failure: &ChargeFailure,
    ) -> Result<(), DomainError>;
}
