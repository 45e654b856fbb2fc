//! Payment webhook reconciliation handlers.
//!
//! `HandlePaymentWebhookHandler` orchestrates one callback. The remaining
//! types are its stages and are usable on their own.

mod aggregate_fanout;
mod billing_advancer;
mod handle_payment_webhook;
mod notification_dispatcher;
mod provider_registry;
mod transition_engine;

pub use aggregate_fanout::{AggregateFanout, FanoutReport, StepOutcome};
pub use billing_advancer::{BillingAdvancer, BillingOutcome};
pub use handle_payment_webhook::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, WebhookOutcome,
};
pub use notification_dispatcher::NotificationDispatcher;
pub use provider_registry::{ProviderEntry, ProviderRegistry};
pub use transition_engine::{TransitionEngine, TransitionResult};
