//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod payment;

pub use payment::{
    AggregateFanout, BillingAdvancer, BillingOutcome, FanoutReport, HandlePaymentWebhookCommand,
    HandlePaymentWebhookHandler, NotificationDispatcher, ProviderEntry, ProviderRegistry,
    StepOutcome, TransitionEngine, TransitionResult, WebhookOutcome,
};
