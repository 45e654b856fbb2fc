//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the reconciliation core and the outside world. Adapters implement these
//! ports.
//!
//! ## Storage Ports
//!
//! - `DonationRepository` - conditional status writes, insert-if-absent
//! - `AggregateStore` - atomic increments on campaign, fund and donor totals
//! - `SubscriptionRepository` - recurring charge bookkeeping
//! - `WebhookAuditLog` - best-effort record of received callbacks
//!
//! ## Notification Ports
//!
//! - `NotificationChannel` - one outbound delivery channel
//! - `RecipientDirectory` - user id to contact details

mod aggregate_store;
mod donation_repository;
mod notification_channel;
mod subscription_repository;
mod webhook_audit_log;

pub use aggregate_store::{AggregateStore, CampaignTotals};
pub use donation_repository::{DonationRepository, SaveResult};
pub use notification_channel::{
    Notification, NotificationChannel, NotificationError, Recipient, RecipientDirectory,
};
pub use subscription_repository::SubscriptionRepository;
pub use webhook_audit_log::{payload_from_body, WebhookAuditLog, WebhookAuditRecord};
