//! In-process implementations of the storage ports.
//!
//! Used by tests and by local runs without a database. Each store keeps its
//! state behind one lock so conditional writes are atomic.

mod aggregate_store;
mod donation_repository;
mod recipient_directory;
mod subscription_repository;
mod webhook_audit_log;

pub use aggregate_store::InMemoryAggregateStore;
pub use donation_repository::InMemoryDonationRepository;
pub use recipient_directory::InMemoryRecipientDirectory;
pub use subscription_repository::InMemorySubscriptionRepository;
pub use webhook_audit_log::InMemoryWebhookAuditLog;
