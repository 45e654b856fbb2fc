//! DonationRepository port - conditional writes on donation records.
//!
//! Provider callbacks arrive at least once and possibly concurrently. The
//! only concurrency control is the compare-and-set in
//! `compare_and_set_status`: implementations must perform it as a single
//! conditional write, never as a read followed by a write.

use async_trait::async_trait;

use crate::domain::donation::{Donation, StatusChange};
use crate::domain::foundation::{DomainError, DonationId};
use crate::domain::payment::PaymentProvider;

/// Result of attempting to insert a donation keyed by provider transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was inserted (first time seeing this transaction).
    Inserted,
    /// A donation for this provider transaction already exists.
    AlreadyExists,
}

#[async_trait]
pub trait DonationRepository: Send + Sync {
    /// Find a donation by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &DonationId) -> Result<Option<Donation>, DomainError>;

    /// Find the donation booked for a provider transaction.
    async fn find_by_provider_transaction(
        &self,
        provider: PaymentProvider,
        provider_transaction_id: &str,
    ) -> Result<Option<Donation>, DomainError>;

    /// Apply `change` only if the donation currently holds `change.expected`.
    ///
    /// Returns the updated donation when a row was affected, `None` when the
    /// donation does not exist or no longer holds the expected status.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure, including a
    ///   `provider_transaction_id` already held by another donation of the
    ///   same provider
    async fn compare_and_set_status(
        &self,
        id: &DonationId,
        change: &StatusChange,
    ) -> Result<Option<Donation>, DomainError>;

    /// Insert a donation unless one already exists for the same
    /// `(provider, provider_transaction_id)`.
    ///
    /// Uses `ON CONFLICT DO NOTHING` semantics so concurrent replays of one
    /// recurring charge create exactly one donation.
    async fn insert_if_absent(&self, donation: &Donation) -> Result<SaveResult, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn DonationRepository) {}

    #[test]
    fn save_results_are_distinct() {
        assert_ne!(SaveResult::Inserted, SaveResult::AlreadyExists);
    }
}
