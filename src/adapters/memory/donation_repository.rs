//! In-memory donation storage.
//!
//! Every read-modify-write runs under one mutex, which gives the same
//! single-statement atomicity the Postgres adapter gets from `UPDATE … WHERE`.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::donation::{Donation, StatusChange};
use crate::domain::foundation::{DomainError, DonationId, ErrorCode};
use crate::domain::payment::PaymentProvider;
use crate::ports::{DonationRepository, SaveResult};

fn holds_transaction(donation: &Donation, provider: PaymentProvider, tx: &str) -> bool {
    donation.provider == provider && donation.provider_transaction_id.as_deref() == Some(tx)
}

#[derive(Default)]
pub struct InMemoryDonationRepository {
    donations: Mutex<HashMap<DonationId, Donation>>,
}

impl InMemoryDonationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a donation as created by checkout, replacing any existing one.
    pub async fn insert(&self, donation: Donation) {
        self.donations.lock().await.insert(donation.id, donation);
    }

    pub async fn get(&self, id: &DonationId) -> Option<Donation> {
        self.donations.lock().await.get(id).cloned()
    }

    pub async fn all(&self) -> Vec<Donation> {
        self.donations.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl DonationRepository for InMemoryDonationRepository {
    async fn find_by_id(&self, id: &DonationId) -> Result<Option<Donation>, DomainError> {
        Ok(self.get(id).await)
    }

    async fn find_by_provider_transaction(
        &self,
        provider: PaymentProvider,
        provider_transaction_id: &str,
    ) -> Result<Option<Donation>, DomainError> {
        Ok(self
            .donations
            .lock()
            .await
            .values()
            .find(|d| holds_transaction(d, provider, provider_transaction_id))
            .cloned())
    }

    async fn compare_and_set_status(
        &self,
        id: &DonationId,
        change: &StatusChange,
    ) -> Result<Option<Donation>, DomainError> {
        let mut donations = self.donations.lock().await;
        let Some(current) = donations.get(id) else {
            return Ok(None);
        };
        if current.status != change.expected {
            return Ok(None);
        }

        // Same rule as the `donations_provider_transaction_key` unique index.
        if let Some(tx) = change.provider_transaction_id.as_deref() {
            let provider = current.provider;
            let taken = donations
                .values()
                .any(|other| other.id != *id && holds_transaction(other, provider, tx));
            if taken {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    "provider transaction already belongs to another donation",
                )
                .with_detail("provider_transaction_id", tx));
            }
        }

        let Some(donation) = donations.get_mut(id) else {
            return Ok(None);
        };
        donation.apply(change)?;
        Ok(Some(donation.clone()))
    }

    async fn insert_if_absent(&self, donation: &Donation) -> Result<SaveResult, DomainError> {
        let mut donations = self.donations.lock().await;
        let duplicate = donation
            .provider_transaction_id
            .as_deref()
            .is_some_and(|tx| {
                donations
                    .values()
                    .any(|existing| holds_transaction(existing, donation.provider, tx))
            });
        if duplicate || donations.contains_key(&donation.id) {
            return Ok(SaveResult::AlreadyExists);
        }
        donations.insert(donation.id, donation.clone());
        Ok(SaveResult::Inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::donation::DonationStatus;
    use crate::domain::foundation::{Currency, DonorId, Money};
    use crate::domain::payment::PaymentProvider;
    use std::sync::Arc;

    fn pending() -> Donation {
        Donation::pending(
            DonationId::new(),
            DonorId::new(),
            Money::new(50000, Currency::parse("RUB").unwrap()).unwrap(),
            PaymentProvider::CloudPayments,
        )
    }

    fn complete(tx: &str) -> StatusChange {
        StatusChange::to(DonationStatus::Completed, Some(tx.to_string())).unwrap()
    }

    #[tokio::test]
    async fn compare_and_set_applies_once() {
        let repo = InMemoryDonationRepository::new();
        let donation = pending();
        repo.insert(donation.clone()).await;

        let first = repo.compare_and_set_status(&donation.id, &complete("1")).await.unwrap();
        let second = repo.compare_and_set_status(&donation.id, &complete("1")).await.unwrap();

        assert_eq!(first.unwrap().status, DonationStatus::Completed);
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn compare_and_set_on_missing_donation_is_none() {
        let repo = InMemoryDonationRepository::new();
        let result = repo
            .compare_and_set_status(&DonationId::new(), &complete("1"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn concurrent_compare_and_set_has_one_winner() {
        let repo = Arc::new(InMemoryDonationRepository::new());
        let donation = pending();
        repo.insert(donation.clone()).await;

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let repo = repo.clone();
                let id = donation.id;
                tokio::spawn(async move {
                    repo.compare_and_set_status(&id, &complete("1")).await.unwrap()
                })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn compare_and_set_rejects_transaction_held_by_another_donation() {
        let repo = InMemoryDonationRepository::new();
        let first = pending();
        let second = pending();
        repo.insert(first.clone()).await;
        repo.insert(second.clone()).await;

        repo.compare_and_set_status(&first.id, &complete("tx-1")).await.unwrap();
        let err = repo
            .compare_and_set_status(&second.id, &complete("tx-1"))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(repo.get(&second.id).await.unwrap().status, DonationStatus::Pending);
    }

    #[tokio::test]
    async fn find_by_provider_transaction_matches_provider_and_id() {
        let repo = InMemoryDonationRepository::new();
        let donation = pending();
        repo.insert(donation.clone()).await;
        repo.compare_and_set_status(&donation.id, &complete("tx-4")).await.unwrap();

        let found = repo
            .find_by_provider_transaction(PaymentProvider::CloudPayments, "tx-4")
            .await
            .unwrap();
        let other_provider = repo
            .find_by_provider_transaction(PaymentProvider::YooKassa, "tx-4")
            .await
            .unwrap();

        assert_eq!(found.map(|d| d.id), Some(donation.id));
        assert!(other_provider.is_none());
    }

    #[tokio::test]
    async fn insert_if_absent_dedupes_on_provider_transaction() {
        let repo = InMemoryDonationRepository::new();
        let mut first = pending();
        first.provider_transaction_id = Some("tx-9".into());
        let mut second = pending();
        second.provider_transaction_id = Some("tx-9".into());

        assert_eq!(repo.insert_if_absent(&first).await.unwrap(), SaveResult::Inserted);
        assert_eq!(
            repo.insert_if_absent(&second).await.unwrap(),
            SaveResult::AlreadyExists
        );
        assert_eq!(repo.all().await.len(), 1);
    }

    #[tokio::test]
    async fn same_transaction_on_other_provider_is_distinct() {
        let repo = InMemoryDonationRepository::new();
        let mut first = pending();
        first.provider_transaction_id = Some("tx-9".into());
        let mut second = pending();
        second.provider = PaymentProvider::YooKassa;
        second.provider_transaction_id = Some("tx-9".into());

        repo.insert_if_absent(&first).await.unwrap();
        assert_eq!(repo.insert_if_absent(&second).await.unwrap(), SaveResult::Inserted);
    }
}
