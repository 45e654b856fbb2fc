use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::ports::{WebhookAuditLog, WebhookAuditRecord};

#[derive(Default)]
pub struct InMemoryWebhookAuditLog {
    records: Mutex<Vec<WebhookAuditRecord>>,
}

impl InMemoryWebhookAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<WebhookAuditRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl WebhookAuditLog for InMemoryWebhookAuditLog {
    async fn record(&self, record: WebhookAuditRecord) -> Result<(), DomainError> {
        self.records.lock().await.push(record);
        Ok(())
    }

    async fn delete_before(&self, timestamp: DateTime<Utc>) -> Result<u64, DomainError> {
        let mut records = self.records.lock().await;
        let before_count = records.len();
        records.retain(|r| r.received_at >= timestamp);
        Ok((before_count - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::PaymentProvider;
    use chrono::Duration;

    #[tokio::test]
    async fn delete_before_removes_old_records() {
        let log = InMemoryWebhookAuditLog::new();

        let mut old = WebhookAuditRecord::rejected(
            PaymentProvider::YooKassa,
            "Invalid signature",
            serde_json::json!({}),
        );
        old.received_at = Utc::now() - Duration::days(40);
        let recent = WebhookAuditRecord::processed(
            PaymentProvider::CloudPayments,
            "1001",
            "Completed",
            "completed",
            serde_json::json!({}),
        );

        log.record(old).await.unwrap();
        log.record(recent).await.unwrap();

        let deleted = log.delete_before(Utc::now() - Duration::days(30)).await.unwrap();

        assert_eq!(deleted, 1);
        let remaining = log.records().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].outcome, "completed");
    }
}
