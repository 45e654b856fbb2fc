use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{Recipient, RecipientDirectory};

#[derive(Default)]
pub struct InMemoryRecipientDirectory {
    recipients: RwLock<HashMap<UserId, Recipient>>,
}

impl InMemoryRecipientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, recipient: Recipient) {
        self.recipients
            .write()
            .await
            .insert(recipient.user_id, recipient);
    }
}

#[async_trait]
impl RecipientDirectory for InMemoryRecipientDirectory {
    async fn find_recipient(&self, user_id: &UserId) -> Result<Option<Recipient>, DomainError> {
        Ok(self.recipients.read().await.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finds_inserted_recipient() {
        let directory = InMemoryRecipientDirectory::new();
        let user_id = UserId::new();
        directory
            .insert(Recipient {
                user_id,
                email: Some("donor@example.org".into()),
                display_name: None,
            })
            .await;

        let found = directory.find_recipient(&user_id).await.unwrap().unwrap();
        assert_eq!(found.email.as_deref(), Some("donor@example.org"));
        assert!(directory.find_recipient(&UserId::new()).await.unwrap().is_none());
    }
}
