//! PostgreSQL implementation of RecipientDirectory over `users`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{Recipient, RecipientDirectory};

pub struct PostgresRecipientDirectory {
    pool: PgPool,
}

impl PostgresRecipientDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RecipientRow {
    id: Uuid,
    email: Option<String>,
    display_name: Option<String>,
}

#[async_trait]
impl RecipientDirectory for PostgresRecipientDirectory {
    async fn find_recipient(&self, user_id: &UserId) -> Result<Option<Recipient>, DomainError> {
        let row: Option<RecipientRow> =
            sqlx::query_as("SELECT id, email, display_name FROM users WHERE id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to fetch recipient", e))?;

        Ok(row.map(|row| Recipient {
            user_id: UserId::from_uuid(row.id),
            email: row.email,
            display_name: row.display_name,
        }))
    }
}
