use async_trait::async_trait;
use tracing::info;

use crate::ports::{Notification, NotificationChannel, NotificationError, Recipient};

/// Channel that only logs. Always configured, so every notification leaves a trace.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(
        &self,
        notification: &Notification,
        recipient: &Recipient,
    ) -> Result<(), NotificationError> {
        info!(
            kind = notification.kind(),
            recipient_id = %recipient.user_id,
            notification = ?notification,
            "Notification"
        );
        Ok(())
    }
}
