//! NotificationDispatcher - fire-and-forget fan-out to delivery channels.
//!
//! `dispatch` returns immediately. Delivery runs on a spawned task with every
//! channel attempted concurrently; failures are logged and dropped so they
//! can never reach the webhook response.

use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::ports::{Notification, NotificationChannel, RecipientDirectory};

#[derive(Clone)]
pub struct NotificationDispatcher {
    channels: Arc<Vec<Arc<dyn NotificationChannel>>>,
    directory: Arc<dyn RecipientDirectory>,
}

impl NotificationDispatcher {
    pub fn new(
        channels: Vec<Arc<dyn NotificationChannel>>,
        directory: Arc<dyn RecipientDirectory>,
    ) -> Self {
        Self {
            channels: Arc::new(channels),
            directory,
        }
    }

    /// Spawns delivery of `notification` to every channel.
    ///
    /// The handle is only useful to tests; production callers drop it.
    pub fn dispatch(&self, notification: Notification) -> JoinHandle<()> {
        let channels = self.channels.clone();
        let directory = self.directory.clone();

        tokio::spawn(async move {
            if channels.is_empty() {
                return;
            }

            let recipient_id = notification.recipient_id();
            let recipient = match directory.find_recipient(&recipient_id).await {
                Ok(Some(recipient)) => recipient,
                Ok(None) => {
                    warn!(
                        kind = notification.kind(),
                        recipient_id = %recipient_id,
                        "Notification recipient not found, dropping"
                    );
                    return;
                }
                Err(e) => {
                    warn!(
                        kind = notification.kind(),
                        recipient_id = %recipient_id,
                        error = %e,
                        "Recipient lookup failed, dropping notification"
                    );
                    return;
                }
            };

            let deliveries = channels.iter().map(|channel| {
                let notification = &notification;
                let recipient = &recipient;
                async move {
                    (
                        channel.name(),
                        channel.deliver(notification, recipient).await,
                    )
                }
            });

            for (channel, result) in join_all(deliveries).await {
                match result {
                    Ok(()) => debug!(channel, kind = notification.kind(), "Notification delivered"),
                    Err(e) => warn!(
                        channel,
                        kind = notification.kind(),
                        recipient_id = %recipient_id,
                        error = %e,
                        "Notification delivery failed"
                    ),
                }
            }
        })
    }
}
