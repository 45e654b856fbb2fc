//! Resend e-mail channel.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;

use crate::domain::foundation::Money;
use crate::ports::{Notification, NotificationChannel, NotificationError, Recipient};

/// Connection settings for the Resend API.
#[derive(Clone)]
pub struct ResendConfig {
    pub api_key: SecretString,
    /// Formatted `From` header, e.g. `Fund <noreply@example.org>`.
    pub from: String,
    pub api_base_url: String,
    pub timeout: Duration,
}

pub struct ResendEmailChannel {
    config: ResendConfig,
    http_client: reqwest::Client,
}

impl ResendEmailChannel {
    pub fn new(config: ResendConfig) -> Result<Self, NotificationError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotificationError::Transport(e.to_string()))?;
        Ok(Self {
            config,
            http_client,
        })
    }
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    text: String,
}

/// Renders the subject and plain-text body for `notification`.
pub fn render_email(notification: &Notification, recipient: &Recipient) -> (String, String) {
    let greeting = match &recipient.display_name {
        Some(name) => format!("Hello, {}!", name),
        None => "Hello!".to_string(),
    };

    match notification {
        Notification::DonationConfirmed { amount, .. } => (
            "Thank you for your donation".to_string(),
            format!(
                "{}\n\nWe received your donation of {}. Thank you for your support.",
                greeting, amount
            ),
        ),
        Notification::CampaignFundsReceived {
            campaign_title,
            amount,
            donor_id,
            current_amount,
            ..
        } => {
            let from = if donor_id.is_some() {
                "a donor"
            } else {
                "an anonymous donor"
            };
            (
                format!("New donation to \"{}\"", campaign_title),
                format!(
                    "{}\n\nYour campaign \"{}\" received {} from {}. Raised so far: {}.",
                    greeting,
                    campaign_title,
                    amount,
                    from,
                    raised_so_far(amount, *current_amount),
                ),
            )
        }
        Notification::SubscriptionRenewed {
            amount,
            next_billing_date,
            ..
        } => (
            "Your recurring donation was charged".to_string(),
            format!(
                "{}\n\nWe charged {} for your recurring donation. The next charge is on {}.",
                greeting,
                amount,
                next_billing_date.as_datetime().format("%Y-%m-%d"),
            ),
        ),
        Notification::SubscriptionPaymentFailed { reason, .. } => (
            "We could not charge your recurring donation".to_string(),
            format!(
                "{}\n\nYour recurring donation payment did not go through{}. \
                 Please check your payment method.",
                greeting,
                reason
                    .as_deref()
                    .map(|r| format!(" ({})", r))
                    .unwrap_or_default(),
            ),
        ),
    }
}

fn raised_so_far(amount: &Money, current_amount: i64) -> String {
    Money::new(current_amount, amount.currency().clone())
        .map(|total| total.to_string())
        .unwrap_or_else(|_| current_amount.to_string())
}

#[async_trait]
impl NotificationChannel for ResendEmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn deliver(
        &self,
        notification: &Notification,
        recipient: &Recipient,
    ) -> Result<(), NotificationError> {
        let to = recipient
            .email
            .as_deref()
            .ok_or(NotificationError::NoAddress(recipient.user_id))?;
        let (subject, text) = render_email(notification, recipient);

        let url = format!("{}/emails", self.config.api_base_url.trim_end_matches('/'));
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&SendEmailRequest {
                from: &self.config.from,
                to: [to],
                subject,
                text,
            })
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
