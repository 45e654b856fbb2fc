//! Payment provider configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;
use crate::domain::payment::PaymentProvider;

/// Webhook secrets per provider.
///
/// Both are optional at load time. A missing YooKassa secret makes its
/// endpoint answer 503; a missing CloudPayments secret disables its
/// signature check, which production refuses unless explicitly allowed.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// CloudPayments API secret, signs `Content-HMAC`
    pub cloudpayments_api_secret: Option<SecretString>,

    /// YooKassa webhook secret, signs `X-YooKassa-Signature`
    pub yookassa_webhook_secret: Option<SecretString>,

    /// Accept unsigned CloudPayments callbacks in production
    #[serde(default)]
    pub allow_unsigned_cloudpayments: bool,

    /// Days to keep webhook audit records; 0 keeps them forever
    #[serde(default = "default_audit_retention_days")]
    pub audit_retention_days: u32,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            cloudpayments_api_secret: None,
            yookassa_webhook_secret: None,
            allow_unsigned_cloudpayments: false,
            audit_retention_days: default_audit_retention_days(),
        }
    }
}

fn default_audit_retention_days() -> u32 {
    90
}

impl PaymentConfig {
    /// CloudPayments secret, treating a blank value as absent.
    pub fn cloudpayments_secret(&self) -> Option<SecretString> {
        non_blank(&self.cloudpayments_api_secret)
    }

    /// YooKassa secret, treating a blank value as absent.
    pub fn yookassa_secret(&self) -> Option<SecretString> {
        non_blank(&self.yookassa_webhook_secret)
    }

    /// Providers whose callbacks will be accepted without authentication.
    pub fn unverified_providers(&self) -> Vec<PaymentProvider> {
        let mut providers = Vec::new();
        if self.cloudpayments_secret().is_none() {
            providers.push(PaymentProvider::CloudPayments);
        }
        providers
    }

    /// Retention window for webhook audit records, if pruning is enabled.
    pub fn audit_retention(&self) -> Option<chrono::Duration> {
        (self.audit_retention_days > 0)
            .then(|| chrono::Duration::days(i64::from(self.audit_retention_days)))
    }

    /// Validate payment configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if *environment == Environment::Production
            && self.cloudpayments_secret().is_none()
            && !self.allow_unsigned_cloudpayments
        {
            return Err(ValidationError::UnsignedCloudPaymentsInProduction);
        }
        Ok(())
    }
}

fn non_blank(secret: &Option<SecretString>) -> Option<SecretString> {
    secret
        .as_ref()
        .filter(|s| !s.expose_secret().trim().is_empty())
        .cloned()
}
