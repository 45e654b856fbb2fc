//! Webhook signature verification.
//!
//! Both providers sign the raw request body with HMAC-SHA256 under a shared
//! secret. CloudPayments sends the digest base64-encoded, YooKassa sends it
//! hex-encoded. Digests are always compared in constant time.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

use super::{PaymentProvider, WebhookError};

/// Result of checking a signature against a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Authentic,
    Inauthentic,
    /// No secret is configured for this provider.
    Unconfigured,
}

/// What an `Unconfigured` verification means for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePolicy {
    /// Proceed unauthenticated when no secret is configured.
    Optional,
    /// Reject as a configuration error when no secret is configured.
    Mandatory,
}

pub trait SignatureVerifier: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    fn policy(&self) -> SignaturePolicy;

    /// Header names that may carry the signature, in lookup order.
    fn signature_headers(&self) -> &'static [&'static str];

    /// Checks `signature` against `body`.
    fn verify(&self, body: &[u8], signature: Option<&str>) -> Verification;

    /// Applies the provider policy to a verification.
    ///
    /// # Errors
    ///
    /// - `Authentication` - signature missing or wrong
    /// - `Configuration` - mandatory secret is not configured
    fn authenticate(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<Verification, WebhookError> {
        match (self.verify(body, signature), self.policy()) {
            (Verification::Authentic, _) => Ok(Verification::Authentic),
            (Verification::Inauthentic, _) => Err(WebhookError::Authentication),
            (Verification::Unconfigured, SignaturePolicy::Optional) => {
                warn!(
                    provider = %self.provider(),
                    "Webhook signature verification disabled, accepting unauthenticated callback"
                );
                Ok(Verification::Unconfigured)
            }
            (Verification::Unconfigured, SignaturePolicy::Mandatory) => {
                Err(WebhookError::Configuration(format!(
                    "{} webhook secret is not configured",
                    self.provider()
                )))
            }
        }
    }
}

/// Verifies CloudPayments `Content-HMAC` signatures (base64 digest).
pub struct CloudPaymentsVerifier {
    api_secret: Option<SecretString>,
}

impl CloudPaymentsVerifier {
    pub fn new(api_secret: Option<SecretString>) -> Self {
        Self { api_secret }
    }
}

impl SignatureVerifier for CloudPaymentsVerifier {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::CloudPayments
    }

    fn policy(&self) -> SignaturePolicy {
        SignaturePolicy::Optional
    }

    fn signature_headers(&self) -> &'static [&'static str] {
        &["content-hmac", "x-content-hmac"]
    }

    fn verify(&self, body: &[u8], signature: Option<&str>) -> Verification {
        let Some(secret) = &self.api_secret else {
            return Verification::Unconfigured;
        };
        let Some(signature) = signature else {
            return Verification::Inauthentic;
        };
        let Ok(provided) = BASE64_STANDARD.decode(signature.trim()) else {
            return Verification::Inauthentic;
        };

        let expected = hmac_sha256(secret.expose_secret().as_bytes(), body);
        if constant_time_compare(&expected, &provided) {
            Verification::Authentic
        } else {
            Verification::Inauthentic
        }
    }
}

/// Verifies YooKassa `X-YooKassa-Signature` signatures (hex digest).
pub struct YooKassaVerifier {
    webhook_secret: Option<SecretString>,
}

impl YooKassaVerifier {
    pub fn new(webhook_secret: Option<SecretString>) -> Self {
        Self { webhook_secret }
    }
}

impl SignatureVerifier for YooKassaVerifier {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::YooKassa
    }

    fn policy(&self) -> SignaturePolicy {
        SignaturePolicy::Mandatory
    }

    fn signature_headers(&self) -> &'static [&'static str] {
        &["x-yookassa-signature"]
    }

    fn verify(&self, body: &[u8], signature: Option<&str>) -> Verification {
        let Some(secret) = &self.webhook_secret else {
            return Verification::Unconfigured;
        };
        let Some(signature) = signature else {
            return Verification::Inauthentic;
        };
        let Ok(provided) = hex::decode(signature.trim()) else {
            return Verification::Inauthentic;
        };

        let expected = hmac_sha256(secret.expose_secret().as_bytes(), body);
        if constant_time_compare(&expected, &provided) {
            Verification::Authentic
        } else {
            Verification::Inauthentic
        }
    }
}

fn hmac_sha256(secret: &[u8], body: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).expect("HMAC accepts any key");
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Base64 `Content-HMAC` value for use in test fixtures.
pub fn sign_cloudpayments(secret: &str, body: &[u8]) -> String {
    BASE64_STANDARD.encode(hmac_sha256(secret.as_bytes(), body))
}

/// Hex `X-YooKassa-Signature` value for use in test fixtures.
pub fn sign_yookassa(secret: &str, body: &[u8]) -> String {
    hex::encode(hmac_sha256(secret.as_bytes(), body))
}
