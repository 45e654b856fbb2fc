//! Payment webhook domain.
//!
//! Turns an authenticated provider callback into a canonical `PaymentEvent`.
//!
//! # Module Structure
//!
//! - `provider` - supported providers
//! - `event` - canonical event and outcome
//! - `errors` - WebhookError with HTTP status mapping
//! - `signature` - HMAC verifiers per provider
//! - `normalizer` - shared normalizer trait and field helpers
//! - `cloudpayments`, `yookassa` - provider payloads and normalizers

pub mod cloudpayments;
mod errors;
mod event;
mod normalizer;
mod provider;
mod signature;
pub mod yookassa;

pub use cloudpayments::CloudPaymentsNormalizer;
pub use errors::WebhookError;
pub use event::{PaymentEvent, PaymentStatus};
pub use normalizer::WebhookNormalizer;
pub use provider::PaymentProvider;
pub use signature::{
    sign_cloudpayments, sign_yookassa, CloudPaymentsVerifier, SignaturePolicy, SignatureVerifier,
    Verification, YooKassaVerifier,
};
pub use yookassa::YooKassaNormalizer;
