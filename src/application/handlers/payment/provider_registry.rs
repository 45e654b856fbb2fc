//! ProviderRegistry - verifier and normalizer per payment provider.

use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::payment::{
    CloudPaymentsNormalizer, CloudPaymentsVerifier, PaymentProvider, SignatureVerifier,
    WebhookNormalizer, YooKassaNormalizer, YooKassaVerifier,
};

#[derive(Clone)]
pub struct ProviderEntry {
    pub verifier: Arc<dyn SignatureVerifier>,
    pub normalizer: Arc<dyn WebhookNormalizer>,
}

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    entries: HashMap<PaymentProvider, ProviderEntry>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers both providers with the given secrets.
    pub fn standard(
        cloudpayments_secret: Option<SecretString>,
        yookassa_secret: Option<SecretString>,
    ) -> Self {
        Self::new()
            .with_provider(
                Arc::new(CloudPaymentsVerifier::new(cloudpayments_secret)),
                Arc::new(CloudPaymentsNormalizer),
            )
            .with_provider(
                Arc::new(YooKassaVerifier::new(yookassa_secret)),
                Arc::new(YooKassaNormalizer),
            )
    }

    pub fn with_provider(
        mut self,
        verifier: Arc<dyn SignatureVerifier>,
        normalizer: Arc<dyn WebhookNormalizer>,
    ) -> Self {
        debug_assert_eq!(verifier.provider(), normalizer.provider());
        self.entries.insert(
            verifier.provider(),
            ProviderEntry {
                verifier,
                normalizer,
            },
        );
        self
    }

    pub fn get(&self, provider: PaymentProvider) -> Option<&ProviderEntry> {
        self.entries.get(&provider)
    }
}
