//! Configuration error types

use thiserror::Error;

/// Errors raised while building `AppConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A setting that loaded but cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required setting {0}")]
    MissingRequired(&'static str),

    #[error("server.port must be non-zero")]
    InvalidPort,

    #[error("server.host and server.port do not form a socket address")]
    InvalidSocketAddress,

    #[error("Timeouts must be positive (request timeout at most 300 seconds)")]
    InvalidTimeout,

    #[error("server.max_body_bytes must be between 1 byte and 10 MiB")]
    InvalidBodyLimit,

    #[error("database.url must use the postgres:// or postgresql:// scheme")]
    InvalidDatabaseUrl,

    #[error("database pool needs max_connections >= max(min_connections, 1)")]
    InvalidPoolSize,

    #[error("database.max_connections exceeds 100")]
    PoolSizeTooLarge,

    #[error(
        "CloudPayments API secret is required in production \
         (set payment.allow_unsigned_cloudpayments to accept unsigned callbacks)"
    )]
    UnsignedCloudPaymentsInProduction,

    #[error("email.resend_api_key must start with re_")]
    InvalidResendKey,

    #[error("email.from_email is not an e-mail address")]
    InvalidFromEmail,

    #[error("email.api_base_url must be an http(s) URL")]
    InvalidApiBaseUrl,
}
