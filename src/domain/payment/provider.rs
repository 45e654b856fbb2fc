//! Payment providers that deliver webhooks to us.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    /// Card acquiring with optional `Content-HMAC` signing.
    CloudPayments,
    /// Notification API with a mandatory signature header.
    YooKassa,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::CloudPayments => "cloudpayments",
            PaymentProvider::YooKassa => "yookassa",
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentProvider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cloudpayments" => Ok(PaymentProvider::CloudPayments),
            "yookassa" => Ok(PaymentProvider::YooKassa),
            other => Err(ValidationError::invalid_format(
                "provider",
                format!("unknown provider '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("CloudPayments".parse(), Ok(PaymentProvider::CloudPayments));
        assert_eq!("yookassa".parse(), Ok(PaymentProvider::YooKassa));
        assert!("stripe".parse::<PaymentProvider>().is_err());
    }

    #[test]
    fn serde_matches_as_str() {
        let json = serde_json::to_string(&PaymentProvider::YooKassa).unwrap();
        assert_eq!(json, "\"yookassa\"");
    }
}
