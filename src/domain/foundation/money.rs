//! Money value object: integer minor units plus an ISO 4217 currency code.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Number of fractional digits carried by every supported currency.
const MINOR_DIGITS: u32 = 2;
const MINOR_PER_MAJOR: i64 = 100;

/// Three-letter uppercase currency code (e.g. `RUB`, `USD`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parses a currency code, normalising to uppercase.
    pub fn parse(code: &str) -> Result<Self, ValidationError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::empty_field("currency"));
        }
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                format!("'{}' is not a three-letter code", code),
            ));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A non-negative amount of money in minor units (kopecks, cents).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    minor_units: i64,
    currency: Currency,
}

impl Money {
    /// Creates an amount from minor units. Negative amounts are rejected.
    pub fn new(minor_units: i64, currency: Currency) -> Result<Self, ValidationError> {
        if minor_units < 0 {
            return Err(ValidationError::out_of_range("amount", 0, i64::MAX, minor_units));
        }
        Ok(Self {
            minor_units,
            currency,
        })
    }

    /// Parses a decimal major-unit string such as `"500"`, `"500.5"` or `"1500.00"`.
    ///
    /// More than two fractional digits is rejected rather than rounded.
    pub fn from_decimal_str(value: &str, currency: Currency) -> Result<Self, ValidationError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ValidationError::empty_field("amount"));
        }

        let invalid = |reason: &str| ValidationError::invalid_format("amount", reason.to_string());

        let (whole, fraction) = match value.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (value, ""),
        };

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected a non-negative decimal number"));
        }
        if !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected a non-negative decimal number"));
        }
        if fraction.len() as u32 > MINOR_DIGITS {
            return Err(invalid("more than two fractional digits"));
        }

        let whole: i64 = whole.parse().map_err(|_| invalid("amount too large"))?;
        let mut fraction_units: i64 = if fraction.is_empty() {
            0
        } else {
            fraction.parse().map_err(|_| invalid("invalid fraction"))?
        };
        if fraction.len() == 1 {
            fraction_units *= 10;
        }

        let minor_units = whole
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|w| w.checked_add(fraction_units))
            .ok_or_else(|| invalid("amount too large"))?;

        Self::new(minor_units, currency)
    }

    pub fn minor_units(&self) -> i64 {
        self.minor_units
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.minor_units == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02} {}",
            self.minor_units / MINOR_PER_MAJOR,
            self.minor_units % MINOR_PER_MAJOR,
            self.currency
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rub() -> Currency {
        Currency::parse("RUB").unwrap()
    }

    #[test]
    fn currency_is_uppercased() {
        assert_eq!(Currency::parse("usd").unwrap().as_str(), "USD");
    }

    #[test]
    fn currency_rejects_bad_codes() {
        assert!(Currency::parse("").is_err());
        assert!(Currency::parse("RUBL").is_err());
        assert!(Currency::parse("R1B").is_err());
    }

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(Money::from_decimal_str("500", rub()).unwrap().minor_units(), 50000);
        assert_eq!(Money::from_decimal_str("500.5", rub()).unwrap().minor_units(), 50050);
        assert_eq!(Money::from_decimal_str("1500.05", rub()).unwrap().minor_units(), 150005);
        assert_eq!(Money::from_decimal_str("0.00", rub()).unwrap().minor_units(), 0);
    }

    #[test]
    fn rejects_excess_precision() {
        let err = Money::from_decimal_str("10.001", rub()).unwrap_err();
        assert!(err.to_string().contains("more than two fractional digits"));
    }

    #[test]
    fn rejects_negative_and_garbage() {
        assert!(Money::from_decimal_str("-1", rub()).is_err());
        assert!(Money::from_decimal_str("abc", rub()).is_err());
        assert!(Money::from_decimal_str(".5", rub()).is_err());
        assert!(Money::from_decimal_str("", rub()).is_err());
        assert!(Money::new(-5, rub()).is_err());
    }

    #[test]
    fn displays_major_units_with_currency() {
        let money = Money::new(150005, rub()).unwrap();
        assert_eq!(money.to_string(), "1500.05 RUB");
    }

    proptest! {
        #[test]
        fn display_then_parse_preserves_minor_units(minor in 0i64..1_000_000_000_000) {
            let money = Money::new(minor, rub()).unwrap();
            let rendered = money.to_string();
            let number = rendered.split(' ').next().unwrap();
            let parsed = Money::from_decimal_str(number, rub()).unwrap();
            prop_assert_eq!(parsed.minor_units(), minor);
        }
    }
}
