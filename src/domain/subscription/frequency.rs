use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, ValidationError};

/// How often a subscription is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingFrequency {
    Monthly,
    Yearly,
}

impl BillingFrequency {
    /// Next billing date one calendar period after `charged_at`.
    ///
    /// Month arithmetic clamps to the last day of shorter months, so a charge
    /// on 31 January is next billed on the last day of February.
    pub fn next_billing_date(&self, charged_at: Timestamp) -> Result<Timestamp, ValidationError> {
        let next = match self {
            BillingFrequency::Monthly => charged_at.add_calendar_months(1),
            BillingFrequency::Yearly => charged_at.add_calendar_years(1),
        };
        next.ok_or_else(|| {
            ValidationError::invalid_format("next_billing_date", "date out of range")
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingFrequency::Monthly => "monthly",
            BillingFrequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for BillingFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingFrequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(BillingFrequency::Monthly),
            "yearly" => Ok(BillingFrequency::Yearly),
            other => Err(ValidationError::invalid_format(
                "billing_frequency",
                format!("unknown frequency '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Datelike, TimeZone, Utc};
    use proptest::prelude::*;

    fn at(rfc3339: &str) -> Timestamp {
        Timestamp::from_datetime(
            DateTime::parse_from_rfc3339(rfc3339)
                .unwrap()
                .with_timezone(&Utc),
        )
    }

    #[test]
    fn monthly_advances_one_calendar_month() {
        let next = BillingFrequency::Monthly
            .next_billing_date(at("2024-03-15T12:00:00Z"))
            .unwrap();
        assert_eq!(next, at("2024-04-15T12:00:00Z"));
    }

    #[test]
    fn monthly_clamps_end_of_month() {
        let next = BillingFrequency::Monthly
            .next_billing_date(at("2025-01-31T12:00:00Z"))
            .unwrap();
        assert_eq!(next, at("2025-02-28T12:00:00Z"));
    }

    #[test]
    fn yearly_advances_one_calendar_year() {
        let next = BillingFrequency::Yearly
            .next_billing_date(at("2024-06-01T00:00:00Z"))
            .unwrap();
        assert_eq!(next, at("2025-06-01T00:00:00Z"));
    }

    proptest! {
        #[test]
        fn next_billing_date_is_always_later(secs in 0i64..4_000_000_000) {
            let charged = Timestamp::from_datetime(Utc.timestamp_opt(secs, 0).unwrap());
            for frequency in [BillingFrequency::Monthly, BillingFrequency::Yearly] {
                let next = frequency.next_billing_date(charged).unwrap();
                prop_assert!(next.is_after(&charged));
            }
        }

        #[test]
        fn monthly_moves_exactly_one_month(secs in 0i64..4_000_000_000) {
            let charged = Timestamp::from_datetime(Utc.timestamp_opt(secs, 0).unwrap());
            let next = BillingFrequency::Monthly.next_billing_date(charged).unwrap();
            let from = charged.as_datetime();
            let to = next.as_datetime();
            let months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
            prop_assert_eq!(months, 1);
            prop_assert!(to.day() <= from.day());
        }
    }
}
