use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Whether a donation was a single gift or a charge of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationType {
    OneTime,
    Recurring,
}

impl DonationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationType::OneTime => "one_time",
            DonationType::Recurring => "recurring",
        }
    }
}

impl fmt::Display for DonationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DonationType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one_time" => Ok(DonationType::OneTime),
            "recurring" => Ok(DonationType::Recurring),
            other => Err(ValidationError::invalid_format(
                "donation_type",
                format!("unknown type '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&DonationType::OneTime).unwrap(),
            "\"one_time\""
        );
        assert_eq!("recurring".parse::<DonationType>(), Ok(DonationType::Recurring));
    }
}
