//! Donation status state machine.
//!
//! A donation starts `pending` and is settled exactly once by a provider
//! callback. The only later change is a refund of a completed donation.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a single donation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    /// Checkout initiated, waiting for the provider outcome.
    Pending,

    /// Provider confirmed the charge. Counted in aggregates.
    Completed,

    /// Provider declined or cancelled the charge.
    Failed,

    /// A completed charge was returned to the donor.
    Refunded,
}

impl DonationStatus {
    /// Returns the status a donation must currently hold for `self` to be
    /// reachable, or `None` when nothing transitions into `self`.
    pub fn required_predecessor(&self) -> Option<DonationStatus> {
        match self {
            DonationStatus::Completed | DonationStatus::Failed => Some(DonationStatus::Pending),
            DonationStatus::Refunded => Some(DonationStatus::Completed),
            DonationStatus::Pending => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Completed => "completed",
            DonationStatus::Failed => "failed",
            DonationStatus::Refunded => "refunded",
        }
    }
}

impl StateMachine for DonationStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use DonationStatus::*;
        matches!(
            (self, target),
            (Pending, Completed) | (Pending, Failed) | (Completed, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use DonationStatus::*;
        match self {
            Pending => vec![Completed, Failed],
            Completed => vec![Refunded],
            Failed => vec![],
            Refunded => vec![],
        }
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DonationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DonationStatus::Pending),
            "completed" => Ok(DonationStatus::Completed),
            "failed" => Ok(DonationStatus::Failed),
            "refunded" => Ok(DonationStatus::Refunded),
            other => Err(ValidationError::invalid_format(
                "donation_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DonationStatus::*;

    const ALL: [DonationStatus; 4] = [Pending, Completed, Failed, Refunded];

    #[test]
    fn pending_settles_to_completed_or_failed() {
        assert_eq!(Pending.transition_to(Completed), Ok(Completed));
        assert_eq!(Pending.transition_to(Failed), Ok(Failed));
    }

    #[test]
    fn only_completed_can_be_refunded() {
        assert_eq!(Completed.transition_to(Refunded), Ok(Refunded));
        assert!(Pending.transition_to(Refunded).is_err());
        assert!(Failed.transition_to(Refunded).is_err());
    }

    #[test]
    fn settled_donations_cannot_reopen() {
        for from in [Completed, Failed, Refunded] {
            assert!(from.transition_to(Pending).is_err());
        }
        assert!(Completed.transition_to(Failed).is_err());
        assert!(Failed.transition_to(Completed).is_err());
    }

    #[test]
    fn failed_and_refunded_are_terminal() {
        assert!(Failed.is_terminal());
        assert!(Refunded.is_terminal());
        assert!(!Pending.is_terminal());
        assert!(!Completed.is_terminal());
    }

    #[test]
    fn required_predecessor_matches_state_machine() {
        for target in ALL {
            match target.required_predecessor() {
                Some(from) => assert!(from.can_transition_to(&target)),
                None => assert!(ALL.iter().all(|s| !s.can_transition_to(&target))),
            }
        }
    }

    #[test]
    fn string_form_round_trips() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<DonationStatus>(), Ok(status));
        }
        assert!("settled".parse::<DonationStatus>().is_err());
    }
}
