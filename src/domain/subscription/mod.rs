//! Subscription domain module.
//!
//! - `aggregate` - Subscription entity and charge bookkeeping
//! - `status` - SubscriptionStatus state machine
//! - `frequency` - BillingFrequency and calendar advancement

mod aggregate;
mod frequency;
mod status;

pub use aggregate::{ChargeFailure, ChargeSuccess, Subscription};
pub use frequency::BillingFrequency;
pub use status::SubscriptionStatus;
