//! Donation domain module.
//!
//! - `aggregate` - Donation entity and conditional status changes
//! - `status` - DonationStatus state machine
//! - `donation_type` - one-time vs recurring

mod aggregate;
mod donation_type;
mod status;

pub use aggregate::{Donation, StatusChange};
pub use donation_type::DonationType;
pub use status::DonationStatus;
