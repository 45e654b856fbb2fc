//! Donation Reconciler - payment webhook reconciliation
//!
//! Accepts payment-outcome callbacks from CloudPayments and YooKassa,
//! authenticates and normalizes them, and applies each one at most once to
//! donations, campaign/fund/donor totals and recurring subscriptions.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
