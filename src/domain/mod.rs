//! Domain layer - aggregates, value objects and payment event normalization.

pub mod donation;
pub mod foundation;
pub mod payment;
pub mod subscription;
