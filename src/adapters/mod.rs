//! Adapters - Implementations of port interfaces.
//!
//! - `http` - axum webhook endpoints
//! - `postgres` - sqlx-backed storage
//! - `memory` - in-process storage for tests and local runs
//! - `notifications` - log and e-mail delivery channels

pub mod http;
pub mod memory;
pub mod notifications;
pub mod postgres;
