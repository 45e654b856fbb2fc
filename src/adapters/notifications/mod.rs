//! Notification channel implementations.
//!
//! - `LogChannel` - writes each notification as a structured log line
//! - `ResendEmailChannel` - sends e-mail through the Resend HTTP API

mod email_channel;
mod log_channel;

pub use email_channel::{render_email, ResendConfig, ResendEmailChannel};
pub use log_channel::LogChannel;
