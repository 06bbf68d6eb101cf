//! API module for the prayer reminder bot
//!
//! The webhook endpoint and the Telegram update payloads it accepts.

pub mod update;
pub mod webhook;

// Re-export commonly used API components
pub use update::Update;
pub use webhook::{create_router, WebhookState};
