//! Prayer reminder bot
//!
//! Sends prayer-time reminders per region, a rotating daily dua at the time
//! each subscriber picked, and admin broadcasts, over the Telegram Bot API.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod messenger;
pub mod models;
pub mod prayer_times;
pub mod services;

pub use config::Config;
pub use error::{BotError, BotResult};
