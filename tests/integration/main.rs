//! Integration Tests
//!
//! Every service wired through `BotServices` against in-memory doubles.

mod common;

mod dua_dispatch;
mod interactions;
mod reminders;
mod sessions;
mod timeouts;
mod webhook;
