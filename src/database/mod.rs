//! Database abstraction layer
//!
//! The [`ContentStore`] trait covers every read and write the bot performs on
//! subscribers and devotional items. SQLite (default) and PostgreSQL are
//! supported through SQLx; an in-memory store backs tests and dry runs.

pub mod connection;
pub mod memory;

use async_trait::async_trait;

use crate::models::{DevotionalItem, DuaSlot, Subscriber, SubscriberPatch};

pub use connection::DatabaseManager;
pub use memory::InMemoryContentStore;

/// Errors raised by a content store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Subscribers with a non-empty region
    async fn list_subscribers_with_region(&self) -> StoreResult<Vec<Subscriber>>;

    /// Subscribers whose dua time equals the slot
    async fn list_subscribers_with_dua_time(&self, slot: &DuaSlot) -> StoreResult<Vec<Subscriber>>;

    async fn list_all_subscribers(&self) -> StoreResult<Vec<Subscriber>>;

    /// Creates the subscriber or updates the fields present in the patch
    async fn upsert_subscriber(&self, id: &str, patch: &SubscriberPatch) -> StoreResult<()>;

    /// All devotional items ordered by creation time, oldest first
    async fn list_devotional_items(&self) -> StoreResult<Vec<DevotionalItem>>;

    async fn insert_devotional_item(&self, item: &DevotionalItem) -> StoreResult<()>;
}
