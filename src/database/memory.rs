//! In-memory content store

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ContentStore, StoreError, StoreResult};
use crate::models::{DevotionalItem, DuaSlot, Subscriber, SubscriberPatch};

#[derive(Debug, Default)]
struct Tables {
    subscribers: BTreeMap<String, Subscriber>,
    items: Vec<DevotionalItem>,
}

/// Content store kept entirely in memory. Writes can be made to fail.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContentStore {
    tables: Arc<RwLock<Tables>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a subscriber record as-is
    pub async fn put_subscriber(&self, subscriber: Subscriber) {
        let mut tables = self.tables.write().await;
        tables.subscribers.insert(subscriber.id.clone(), subscriber);
    }

    pub async fn subscriber(&self, id: &str) -> Option<Subscriber> {
        self.tables.read().await.subscribers.get(id).cloned()
    }

    /// Makes every subsequent write fail with `StoreError::Unavailable`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn list_subscribers_with_region(&self) -> StoreResult<Vec<Subscriber>> {
        let tables = self.tables.read().await;
        Ok(tables.subscribers.values().filter(|s| s.has_region()).cloned().collect())
    }

    async fn list_subscribers_with_dua_time(&self, slot: &DuaSlot) -> StoreResult<Vec<Subscriber>> {
        let wanted = slot.to_string();
        let tables = self.tables.read().await;
        Ok(tables
            .subscribers
            .values()
            .filter(|s| s.dua_time.as_deref() == Some(wanted.as_str()))
            .cloned()
            .collect())
    }

    async fn list_all_subscribers(&self) -> StoreResult<Vec<Subscriber>> {
        let tables = self.tables.read().await;
        Ok(tables.subscribers.values().cloned().collect())
    }

    async fn upsert_subscriber(&self, id: &str, patch: &SubscriberPatch) -> StoreResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        tables
            .subscribers
            .entry(id.to_string())
            .or_insert_with(|| Subscriber::new(id))
            .apply(patch);
        Ok(())
    }

    async fn list_devotional_items(&self) -> StoreResult<Vec<DevotionalItem>> {
        let mut items = self.tables.read().await.items.clone();
        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    async fn insert_devotional_item(&self, item: &DevotionalItem) -> StoreResult<()> {
        self.check_writable()?;
        self.tables.write().await.items.push(item.clone());
        Ok(())
    }
}
