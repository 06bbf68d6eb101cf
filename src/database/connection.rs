//! Database connection manager
//!
//! Provides database-agnostic storage of subscribers and devotional items for
//! SQLite and PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::any::AnyPoolOptions;
use sqlx::{query, query_as, AnyPool};
use tracing::{debug, info};

use super::{ContentStore, StoreError, StoreResult};
use crate::models::{DevotionalItem, DuaSlot, Subscriber, SubscriberPatch};

// Database row structures
#[derive(Debug, sqlx::FromRow)]
struct SubscriberRow {
    id: String,
    name: Option<String>,
    username: Option<String>,
    region: Option<String>,
    dua_time: Option<String>,
}

impl From<SubscriberRow> for Subscriber {
    fn from(row: SubscriberRow) -> Self {
        Subscriber {
            id: row.id,
            name: row.name,
            username: row.username,
            region: row.region,
            dua_time: row.dua_time,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DevotionalRow {
    id: String,
    caption: String,
    image: Option<String>,
    /// Unix timestamp in milliseconds
    created_at: i64,
}

impl TryFrom<DevotionalRow> for DevotionalItem {
    type Error = StoreError;

    fn try_from(row: DevotionalRow) -> Result<Self, Self::Error> {
        let created_at = DateTime::<Utc>::from_timestamp_millis(row.created_at)
            .ok_or_else(|| StoreError::Corrupt(format!("devotional item {} has invalid created_at", row.id)))?;

        Ok(DevotionalItem {
            id: row.id,
            caption: row.caption,
            image: row.image,
            created_at,
        })
    }
}

const SUBSCRIBER_COLUMNS: &str = "id, name, username, region, dua_time";

/// Database connection manager
#[derive(Debug, Clone)]
pub struct DatabaseManager {
    pub pool: AnyPool,
}

impl DatabaseManager {
    /// Create a new database manager with the given connection URL
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_max_connections(database_url, 5).await
    }

    /// Create a manager with an explicit pool size. In-memory SQLite needs 1,
    /// every connection would otherwise see its own empty database.
    pub async fn with_max_connections(database_url: &str, max_connections: u32) -> Result<Self> {
        sqlx::any::install_default_drivers();

        info!("Connecting to database");

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

        debug!("Successfully connected to database");

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");

        query(
            r#"
            CREATE TABLE IF NOT EXISTS subscribers (
                id TEXT PRIMARY KEY,
                name TEXT,
                username TEXT,
                region TEXT,
                dua_time TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        query(
            r#"
            CREATE TABLE IF NOT EXISTS devotional_items (
                id TEXT PRIMARY KEY,
                caption TEXT NOT NULL,
                image TEXT,
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        query("CREATE INDEX IF NOT EXISTS idx_subscribers_dua_time ON subscribers (dua_time)")
            .execute(&self.pool)
            .await?;

        query("CREATE INDEX IF NOT EXISTS idx_devotional_items_created_at ON devotional_items (created_at)")
            .execute(&self.pool)
            .await?;

        info!("Database migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl ContentStore for DatabaseManager {
    async fn list_subscribers_with_region(&self) -> StoreResult<Vec<Subscriber>> {
        let sql = format!("SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE region IS NOT NULL AND region <> ''");
        let rows: Vec<SubscriberRow> = query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Subscriber::from).collect())
    }

    async fn list_subscribers_with_dua_time(&self, slot: &DuaSlot) -> StoreResult<Vec<Subscriber>> {
        let sql = format!("SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE dua_time = $1");
        let rows: Vec<SubscriberRow> = query_as(&sql)
            .bind(slot.to_string())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Subscriber::from).collect())
    }

    async fn list_all_subscribers(&self) -> StoreResult<Vec<Subscriber>> {
        let sql = format!("SELECT {SUBSCRIBER_COLUMNS} FROM subscribers");
        let rows: Vec<SubscriberRow> = query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Subscriber::from).collect())
    }

    async fn upsert_subscriber(&self, id: &str, patch: &SubscriberPatch) -> StoreResult<()> {
        let result = query(
            r#"
            INSERT INTO subscribers (id, name, username, region, dua_time)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                name = COALESCE(excluded.name, subscribers.name),
                username = COALESCE(excluded.username, subscribers.username),
                region = COALESCE(excluded.region, subscribers.region),
                dua_time = COALESCE(excluded.dua_time, subscribers.dua_time)
            "#,
        )
        .bind(id.to_string())
        .bind(patch.name.clone())
        .bind(patch.username.clone())
        .bind(patch.region.clone())
        .bind(patch.dua_time.clone())
        .execute(&self.pool)
        .await?;

        debug!(subscriber = %id, rows_affected = result.rows_affected(), "Subscriber upserted");
        Ok(())
    }

    async fn list_devotional_items(&self) -> StoreResult<Vec<DevotionalItem>> {
        let rows: Vec<DevotionalRow> =
            query_as("SELECT id, caption, image, created_at FROM devotional_items ORDER BY created_at ASC, id ASC")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(DevotionalItem::try_from).collect()
    }

    async fn insert_devotional_item(&self, item: &DevotionalItem) -> StoreResult<()> {
        query("INSERT INTO devotional_items (id, caption, image, created_at) VALUES ($1, $2, $3, $4)")
            .bind(item.id.clone())
            .bind(item.caption.clone())
            .bind(item.image.clone())
            .bind(item.created_at.timestamp_millis())
            .execute(&self.pool)
            .await?;

        debug!(item = %item.id, "Devotional item stored");
        Ok(())
    }
}
