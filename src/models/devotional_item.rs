//! Devotional Item Model
//!
//! One rotating piece of daily content. Creation order defines rotation order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevotionalItem {
    pub id: String,

    /// Caption in HTML markup
    pub caption: String,

    /// File reference of an attached image
    pub image: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl DevotionalItem {
    pub fn new(caption: impl Into<String>, image: Option<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            caption: caption.into(),
            image,
            created_at,
        }
    }
}
