//! Error handling for the prayer reminder bot
//!
//! Centralized error taxonomy. Per-item failures inside scheduling and
//! dispatch loops are logged and counted; only startup failures are fatal.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::database::StoreError;
use crate::messenger::MessengerError;
use crate::models::DuaTimeError;
use crate::prayer_times::ProviderError;

/// Unknown region keys and malformed slots. Shown to the user that triggered them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Unknown region key: {0}")]
    UnknownRegion(String),

    #[error("No timezone configured for region {0} and no fallback set")]
    MissingTimezone(String),

    #[error("Invalid dua time: {0}")]
    InvalidDuaTime(#[from] DuaTimeError),
}

/// Application error types
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Prayer time provider unavailable: {0}")]
    ProviderUnavailable(#[from] ProviderError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] MessengerError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Timed out after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BotError {
    pub fn timeout(operation: &str, limit: std::time::Duration) -> Self {
        BotError::Timeout {
            operation: operation.to_string(),
            seconds: limit.as_secs(),
        }
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            BotError::ProviderUnavailable(_) | BotError::Delivery(_) => StatusCode::BAD_GATEWAY,
            BotError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            BotError::Configuration(_) => StatusCode::BAD_REQUEST,
            BotError::NotFound(_) => StatusCode::NOT_FOUND,
            BotError::Persistence(_) | BotError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for logs and responses
    pub fn error_code(&self) -> &'static str {
        match self {
            BotError::ProviderUnavailable(_) => "ProviderUnavailable",
            BotError::Persistence(_) => "PersistenceError",
            BotError::Delivery(MessengerError::RecipientUnreachable { .. }) => "RecipientUnreachable",
            BotError::Delivery(_) => "DeliveryError",
            BotError::Configuration(_) => "ConfigurationError",
            BotError::Timeout { .. } => "Timeout",
            BotError::NotFound(_) => "NotFound",
            BotError::Internal(_) => "InternalError",
        }
    }

    /// Whether the failure concerns a single recipient or subscriber and the
    /// surrounding loop should simply count it and move on
    pub fn is_per_recipient(&self) -> bool {
        matches!(
            self,
            BotError::Delivery(_) | BotError::Timeout { .. } | BotError::ProviderUnavailable(_)
        )
    }
}

impl IntoResponse for BotError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.error_code(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type BotResult<T> = Result<T, BotError>;
