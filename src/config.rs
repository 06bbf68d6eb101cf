//! Configuration management for the prayer reminder bot
//!
//! Handles environment variables and application settings.

use std::env;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Serialize;
use tracing::{info, warn};

use crate::logging::LogFormat;
use crate::models::AdminSet;
use crate::services::DeliverySettings;

/// Application configuration
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Bot API token
    #[serde(skip_serializing)]
    pub bot_token: String,

    /// Chat ids allowed to use the admin flows
    pub admin_ids: Vec<String>,

    /// Database URL
    pub database_url: String,

    /// Webhook listener bind address
    pub host: String,

    /// Webhook listener port
    pub port: u16,

    /// Public base URL the webhook is registered under; unset leaves registration alone
    pub public_url: Option<String>,

    /// Timezone for dua slots and the daily rotation
    #[serde(serialize_with = "serialize_tz")]
    pub reference_timezone: Tz,

    /// Timezone for regions without their own
    #[serde(serialize_with = "serialize_optional_tz")]
    pub fallback_timezone: Option<Tz>,

    /// Pause between broadcast sends in milliseconds
    pub broadcast_delay_ms: u64,

    /// Upper bound for any external call in seconds
    pub external_timeout_secs: u64,

    /// Concurrent sends within one scheduled fan-out
    pub fanout_concurrency: usize,

    /// Unfinished sessions older than this are dropped; unset keeps them forever
    pub session_idle_timeout_secs: Option<u64>,

    /// Log level
    pub log_level: String,

    /// Log output format
    #[serde(skip_serializing)]
    pub log_format: LogFormat,
}

fn serialize_tz<S: serde::Serializer>(tz: &Tz, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(tz.name())
}

fn serialize_optional_tz<S: serde::Serializer>(tz: &Option<Tz>, serializer: S) -> Result<S::Ok, S::Error> {
    match tz {
        Some(tz) => serializer.serialize_some(tz.name()),
        None => serializer.serialize_none(),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            admin_ids: vec![],
            database_url: "sqlite:prayer-bot.db?mode=rwc".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_url: None,
            reference_timezone: chrono_tz::Asia::Tashkent,
            fallback_timezone: Some(chrono_tz::Asia::Tashkent),
            broadcast_delay_ms: 50,
            external_timeout_secs: 10,
            fanout_concurrency: 8,
            session_idle_timeout_secs: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Console,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup, applying defaults for absent keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // Telegram
        if let Some(token) = var("PRAYER_BOT_TOKEN") {
            config.bot_token = token;
        }

        if let Some(admins) = var("PRAYER_BOT_ADMIN_IDS") {
            config.admin_ids = admins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(public_url) = var("PRAYER_BOT_PUBLIC_URL") {
            config.public_url = Some(public_url.trim_end_matches('/').to_string());
        }

        // Database configuration
        if let Some(database_url) = var("PRAYER_BOT_DATABASE_URL") {
            config.database_url = database_url;
        }

        // Server configuration
        if let Some(host) = var("PRAYER_BOT_HOST") {
            config.host = host;
        }

        if let Some(port) = var("PRAYER_BOT_PORT") {
            config.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }

        // Timezones
        if let Some(tz) = var("PRAYER_BOT_REFERENCE_TIMEZONE") {
            config.reference_timezone = tz.parse().map_err(|_| ConfigError::InvalidTimezone(tz))?;
        }

        if let Some(tz) = var("PRAYER_BOT_FALLBACK_TIMEZONE") {
            config.fallback_timezone = if tz.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(tz.parse().map_err(|_| ConfigError::InvalidTimezone(tz))?)
            };
        }

        // Delivery limits
        if let Some(delay) = var("PRAYER_BOT_BROADCAST_DELAY_MS") {
            config.broadcast_delay_ms = delay.parse().map_err(|_| ConfigError::InvalidNumber {
                key: "PRAYER_BOT_BROADCAST_DELAY_MS",
                value: delay,
            })?;
        }

        if let Some(timeout) = var("PRAYER_BOT_EXTERNAL_TIMEOUT_SECS") {
            config.external_timeout_secs = timeout.parse().map_err(|_| ConfigError::InvalidNumber {
                key: "PRAYER_BOT_EXTERNAL_TIMEOUT_SECS",
                value: timeout,
            })?;
        }

        if let Some(concurrency) = var("PRAYER_BOT_FANOUT_CONCURRENCY") {
            config.fanout_concurrency = concurrency.parse().map_err(|_| ConfigError::InvalidNumber {
                key: "PRAYER_BOT_FANOUT_CONCURRENCY",
                value: concurrency,
            })?;
        }

        if let Some(idle) = var("PRAYER_BOT_SESSION_IDLE_TIMEOUT_SECS") {
            config.session_idle_timeout_secs = Some(idle.parse().map_err(|_| ConfigError::InvalidNumber {
                key: "PRAYER_BOT_SESSION_IDLE_TIMEOUT_SECS",
                value: idle,
            })?);
        }

        // Logging
        if let Some(log_level) = var("PRAYER_BOT_LOG_LEVEL") {
            config.log_level = log_level;
        }

        if let Some(format) = var("PRAYER_BOT_LOG_FORMAT") {
            config.log_format = format.parse().map_err(|_| ConfigError::InvalidLogFormat(format))?;
        }

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_token.is_empty() {
            return Err(ConfigError::MissingToken);
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port.to_string()));
        }

        if self.database_url.is_empty() {
            return Err(ConfigError::EmptyDatabaseUrl);
        }

        if self.external_timeout_secs == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "PRAYER_BOT_EXTERNAL_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        if self.fanout_concurrency == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "PRAYER_BOT_FANOUT_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        if self.session_idle_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidNumber {
                key: "PRAYER_BOT_SESSION_IDLE_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        if let Some(url) = &self.public_url {
            if !url.starts_with("https://") {
                return Err(ConfigError::InsecurePublicUrl(url.clone()));
            }
        }

        Ok(())
    }

    /// Get server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Full URL the webhook is registered under
    pub fn webhook_url(&self) -> Option<String> {
        self.public_url
            .as_ref()
            .map(|base| format!("{}/webhook/{}", base, self.bot_token))
    }

    pub fn delivery_settings(&self) -> DeliverySettings {
        DeliverySettings {
            external_timeout: Duration::from_secs(self.external_timeout_secs),
            concurrency: self.fanout_concurrency,
            broadcast_delay: Duration::from_millis(self.broadcast_delay_ms),
        }
    }

    pub fn admin_set(&self) -> AdminSet {
        AdminSet::new(self.admin_ids.iter().cloned())
    }

    pub fn session_idle_timeout(&self) -> Option<chrono::Duration> {
        self.session_idle_timeout_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(chrono::Duration::seconds)
    }

    /// Log configuration (excluding sensitive data)
    pub fn log_config(&self) {
        info!("Configuration loaded:");
        info!("  Bind address: {}", self.bind_address());
        info!("  Database URL: {}", self.mask_database_url());
        info!("  Public URL: {}", self.public_url.as_deref().unwrap_or("(not set)"));
        info!("  Admins: {}", self.admin_ids.len());
        info!("  Reference timezone: {}", self.reference_timezone);
        info!(
            "  Fallback timezone: {}",
            self.fallback_timezone.map(|tz| tz.name()).unwrap_or("(none)")
        );
        info!("  Broadcast delay: {}ms", self.broadcast_delay_ms);
        info!("  External timeout: {}s", self.external_timeout_secs);
        info!("  Fan-out concurrency: {}", self.fanout_concurrency);
        match self.session_idle_timeout_secs {
            Some(secs) => info!("  Session idle timeout: {}s", secs),
            None => info!("  Session idle timeout: disabled"),
        }
        info!("  Log level: {}", self.log_level);

        if self.admin_ids.is_empty() {
            warn!("⚠️  No admin ids configured - /panel and feedback forwarding are inert");
        }
    }

    /// Mask database URL for logging
    pub fn mask_database_url(&self) -> String {
        if self.database_url.starts_with("sqlite:") {
            self.database_url.clone()
        } else if let Some((scheme, _)) = self.database_url.split_once("://") {
            format!("{scheme}://***")
        } else {
            "***".to_string()
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PRAYER_BOT_TOKEN is not set")]
    MissingToken,

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("Invalid log format: {0} (expected json or console)")]
    InvalidLogFormat(String),

    #[error("Public URL must use https: {0}")]
    InsecurePublicUrl(String),

    #[error("Empty database URL")]
    EmptyDatabaseUrl,
}
