//! Logging configuration for the prayer reminder bot
//!
//! Structured logging setup plus helpers for the events operators grep for:
//! reminder sends, fan-out summaries, delivery failures and session changes.

use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Output format of the log stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line, for log shippers
    Json,
    /// Compact human readable lines
    #[default]
    Console,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "console" | "pretty" | "compact" => Ok(LogFormat::Console),
            other => Err(other.to_string()),
        }
    }
}

fn default_filter(level: &str) -> String {
    format!("prayer_reminder_bot={level},tower_http=info,axum::rejection=trace,sqlx=warn")
}

/// Initialize the application logging system. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let json_layer = (format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    let console_layer = (format == LogFormat::Console).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_ansi(true)
    });

    // A second call (tests) keeps the first subscriber
    if Registry::default()
        .with(env_filter)
        .with(json_layer)
        .with(console_layer)
        .try_init()
        .is_ok()
    {
        tracing::info!("Logging system initialized");
    }
}

/// Create a span for one run of the prayer reminder tick
#[macro_export]
macro_rules! tick_span {
    ($started_at:expr) => {
        tracing::info_span!(
            "reminder_tick",
            started_at = %$started_at,
            subscribers = tracing::field::Empty,
            delivered = tracing::field::Empty,
        )
    };
}

/// Create a span for a fan-out to many recipients
#[macro_export]
macro_rules! fanout_span {
    ($kind:expr, $label:expr) => {
        tracing::info_span!(
            "fanout",
            kind = %$kind,
            label = %$label,
            total = tracing::field::Empty,
            delivered = tracing::field::Empty,
        )
    };
}

/// Create a span for processing one inbound event of a conversation
#[macro_export]
macro_rules! conversation_span {
    ($conversation:expr, $event:expr) => {
        tracing::debug_span!(
            "conversation",
            conversation = %$conversation,
            event = %$event,
        )
    };
}

/// Log application startup
pub fn log_startup() {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Prayer reminder bot starting up");
}

/// Log a prayer reminder delivered to one subscriber
pub fn log_reminder_sent(subscriber: &str, prayer: &str, region: &str) {
    tracing::debug!(
        subscriber = %subscriber,
        prayer = %prayer,
        region = %region,
        "Prayer reminder sent"
    );
}

/// Log the outcome of a fan-out
pub fn log_fanout_summary(kind: &str, label: &str, delivered: usize, total: usize, errors: usize) {
    if errors == 0 {
        tracing::info!(
            kind = %kind,
            label = %label,
            delivered,
            total,
            "Fan-out completed"
        );
    } else {
        tracing::warn!(
            kind = %kind,
            label = %label,
            delivered,
            total,
            errors,
            "Fan-out completed with errors"
        );
    }
}

/// Log a delivery that failed for a single recipient
pub fn log_delivery_failure(recipient: &str, context: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(
        recipient = %recipient,
        context = %context,
        error = %error,
        "Delivery failed"
    );
}

/// Log a prayer-time lookup failure
pub fn log_provider_failure(region: &str, affected: usize, error: &dyn std::fmt::Display) {
    tracing::warn!(
        region = %region,
        affected,
        error = %error,
        "Prayer time lookup failed, skipping region until next tick"
    );
}

/// Log a conversation session transition
pub fn log_session_transition(conversation: &str, from: Option<&str>, to: Option<&str>) {
    tracing::info!(
        conversation = %conversation,
        from = from.unwrap_or("Idle"),
        to = to.unwrap_or("Idle"),
        "Session transition"
    );
}

/// Log error with context
pub fn log_error(error: &dyn std::fmt::Display, context: &str, conversation: Option<&str>) {
    tracing::error!(
        error = %error,
        context = %context,
        conversation = ?conversation,
        "Application error occurred"
    );
}
