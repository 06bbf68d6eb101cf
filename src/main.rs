//! Prayer reminder bot server: webhook listener plus scheduled fan-outs

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use prayer_reminder_bot::api::{create_router, WebhookState};
use prayer_reminder_bot::config::Config;
use prayer_reminder_bot::database::DatabaseManager;
use prayer_reminder_bot::logging::{init_logging, log_startup};
use prayer_reminder_bot::messenger::TelegramMessenger;
use prayer_reminder_bot::models::DuaSlots;
use prayer_reminder_bot::prayer_times::HttpPrayerTimeProvider;
use prayer_reminder_bot::services::task_handlers::register_jobs;
use prayer_reminder_bot::services::{
    BotContext, BotServices, RegionService, SchedulingService, SystemTimeProvider, TimeProvider,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;

    init_logging(&config.log_level, config.log_format);
    log_startup();
    config.log_config();

    // Storage is the only hard dependency at startup
    let database = DatabaseManager::new(&config.database_url).await?;
    database.migrate().await?;

    let settings = config.delivery_settings();
    let http_timeout = settings.external_timeout + Duration::from_secs(1);
    let messenger = Arc::new(TelegramMessenger::new(&config.bot_token, http_timeout)?);
    let provider = Arc::new(HttpPrayerTimeProvider::new(http_timeout)?);
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider::new());

    let bot_username = match messenger.get_me().await {
        Ok(username) => username,
        Err(e) => {
            warn!(error = %e, "Could not fetch bot profile, library heading stays generic");
            None
        }
    };

    let dua_slots = DuaSlots::default();
    let context = BotContext {
        store: Arc::new(database),
        provider,
        messenger: messenger.clone(),
        regions: Arc::new(RegionService::builtin(config.fallback_timezone)),
        dua_slots: dua_slots.clone(),
        admins: Arc::new(config.admin_set()),
        time_provider: Arc::clone(&time_provider),
        reference_timezone: config.reference_timezone,
        settings,
    };
    let services = BotServices::build(&context, bot_username);

    let scheduler = SchedulingService::new(config.reference_timezone, Arc::clone(&time_provider));
    scheduler.start().await?;
    register_jobs(
        &scheduler,
        &services,
        &dua_slots,
        time_provider,
        config.session_idle_timeout(),
    )
    .await?;

    if let Some(url) = config.webhook_url() {
        if let Err(e) = messenger.set_webhook(&url).await {
            warn!(error = %e, "Webhook registration failed, keeping the existing one");
        }
    }

    let app = create_router(WebhookState::new(&config.bot_token, services.dispatcher.clone()));
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Webhook listener started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await?;
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
