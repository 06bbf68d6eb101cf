//! Scheduled jobs
//!
//! The reminder tick runs every minute, each dua slot once a day at its
//! clock time, and session eviction every minute when an idle timeout is set.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::models::{DuaSlot, DuaSlots};
use crate::services::dua_dispatch_service::DuaDispatchService;
use crate::services::reminder_service::ReminderService;
use crate::services::scheduling_service::{
    SchedulingError, SchedulingResult, SchedulingService, TaskContext, TaskHandler,
};
use crate::services::session_service::SessionStore;
use crate::services::time_provider::TimeProvider;
use crate::services::BotServices;

pub const REMINDER_TICK_CRON: &str = "0 * * * * *";
pub const SESSION_EVICTION_CRON: &str = "30 * * * * *";

fn failed(error: impl std::fmt::Display) -> SchedulingError {
    SchedulingError::TaskExecutionFailed {
        message: error.to_string(),
    }
}

/// Runs one reminder tick; a tick still in progress makes the next one skip
pub struct ReminderTickTask {
    reminders: Arc<ReminderService>,
    running: Mutex<()>,
}

impl ReminderTickTask {
    pub fn new(reminders: Arc<ReminderService>) -> Self {
        Self {
            reminders,
            running: Mutex::new(()),
        }
    }
}

#[async_trait]
impl TaskHandler for ReminderTickTask {
    async fn execute(&self, context: &TaskContext) -> SchedulingResult<()> {
        let Ok(_running) = self.running.try_lock() else {
            warn!(job = %context.job_name, "Previous reminder tick still running, skipping");
            return Ok(());
        };
        self.reminders.tick().await.map(|_| ()).map_err(failed)
    }
}

/// Sends the daily dua to one slot's subscribers
pub struct DuaSlotTask {
    duas: Arc<DuaDispatchService>,
    slot: DuaSlot,
}

impl DuaSlotTask {
    pub fn new(duas: Arc<DuaDispatchService>, slot: DuaSlot) -> Self {
        Self { duas, slot }
    }
}

#[async_trait]
impl TaskHandler for DuaSlotTask {
    async fn execute(&self, _context: &TaskContext) -> SchedulingResult<()> {
        self.duas.dispatch_slot(&self.slot).await.map(|_| ()).map_err(failed)
    }
}

/// Drops sessions left unfinished for longer than `max_age`
pub struct SessionEvictionTask {
    sessions: SessionStore,
    time_provider: Arc<dyn TimeProvider>,
    max_age: chrono::Duration,
}

impl SessionEvictionTask {
    pub fn new(sessions: SessionStore, time_provider: Arc<dyn TimeProvider>, max_age: chrono::Duration) -> Self {
        Self {
            sessions,
            time_provider,
            max_age,
        }
    }
}

#[async_trait]
impl TaskHandler for SessionEvictionTask {
    async fn execute(&self, _context: &TaskContext) -> SchedulingResult<()> {
        let evicted = self.sessions.evict_idle(self.time_provider.now_utc(), self.max_age);
        if evicted > 0 {
            info!(evicted, remaining = self.sessions.len(), "Evicted idle sessions");
        }
        Ok(())
    }
}

/// Registers every recurring job on a started scheduler. Returns the job count.
pub async fn register_jobs(
    scheduler: &SchedulingService,
    services: &BotServices,
    slots: &DuaSlots,
    time_provider: Arc<dyn TimeProvider>,
    session_idle_timeout: Option<chrono::Duration>,
) -> SchedulingResult<usize> {
    let mut registered = 0;

    scheduler
        .schedule_task(
            "reminder-tick",
            REMINDER_TICK_CRON,
            Arc::new(ReminderTickTask::new(Arc::clone(&services.reminders))),
        )
        .await?;
    registered += 1;

    for slot in slots.iter() {
        scheduler
            .schedule_task(
                &format!("dua-{slot}"),
                &slot.cron_expression(),
                Arc::new(DuaSlotTask::new(Arc::clone(&services.duas), *slot)),
            )
            .await?;
        registered += 1;
    }

    if let Some(max_age) = session_idle_timeout {
        let task = SessionEvictionTask::new(services.sessions.sessions().clone(), time_provider, max_age);
        scheduler
            .schedule_task("session-eviction", SESSION_EVICTION_CRON, Arc::new(task))
            .await?;
        registered += 1;
    }

    info!(jobs = registered, "Recurring jobs registered");
    Ok(registered)
}
