//! Scheduling Service
//!
//! Wraps the cron scheduler that drives the reminder tick, the daily dua
//! slots and session eviction. Cron expressions use six fields (seconds
//! first) and are evaluated in the reference timezone.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info};
use uuid::Uuid;

use crate::services::time_provider::TimeProvider;

/// Errors that can occur during scheduling operations
#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] JobSchedulerError),

    #[error("Invalid cron expression: {cron_expression}")]
    InvalidCronExpression { cron_expression: String },

    #[error("Task execution failed: {message}")]
    TaskExecutionFailed { message: String },

    #[error("Scheduler not started")]
    SchedulerNotStarted,
}

/// Result type for scheduling operations
pub type SchedulingResult<T> = Result<T, SchedulingError>;

/// A unit of scheduled work
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn execute(&self, context: &TaskContext) -> SchedulingResult<()>;
}

/// Context provided to task handlers during execution
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub job_name: String,
    pub started_at: DateTime<Utc>,
}

/// A registered job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub id: Uuid,
    pub name: String,
    pub cron_expression: String,
}

pub struct SchedulingService {
    scheduler: Arc<Mutex<Option<JobScheduler>>>,
    jobs: Mutex<Vec<ScheduledJob>>,
    timezone: Tz,
    time_provider: Arc<dyn TimeProvider>,
}

impl SchedulingService {
    pub fn new(timezone: Tz, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            scheduler: Arc::new(Mutex::new(None)),
            jobs: Mutex::new(Vec::new()),
            timezone,
            time_provider,
        }
    }

    /// Creates and starts the underlying scheduler
    pub async fn start(&self) -> SchedulingResult<()> {
        let mut guard = self.scheduler.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;
        *guard = Some(scheduler);
        info!(timezone = %self.timezone, "Scheduling service started");
        Ok(())
    }

    /// Stops the scheduler; registered jobs are dropped with it
    pub async fn stop(&self) -> SchedulingResult<()> {
        let mut guard = self.scheduler.lock().await;
        if let Some(mut scheduler) = guard.take() {
            scheduler.shutdown().await?;
            self.jobs.lock().await.clear();
            info!("Scheduling service stopped");
        }
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.scheduler.lock().await.is_some()
    }

    /// Registers `handler` to run on `cron_expression`
    pub async fn schedule_task(
        &self,
        name: &str,
        cron_expression: &str,
        handler: Arc<dyn TaskHandler>,
    ) -> SchedulingResult<Uuid> {
        let guard = self.scheduler.lock().await;
        let scheduler = guard.as_ref().ok_or(SchedulingError::SchedulerNotStarted)?;

        self.validate_cron_expression(cron_expression)?;

        let job_name = name.to_string();
        let time_provider = Arc::clone(&self.time_provider);

        let job = Job::new_async_tz(cron_expression, self.timezone, move |_uuid, _scheduler| {
            let handler = Arc::clone(&handler);
            let context = TaskContext {
                job_name: job_name.clone(),
                started_at: time_provider.now_utc(),
            };

            Box::pin(async move {
                if let Err(e) = handler.execute(&context).await {
                    error!(job = %context.job_name, error = %e, "Scheduled task failed");
                }
            })
        })?;

        let id = scheduler.add(job).await?;
        self.jobs.lock().await.push(ScheduledJob {
            id,
            name: name.to_string(),
            cron_expression: cron_expression.to_string(),
        });

        info!(job = %name, cron = %cron_expression, "Scheduled task");
        Ok(id)
    }

    /// Jobs registered since the scheduler was started
    pub async fn list_scheduled_tasks(&self) -> Vec<ScheduledJob> {
        self.jobs.lock().await.clone()
    }

    fn validate_cron_expression(&self, cron_expression: &str) -> SchedulingResult<()> {
        Job::new_async_tz(cron_expression, self.timezone, |_uuid, _l| Box::pin(async {}))
            .map(|_| ())
            .map_err(|_| SchedulingError::InvalidCronExpression {
                cron_expression: cron_expression.to_string(),
            })
    }
}
