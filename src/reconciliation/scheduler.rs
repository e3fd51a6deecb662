//! Recurring schedules for the reconciliation sweep
//!
//! Two independent cron jobs invoke the same idempotent sweep: a 2-minute
//! primary pass and an hourly backup pass. Correctness does not depend on
//! which one observes a row first; the restoration ledger absorbs overlap.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::reconciliation::ReconciliationService;

/// Cron expression for the primary sweep (every 2 minutes)
const PRIMARY_SCHEDULE: &str = "0 */2 * * * *";

/// Cron expression for the backup sweep (hourly)
const BACKUP_SCHEDULE: &str = "0 0 * * * *";

/// Start the reconciliation schedules. Returns the scheduler handle so the
/// caller can keep it alive for the lifetime of the process.
pub async fn start_scheduler(
    service: Arc<ReconciliationService>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let primary = service.clone();
    scheduler
        .add(Job::new_async(PRIMARY_SCHEDULE, move |_id, _sched| {
            let service = primary.clone();
            Box::pin(async move {
                tracing::debug!("running reconciliation sweep");
                service.run_sweep().await;
            })
        })?)
        .await?;

    let backup = service;
    scheduler
        .add(Job::new_async(BACKUP_SCHEDULE, move |_id, _sched| {
            let service = backup.clone();
            Box::pin(async move {
                tracing::info!("running hourly backup reconciliation pass");
                service.run_sweep().await;
            })
        })?)
        .await?;

    scheduler.start().await?;

    tracing::info!(
        primary = PRIMARY_SCHEDULE,
        backup = BACKUP_SCHEDULE,
        "reconciliation scheduler started"
    );

    Ok(scheduler)
}
