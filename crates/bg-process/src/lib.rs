use std::sync::Arc;

use async_trait::async_trait;
use eyre::{eyre, Error, Result};
use ledger::{Ledger, Notifier};
use log::{error, info};
use process::reminders::RemindersBg;
use tokio_cron_scheduler::{Job, JobScheduler};

pub mod process;

/// A recurring background job. `CRON` is an english schedule phrase
/// understood by the scheduler.
#[async_trait]
pub trait Task: Clone + Send + Sync + 'static {
    const NAME: &'static str;
    const CRON: &'static str;

    async fn process(&mut self) -> Result<(), Error>;
}

/// Registers all background tasks and starts the scheduler. The returned
/// handle keeps the jobs alive.
pub async fn start(ledger: Ledger, notifier: Arc<dyn Notifier>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .map_err(|err| eyre!("Failed to create scheduler: {}", err))?;

    schedule(&scheduler, RemindersBg::new(ledger, notifier)).await?;

    scheduler
        .start()
        .await
        .map_err(|err| eyre!("Failed to start scheduler: {}", err))?;
    Ok(scheduler)
}

async fn schedule<T: Task>(scheduler: &JobScheduler, task: T) -> Result<()> {
    let job = Job::new_async(T::CRON, move |_id, _scheduler| {
        let mut task = task.clone();
        Box::pin(async move {
            info!("Running task {}", T::NAME);
            if let Err(err) = task.process().await {
                error!("Task {} failed: {:#}", T::NAME, err);
            }
        })
    })
    .map_err(|err| eyre!("Failed to build job {}: {}", T::NAME, err))?;

    scheduler
        .add(job)
        .await
        .map_err(|err| eyre!("Failed to schedule job {}: {}", T::NAME, err))?;
    Ok(())
}
