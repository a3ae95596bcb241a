use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Error, Result};
use ledger::{Ledger, Notifier};
use log::info;

use crate::Task;

/// Daily reminder pass over the roster. Already-sent thresholds are
/// recorded on the student, so re-running after a crash or restart sends
/// nothing twice.
#[derive(Clone)]
pub struct RemindersBg {
    ledger: Ledger,
    notifier: Arc<dyn Notifier>,
}

#[async_trait]
impl Task for RemindersBg {
    const NAME: &'static str = "reminders";
    const CRON: &'static str = "every 1 day at 9:00";

    async fn process(&mut self) -> Result<(), Error> {
        let mut session = self.ledger.db.start_session().await?;
        let stats = self
            .ledger
            .reminder_sweep(&mut session, self.notifier.as_ref())
            .await?;
        if stats.intents > 0 {
            info!(
                "Reminders: {} sent, {} failed out of {} due",
                stats.sent, stats.failed, stats.intents
            );
        }
        Ok(())
    }
}

impl RemindersBg {
    pub fn new(ledger: Ledger, notifier: Arc<dyn Notifier>) -> RemindersBg {
        RemindersBg { ledger, notifier }
    }
}
