use std::{env, sync::Arc};

use dotenv::dotenv;
use eyre::Context;
use ledger::Notifier;
use log::info;
use model::clock::SystemClock;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    if let Err(err) = dotenv() {
        info!("Failed to load .env file: {}", err);
    }
    pretty_env_logger::init();
    color_eyre::install()?;

    info!("connecting to mongo");
    let mongo_url = env::var("MONGO_URL").context("Failed to get MONGO_URL from env")?;
    let storage = storage::Storage::new(&mongo_url)
        .await
        .context("Failed to create storage")?;

    info!("creating ledger");
    let ledger = ledger::Ledger::new(storage, Arc::new(SystemClock));

    let notifier: Arc<dyn Notifier> =
        Arc::new(mailer::Mailer::from_env().context("Failed to create mailer")?);

    info!("starting background tasks");
    let _scheduler = bg_process::start(ledger, notifier).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("shutting down");
    Ok(())
}
