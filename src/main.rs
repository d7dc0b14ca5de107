use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use agenda::config::AgendaConfig;
use agenda::kernel::time::{Clock, SystemClock};
use agenda::memory::SqliteEventStore;
use agenda::services::{Delivery, TelegramClient};
use agenda::{Reactor, ReminderScheduler};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    // A missing token aborts startup.
    let config = AgendaConfig::from_env()?;
    let token = config.require_token()?;

    let store = SqliteEventStore::open(&config.db_path)
        .with_context(|| format!("opening event store at {}", config.db_path.display()))?;

    let telegram = TelegramClient::new(token);
    let delivery: Arc<dyn Delivery> = Arc::new(telegram.clone());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let reminders =
        ReminderScheduler::new(delivery.clone(), clock.clone(), config.timezone).with_lead(config.reminder_lead);
    let mut reactor = Reactor::new(store, reminders, clock, config.timezone).with_classifier(config.classifier());

    let restored = reactor.restore_reminders().context("restoring reminders")?;
    info!(restored, timezone = %config.timezone, "agenda bot started");

    let shutdown = CancellationToken::new();
    let (tx, rx) = mpsc::channel(100);

    let poller = {
        let shutdown = shutdown.clone();
        let timeout = config.poll_timeout_secs;
        tokio::spawn(async move { telegram.poll(tx, timeout, shutdown).await })
    };

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("ctrl-c received, shutting down");
                    shutdown.cancel();
                }
                Err(e) => warn!("cannot listen for ctrl-c: {}", e),
            }
        });
    }

    reactor.run(rx, delivery, shutdown.clone()).await;
    shutdown.cancel();
    if let Err(e) = poller.await {
        warn!("poller task ended abnormally: {}", e);
    }
    Ok(())
}
