use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use agenda::config::AgendaConfig;
use agenda::kernel::event::{ChatId, InputEvent, UserId};
use agenda::kernel::time::{Clock, SystemClock};
use agenda::memory::{EventStore, InMemoryEventStore, SqliteEventStore};
use agenda::services::{ConsoleDelivery, Delivery};
use agenda::{Reactor, ReminderScheduler};

const CONSOLE_USER: UserId = UserId(1);
const CONSOLE_CHAT: ChatId = ChatId(1);

/// Local driver: stdin lines in, stdout replies out. No bot token needed.
/// `agenda_console [path/to/db.sqlite]`; without a path events live in memory.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let config = AgendaConfig::from_env()?;

    match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            let store = SqliteEventStore::open(&path).with_context(|| format!("opening {}", path.display()))?;
            serve(store, &config).await
        }
        None => serve(InMemoryEventStore::new(), &config).await,
    }
}

async fn serve<S: EventStore>(store: S, config: &AgendaConfig) -> Result<()> {
    let delivery: Arc<dyn Delivery> = Arc::new(ConsoleDelivery::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let reminders =
        ReminderScheduler::new(delivery.clone(), clock.clone(), config.timezone).with_lead(config.reminder_lead);
    let mut reactor = Reactor::new(store, reminders, clock, config.timezone).with_classifier(config.classifier());
    reactor.restore_reminders()?;

    let shutdown = CancellationToken::new();
    let (tx, rx) = mpsc::channel(100);

    // EOF drops the sender; the reactor drains what is queued and stops.
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("Scrivi un messaggio (es. 'metti in agenda domani alle 15 riunione budget'). Ctrl-D per uscire.");

        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            let event = InputEvent::text("console", CONSOLE_USER, CONSOLE_CHAT, &line);
            if let Err(e) = tx.send(event).await {
                tracing::error!("failed to send input: {}", e);
                break;
            }
        }
    });

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        });
    }

    reactor.run(rx, delivery, shutdown).await;
    Ok(())
}
