use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::kernel::event::{ChatId, Reply, TextFormat};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("http transport failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telegram rejected the request: {0}")]
    Api(String),
    #[error("console write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Outbound side of a transport. Used by the reactor for replies and by the
/// reminder scheduler for notifications. Failures are reported, never retried here.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send(&self, chat: ChatId, text: &str) -> Result<(), DeliveryError>;

    async fn send_markdown(&self, chat: ChatId, text: &str) -> Result<(), DeliveryError> {
        self.send(chat, text).await
    }

    async fn deliver(&self, reply: &Reply) -> Result<(), DeliveryError> {
        match reply.format {
            TextFormat::Plain => self.send(reply.chat, &reply.text).await,
            TextFormat::Markdown => self.send_markdown(reply.chat, &reply.text).await,
        }
    }
}

/// Writes every message to stdout.
#[derive(Debug, Default)]
pub struct ConsoleDelivery {
    out: Mutex<Option<tokio::io::Stdout>>,
}

impl ConsoleDelivery {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Delivery for ConsoleDelivery {
    async fn send(&self, chat: ChatId, text: &str) -> Result<(), DeliveryError> {
        let mut guard = self.out.lock().await;
        let out = guard.get_or_insert_with(tokio::io::stdout);
        out.write_all(format!("[{}] {}\n", chat, text).as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }
}
