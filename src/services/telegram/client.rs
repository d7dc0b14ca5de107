use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{ApiResponse, GetUpdates, SendMessage, Update};
use crate::kernel::event::{ChatId, InputEvent};
use crate::services::delivery::{Delivery, DeliveryError};

const API_BASE: &str = "https://api.telegram.org";
/// Added on top of the long-poll timeout for the HTTP request itself.
const HTTP_SLACK: Duration = Duration::from_secs(10);
/// Pause after a failed poll.
const RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Thin Bot API client: long polling in, `sendMessage` out.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(API_BASE, token)
    }

    pub fn with_base_url(base: &str, token: &str) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: format!("{}/bot{}", base.trim_end_matches('/'), token),
        }
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, DeliveryError> {
        let response: ApiResponse<T> = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .timeout(timeout)
            .json(body)
            .send()
            .await?
            .json()
            .await?;

        match response {
            ApiResponse { ok: true, result: Some(result), .. } => Ok(result),
            ApiResponse { description, .. } => Err(DeliveryError::Api(
                description.unwrap_or_else(|| format!("{} failed", method)),
            )),
        }
    }

    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, DeliveryError> {
        let body = GetUpdates {
            offset,
            timeout: timeout_secs,
            allowed_updates: vec!["message"],
        };
        self.call("getUpdates", &body, Duration::from_secs(timeout_secs) + HTTP_SLACK)
            .await
    }

    pub async fn send_message(&self, chat: ChatId, text: &str, parse_mode: Option<&str>) -> Result<(), DeliveryError> {
        let body = SendMessage {
            chat_id: chat.0,
            text,
            parse_mode,
        };
        let _: serde_json::Value = self.call("sendMessage", &body, HTTP_SLACK).await?;
        Ok(())
    }

    /// Long-polls until cancelled, pushing text messages into the reactor inbox.
    pub async fn poll(&self, inbox: mpsc::Sender<InputEvent>, timeout_secs: u64, shutdown: CancellationToken) {
        let mut offset = 0;
        info!(timeout_secs, "telegram polling started");

        loop {
            let batch = tokio::select! {
                _ = shutdown.cancelled() => break,
                batch = self.get_updates(offset, timeout_secs) => batch,
            };

            let updates = match batch {
                Ok(updates) => updates,
                Err(e) => {
                    warn!("getUpdates failed: {}", e);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(RETRY_BACKOFF) => continue,
                    }
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(input) = update.into_input() else {
                    continue;
                };
                debug!(chat_id = %input.chat, user_id = %input.user, "update received");
                if inbox.send(input).await.is_err() {
                    info!("reactor inbox closed, polling stops");
                    return;
                }
            }
        }
        info!("telegram polling stopped");
    }
}

#[async_trait]
impl Delivery for TelegramClient {
    async fn send(&self, chat: ChatId, text: &str) -> Result<(), DeliveryError> {
        self.send_message(chat, text, None).await
    }

    /// Titles may contain characters Telegram refuses as Markdown; those go out plain.
    async fn send_markdown(&self, chat: ChatId, text: &str) -> Result<(), DeliveryError> {
        match self.send_message(chat, text, Some("Markdown")).await {
            Err(DeliveryError::Api(reason)) => {
                warn!(chat_id = %chat, "markdown rejected ({}), resending plain", reason);
                self.send_message(chat, text, None).await
            }
            other => other,
        }
    }
}
