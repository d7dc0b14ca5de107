use serde::{Deserialize, Serialize};
use std::fmt;

/// Telegram user id (numeric). Owns events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric). Where replies and reminders go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// Opaque storage id of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pending-choice state is scoped to one user inside one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub chat: ChatId,
    pub user: UserId,
}

/// A text message coming from a transport.
#[derive(Debug, Clone)]
pub struct InputEvent {
    pub source: String,
    pub user: UserId,
    pub chat: ChatId,
    pub text: String,
}

impl InputEvent {
    pub fn text(source: &str, user: UserId, chat: ChatId, text: &str) -> Self {
        Self {
            source: source.to_string(),
            user,
            chat,
            text: text.to_string(),
        }
    }

    pub fn conversation(&self) -> ConversationKey {
        ConversationKey {
            chat: self.chat,
            user: self.user,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    Markdown,
}

/// Outgoing message produced by the dispatcher. The driver delivers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub chat: ChatId,
    pub text: String,
    pub format: TextFormat,
}

impl Reply {
    pub fn plain(chat: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat,
            text: text.into(),
            format: TextFormat::Plain,
        }
    }

    pub fn markdown(chat: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat,
            text: text.into(),
            format: TextFormat::Markdown,
        }
    }
}
