use serde::{Deserialize, Serialize};

use crate::kernel::event::{ChatId, EventId, UserId};

/// A stored agenda entry. Instants are epoch seconds, UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub owner: UserId,
    pub chat: ChatId,
    pub title: String,
    pub start_ts: i64,
    pub created_ts: i64,
    pub updated_ts: i64,
}

impl EventRecord {
    pub fn snapshot(&self) -> EventSnapshot {
        EventSnapshot {
            id: self.id,
            title: self.title.clone(),
            start_ts: self.start_ts,
        }
    }
}

/// The by-value copy the core works on (candidates, pending choices).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub id: EventId,
    pub title: String,
    pub start_ts: i64,
}
