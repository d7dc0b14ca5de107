use crate::kernel::event::{ChatId, EventId, UserId};
use crate::memory::types::{EventRecord, EventSnapshot};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("event {0} not found")]
    NotFound(EventId),
}

/// Durable event table.
/// Every listing is ordered by start instant, ascending, and only contains
/// events starting at or after `cutoff`.
pub trait EventStore {
    fn insert(&mut self, owner: UserId, chat: ChatId, title: &str, start_ts: i64) -> Result<EventId, StoreError>;
    fn get(&self, id: EventId) -> Result<Option<EventRecord>, StoreError>;
    fn list_future_by_owner(&self, owner: UserId, cutoff: i64) -> Result<Vec<EventSnapshot>, StoreError>;
    /// Case-insensitive containment on the title.
    fn find_by_title_substring(&self, owner: UserId, query: &str, cutoff: i64) -> Result<Vec<EventSnapshot>, StoreError>;
    /// All owners. Used to rebuild reminders at boot.
    fn list_all_future(&self, cutoff: i64) -> Result<Vec<EventRecord>, StoreError>;
    fn update_start(&mut self, id: EventId, new_start_ts: i64) -> Result<(), StoreError>;
    fn update_title(&mut self, id: EventId, new_title: &str) -> Result<(), StoreError>;
    fn delete(&mut self, id: EventId) -> Result<(), StoreError>;
}

/// Vec-backed store for tests and the console binary.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    entries: Vec<EventRecord>,
    next_id: i64,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn future_sorted<'a>(&'a self, cutoff: i64) -> Vec<&'a EventRecord> {
        let mut out: Vec<&EventRecord> = self.entries.iter().filter(|e| e.start_ts >= cutoff).collect();
        out.sort_by_key(|e| (e.start_ts, e.id));
        out
    }

    fn entry_mut(&mut self, id: EventId) -> Result<&mut EventRecord, StoreError> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}

impl EventStore for InMemoryEventStore {
    fn insert(&mut self, owner: UserId, chat: ChatId, title: &str, start_ts: i64) -> Result<EventId, StoreError> {
        self.next_id += 1;
        let id = EventId(self.next_id);
        let now = Utc::now().timestamp();
        self.entries.push(EventRecord {
            id,
            owner,
            chat,
            title: title.trim().to_string(),
            start_ts,
            created_ts: now,
            updated_ts: now,
        });
        Ok(id)
    }

    fn get(&self, id: EventId) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.entries.iter().find(|e| e.id == id).cloned())
    }

    fn list_future_by_owner(&self, owner: UserId, cutoff: i64) -> Result<Vec<EventSnapshot>, StoreError> {
        Ok(self
            .future_sorted(cutoff)
            .into_iter()
            .filter(|e| e.owner == owner)
            .map(EventRecord::snapshot)
            .collect())
    }

    fn find_by_title_substring(&self, owner: UserId, query: &str, cutoff: i64) -> Result<Vec<EventSnapshot>, StoreError> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .future_sorted(cutoff)
            .into_iter()
            .filter(|e| e.owner == owner && e.title.to_lowercase().contains(&needle))
            .map(EventRecord::snapshot)
            .collect())
    }

    fn list_all_future(&self, cutoff: i64) -> Result<Vec<EventRecord>, StoreError> {
        Ok(self.future_sorted(cutoff).into_iter().cloned().collect())
    }

    fn update_start(&mut self, id: EventId, new_start_ts: i64) -> Result<(), StoreError> {
        let entry = self.entry_mut(id)?;
        entry.start_ts = new_start_ts;
        entry.updated_ts = Utc::now().timestamp();
        Ok(())
    }

    fn update_title(&mut self, id: EventId, new_title: &str) -> Result<(), StoreError> {
        let entry = self.entry_mut(id)?;
        entry.title = new_title.trim().to_string();
        entry.updated_ts = Utc::now().timestamp();
        Ok(())
    }

    fn delete(&mut self, id: EventId) -> Result<(), StoreError> {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        if self.entries.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS events (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL,
  chat_id INTEGER NOT NULL,
  title TEXT NOT NULL,
  start_ts INTEGER NOT NULL,
  created_ts INTEGER NOT NULL,
  updated_ts INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_user_start ON events(user_id, start_ts);
";

/// SQLite-backed store. One connection, owned by the dispatcher.
pub struct SqliteEventStore {
    conn: Connection,
}

impl SqliteEventStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(path)?;
        let _mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        info!(path = %path.display(), "event store opened");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn query_snapshots(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<EventSnapshot>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(EventSnapshot {
                id: EventId(row.get(0)?),
                title: row.get(1)?,
                start_ts: row.get(2)?,
            })
        })?;
        let out = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }

    fn expect_one(&self, changed: usize, id: EventId) -> Result<(), StoreError> {
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRecord> {
    Ok(EventRecord {
        id: EventId(row.get(0)?),
        owner: UserId(row.get(1)?),
        chat: ChatId(row.get(2)?),
        title: row.get(3)?,
        start_ts: row.get(4)?,
        created_ts: row.get(5)?,
        updated_ts: row.get(6)?,
    })
}

/// Escape LIKE wildcards so user text matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl EventStore for SqliteEventStore {
    fn insert(&mut self, owner: UserId, chat: ChatId, title: &str, start_ts: i64) -> Result<EventId, StoreError> {
        let now = Utc::now().timestamp();
        self.conn.execute(
            "INSERT INTO events (user_id, chat_id, title, start_ts, created_ts, updated_ts) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![owner.0, chat.0, title.trim(), start_ts, now, now],
        )?;
        Ok(EventId(self.conn.last_insert_rowid()))
    }

    fn get(&self, id: EventId) -> Result<Option<EventRecord>, StoreError> {
        let record = self
            .conn
            .query_row(
                "SELECT id, user_id, chat_id, title, start_ts, created_ts, updated_ts FROM events WHERE id = ?1",
                params![id.0],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn list_future_by_owner(&self, owner: UserId, cutoff: i64) -> Result<Vec<EventSnapshot>, StoreError> {
        self.query_snapshots(
            "SELECT id, title, start_ts FROM events WHERE user_id = ?1 AND start_ts >= ?2 ORDER BY start_ts ASC, id ASC",
            params![owner.0, cutoff],
        )
    }

    fn find_by_title_substring(&self, owner: UserId, query: &str, cutoff: i64) -> Result<Vec<EventSnapshot>, StoreError> {
        self.query_snapshots(
            "SELECT id, title, start_ts FROM events WHERE user_id = ?1 AND start_ts >= ?2 AND title LIKE ?3 ESCAPE '\\' ORDER BY start_ts ASC, id ASC",
            params![owner.0, cutoff, like_pattern(query)],
        )
    }

    fn list_all_future(&self, cutoff: i64) -> Result<Vec<EventRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, chat_id, title, start_ts, created_ts, updated_ts FROM events WHERE start_ts >= ?1 ORDER BY start_ts ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![cutoff], record_from_row)?;
        let out = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }

    fn update_start(&mut self, id: EventId, new_start_ts: i64) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE events SET start_ts = ?1, updated_ts = ?2 WHERE id = ?3",
            params![new_start_ts, Utc::now().timestamp(), id.0],
        )?;
        self.expect_one(changed, id)
    }

    fn update_title(&mut self, id: EventId, new_title: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE events SET title = ?1, updated_ts = ?2 WHERE id = ?3",
            params![new_title.trim(), Utc::now().timestamp(), id.0],
        )?;
        self.expect_one(changed, id)
    }

    fn delete(&mut self, id: EventId) -> Result<(), StoreError> {
        let changed = self.conn.execute("DELETE FROM events WHERE id = ?1", params![id.0])?;
        self.expect_one(changed, id)
    }
}
