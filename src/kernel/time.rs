use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Mutex;

/// Display timezone used when nothing else is configured.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Rome;

const WEEKDAY_ABBR: [&str; 7] = ["lun", "mar", "mer", "gio", "ven", "sab", "dom"];

/// Source of "now" for handlers and the reminder scheduler.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Attach a timezone to a wall-clock time.
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times inside a
/// spring-forward gap are pushed one hour later.
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz.from_local_datetime(&(naive + Duration::hours(1))).earliest(),
    }
}

/// Epoch seconds (UTC) to local time.
pub fn from_epoch(ts: i64, tz: &Tz) -> Option<DateTime<Tz>> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.with_timezone(tz))
}

/// `dd/mm/YYYY HH:MM`
pub fn format_short(dt: &DateTime<Tz>) -> String {
    dt.format("%d/%m/%Y %H:%M").to_string()
}

/// `ven 12/03/2027 15:00 — Riunione Budget`, in local time.
pub fn format_event_line(title: &str, ts: i64, tz: &Tz) -> String {
    match from_epoch(ts, tz) {
        Some(dt) => {
            let wd = WEEKDAY_ABBR[dt.weekday().num_days_from_monday() as usize];
            format!("{} {} — {}", wd, format_short(&dt), title)
        }
        None => format!("{} — {}", ts, title),
    }
}
