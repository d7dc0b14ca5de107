use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::event::{ChatId, EventId};
use super::time::{format_short, from_epoch, Clock};
use crate::memory::{EventStore, StoreError};
use crate::services::delivery::Delivery;

pub const DEFAULT_LEAD: Duration = Duration::from_secs(10 * 60);
pub const MISFIRE_GRACE: Duration = Duration::from_secs(60);
pub const MAX_CONCURRENT_DELIVERIES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

/// A one-shot reminder registered for an event.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderJob {
    pub id: JobId,
    pub event: EventId,
    pub chat: ChatId,
    pub text: String,
    pub fire_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireDecision {
    Fire,
    /// Woke up too late; the reminder is dropped.
    Misfired { late: Duration },
}

/// Pure misfire rule: a job may still run up to `grace` after its deadline.
pub fn fire_decision(deadline: Instant, now: Instant, grace: Duration) -> FireDecision {
    let late = now.saturating_duration_since(deadline);
    if late <= grace {
        FireDecision::Fire
    } else {
        FireDecision::Misfired { late }
    }
}

struct JobHandle {
    job: ReminderJob,
    task: JoinHandle<()>,
}

type JobTable = Arc<Mutex<HashMap<EventId, JobHandle>>>;

/// One-shot reminder timers, one per event.
///
/// Rescheduling an event aborts its previous job; cancelling removes it.
/// Jobs live in memory only and are rebuilt from the store at boot.
pub struct ReminderScheduler {
    delivery: Arc<dyn Delivery>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    lead: Duration,
    grace: Duration,
    permits: Arc<Semaphore>,
    jobs: JobTable,
}

impl ReminderScheduler {
    pub fn new(delivery: Arc<dyn Delivery>, clock: Arc<dyn Clock>, tz: Tz) -> Self {
        Self {
            delivery,
            clock,
            tz,
            lead: DEFAULT_LEAD,
            grace: MISFIRE_GRACE,
            permits: Arc::new(Semaphore::new(MAX_CONCURRENT_DELIVERIES)),
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_lead(mut self, lead: Duration) -> Self {
        self.lead = lead;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn lead(&self) -> Duration {
        self.lead
    }

    pub fn render(&self, title: &str, start_ts: i64) -> String {
        let when = from_epoch(start_ts, &self.tz)
            .map(|dt| format_short(&dt))
            .unwrap_or_else(|| start_ts.to_string());
        format!("⏰ Promemoria: '{}' il {}", title, when)
    }

    /// Registers a reminder at `start - lead`. Returns `None`, silently, when that
    /// instant is not strictly in the future. Any earlier job for `event` is aborted.
    /// Must be called from inside a tokio runtime.
    pub fn schedule_event_reminder(
        &self,
        event: EventId,
        chat: ChatId,
        title: &str,
        start_ts: i64,
    ) -> Option<ReminderJob> {
        // the old instant is stale either way
        self.cancel(event);

        let start = DateTime::<Utc>::from_timestamp(start_ts, 0)?;
        let lead = chrono::Duration::from_std(self.lead).ok()?;
        let fire_at = start - lead;
        let now = self.clock.now();
        if fire_at <= now {
            debug!(event_id = %event, "reminder instant already past, not scheduled");
            return None;
        }

        let delay = (fire_at - now).to_std().ok()?;
        let job = ReminderJob {
            id: JobId::new(),
            event,
            chat,
            text: self.render(title, start_ts),
            fire_at,
        };

        // held across the spawn so the task cannot finish before it is registered
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let task = tokio::spawn(run_job(
            job.clone(),
            Instant::now() + delay,
            self.grace,
            self.delivery.clone(),
            self.permits.clone(),
            self.jobs.clone(),
        ));
        jobs.insert(event, JobHandle { job: job.clone(), task });

        info!(event_id = %event, job_id = %job.id.0, fire_at = %fire_at, "reminder scheduled");
        Some(job)
    }

    /// Drops the pending reminder of `event`, if any.
    pub fn cancel(&self, event: EventId) -> bool {
        let removed = self.jobs.lock().unwrap_or_else(|e| e.into_inner()).remove(&event);
        match removed {
            Some(handle) => {
                handle.task.abort();
                debug!(event_id = %event, job_id = %handle.job.id.0, "reminder cancelled");
                true
            }
            None => false,
        }
    }

    /// Re-schedules every future event in the store. Returns how many jobs were created.
    pub fn restore<S: EventStore + ?Sized>(&self, store: &S) -> Result<usize, StoreError> {
        let now_ts = self.clock.now().timestamp();
        let mut scheduled = 0;
        for record in store.list_all_future(now_ts)? {
            if self
                .schedule_event_reminder(record.id, record.chat, &record.title, record.start_ts)
                .is_some()
            {
                scheduled += 1;
            }
        }
        info!(scheduled, "reminders restored");
        Ok(scheduled)
    }

    /// Jobs not yet fired, earliest first.
    pub fn pending_jobs(&self) -> Vec<ReminderJob> {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let mut pending: Vec<ReminderJob> = jobs.values().map(|h| h.job.clone()).collect();
        pending.sort_by_key(|j| j.fire_at);
        pending
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        for (_, handle) in jobs.drain() {
            handle.task.abort();
        }
    }
}

async fn run_job(
    job: ReminderJob,
    deadline: Instant,
    grace: Duration,
    delivery: Arc<dyn Delivery>,
    permits: Arc<Semaphore>,
    jobs: JobTable,
) {
    tokio::time::sleep_until(deadline).await;

    // closed only if the scheduler is gone
    let Ok(_permit) = permits.acquire().await else {
        return;
    };

    match fire_decision(deadline, Instant::now(), grace) {
        FireDecision::Fire => match delivery.send(job.chat, &job.text).await {
            Ok(()) => info!(event_id = %job.event, job_id = %job.id.0, "reminder delivered"),
            Err(e) => warn!(event_id = %job.event, job_id = %job.id.0, "reminder delivery failed: {}", e),
        },
        FireDecision::Misfired { late } => {
            warn!(event_id = %job.event, job_id = %job.id.0, late_secs = late.as_secs(), "reminder misfired, dropped");
        }
    }

    let mut table = jobs.lock().unwrap_or_else(|e| e.into_inner());
    if table.get(&job.event).is_some_and(|h| h.job.id == job.id) {
        table.remove(&job.event);
    }
}
