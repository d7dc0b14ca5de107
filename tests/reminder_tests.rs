mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agenda::kernel::event::{ChatId, EventId};
use agenda::kernel::scheduler::{fire_decision, FireDecision, MISFIRE_GRACE};
use agenda::kernel::time::{Clock, FixedClock, DEFAULT_TIMEZONE};
use agenda::memory::{EventStore, InMemoryEventStore};
use agenda::services::{Delivery, DeliveryError};
use agenda::ReminderScheduler;
use async_trait::async_trait;
use common::{rome_ts, wednesday_morning, RecordingDelivery, ALICE, BOB, CHAT};
use tokio::time::Instant;

fn scheduler_with(delivery: Arc<dyn Delivery>) -> ReminderScheduler {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(wednesday_morning()));
    ReminderScheduler::new(delivery, clock, DEFAULT_TIMEZONE)
}

fn minutes_from_now(m: i64) -> i64 {
    wednesday_morning().timestamp() + m * 60
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Counts overlapping deliveries; each one takes a second.
#[derive(Default)]
struct SlowDelivery {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delivered: AtomicUsize,
}

#[async_trait]
impl Delivery for SlowDelivery {
    async fn send(&self, _chat: ChatId, _text: &str) -> Result<(), DeliveryError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct FailingDelivery {
    attempts: AtomicUsize,
}

#[async_trait]
impl Delivery for FailingDelivery {
    async fn send(&self, _chat: ChatId, _text: &str) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DeliveryError::Api("chat not found".to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn test_reminder_fires_lead_minutes_before_start() {
    let delivery = Arc::new(RecordingDelivery::default());
    let scheduler = scheduler_with(delivery.clone());

    let start = rome_ts(2027, 3, 10, 8, 20);
    let job = scheduler
        .schedule_event_reminder(EventId(1), CHAT, "Riunione Budget", start)
        .expect("lead instant is in the future");
    assert_eq!(job.fire_at.timestamp(), start - 600);
    assert_eq!(job.text, "⏰ Promemoria: 'Riunione Budget' il 10/03/2027 08:20");

    tokio::time::sleep(Duration::from_secs(9 * 60)).await;
    settle().await;
    assert!(delivery.messages().is_empty(), "too early");

    tokio::time::sleep(Duration::from_secs(2 * 60)).await;
    settle().await;
    assert_eq!(delivery.messages(), vec![(CHAT, job.text.clone())]);
    assert!(scheduler.pending_jobs().is_empty(), "a fired job is forgotten");
}

#[tokio::test(start_paused = true)]
async fn test_past_lead_instant_is_silently_skipped() {
    let delivery = Arc::new(RecordingDelivery::default());
    let scheduler = scheduler_with(delivery.clone());

    assert!(scheduler
        .schedule_event_reminder(EventId(1), CHAT, "Subito", minutes_from_now(5))
        .is_none());
    assert!(scheduler
        .schedule_event_reminder(EventId(2), CHAT, "Esatto", minutes_from_now(10))
        .is_none(), "fire instant equal to now is not strictly future");
    assert!(scheduler.pending_jobs().is_empty());

    tokio::time::sleep(Duration::from_secs(3600)).await;
    settle().await;
    assert!(delivery.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rescheduling_replaces_previous_job() {
    let delivery = Arc::new(RecordingDelivery::default());
    let scheduler = scheduler_with(delivery.clone());

    let first = scheduler
        .schedule_event_reminder(EventId(7), CHAT, "Dentista", minutes_from_now(20))
        .expect("scheduled");
    let second = scheduler
        .schedule_event_reminder(EventId(7), CHAT, "Dentista", minutes_from_now(60))
        .expect("scheduled");
    assert_ne!(first.id, second.id);
    assert_eq!(scheduler.pending_jobs(), vec![second.clone()]);

    tokio::time::sleep(Duration::from_secs(15 * 60)).await;
    settle().await;
    assert!(delivery.messages().is_empty(), "the stale reminder never fires");

    tokio::time::sleep(Duration::from_secs(40 * 60)).await;
    settle().await;
    assert_eq!(delivery.messages().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_drops_job() {
    let delivery = Arc::new(RecordingDelivery::default());
    let scheduler = scheduler_with(delivery.clone());

    scheduler.schedule_event_reminder(EventId(3), CHAT, "Yoga", minutes_from_now(30));
    assert!(scheduler.cancel(EventId(3)));
    assert!(!scheduler.cancel(EventId(3)), "nothing left to cancel");

    tokio::time::sleep(Duration::from_secs(3600)).await;
    settle().await;
    assert!(delivery.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_restore_reschedules_future_events_only() {
    let delivery = Arc::new(RecordingDelivery::default());
    let scheduler = scheduler_with(delivery.clone());

    let mut store = InMemoryEventStore::new();
    store.insert(ALICE, CHAT, "Ieri", minutes_from_now(-24 * 60)).unwrap();
    store.insert(ALICE, CHAT, "Tra poco", minutes_from_now(5)).unwrap();
    let later = store.insert(BOB, ChatId(77), "Più tardi", minutes_from_now(90)).unwrap();
    let tomorrow = store.insert(ALICE, CHAT, "Domani", minutes_from_now(24 * 60)).unwrap();

    let restored = scheduler.restore(&store).unwrap();
    assert_eq!(restored, 2);

    let jobs = scheduler.pending_jobs();
    assert_eq!(jobs.iter().map(|j| j.event).collect::<Vec<_>>(), vec![later, tomorrow]);
    assert_eq!(jobs[0].chat, ChatId(77), "reminders go to the event's own chat");
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_deliveries_are_capped() {
    let delivery = Arc::new(SlowDelivery::default());
    let scheduler = scheduler_with(delivery.clone());

    for id in 1..=5 {
        scheduler.schedule_event_reminder(EventId(id), CHAT, "Standup", minutes_from_now(30));
    }

    tokio::time::sleep(Duration::from_secs(20 * 60 + 10)).await;
    settle().await;

    assert_eq!(delivery.max_in_flight.load(Ordering::SeqCst), 3);
    assert_eq!(delivery.delivered.load(Ordering::SeqCst), 5, "a short wait stays within the grace period");
}

#[tokio::test(start_paused = true)]
async fn test_late_job_beyond_grace_is_dropped() {
    let delivery = Arc::new(SlowDelivery::default());
    let scheduler = scheduler_with(delivery.clone()).with_grace(Duration::from_millis(500));

    for id in 1..=4 {
        scheduler.schedule_event_reminder(EventId(id), CHAT, "Standup", minutes_from_now(30));
    }

    tokio::time::sleep(Duration::from_secs(20 * 60 + 10)).await;
    settle().await;

    assert_eq!(delivery.delivered.load(Ordering::SeqCst), 3, "the fourth waited a full second");
    assert!(scheduler.pending_jobs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_delivery_failure_is_not_retried() {
    let delivery = Arc::new(FailingDelivery::default());
    let scheduler = scheduler_with(delivery.clone());

    scheduler.schedule_event_reminder(EventId(1), CHAT, "Cena", minutes_from_now(15));
    tokio::time::sleep(Duration::from_secs(3600)).await;
    settle().await;

    assert_eq!(delivery.attempts.load(Ordering::SeqCst), 1);
    assert!(scheduler.pending_jobs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_custom_lead() {
    let delivery = Arc::new(RecordingDelivery::default());
    let scheduler = scheduler_with(delivery).with_lead(Duration::from_secs(30 * 60));

    let job = scheduler
        .schedule_event_reminder(EventId(1), CHAT, "Treno", minutes_from_now(45))
        .expect("scheduled");
    assert_eq!(job.fire_at.timestamp(), minutes_from_now(15));
    assert!(scheduler
        .schedule_event_reminder(EventId(2), CHAT, "Treno", minutes_from_now(25))
        .is_none());
}

#[test]
fn test_fire_decision_grace() {
    let deadline = Instant::now();
    assert_eq!(fire_decision(deadline, deadline, MISFIRE_GRACE), FireDecision::Fire);
    assert_eq!(
        fire_decision(deadline, deadline + Duration::from_secs(60), MISFIRE_GRACE),
        FireDecision::Fire
    );
    assert_eq!(
        fire_decision(deadline, deadline + Duration::from_secs(61), MISFIRE_GRACE),
        FireDecision::Misfired {
            late: Duration::from_secs(61)
        }
    );
}
