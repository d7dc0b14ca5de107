#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use agenda::kernel::event::{ChatId, InputEvent, UserId};
use agenda::kernel::time::{Clock, FixedClock, DEFAULT_TIMEZONE};
use agenda::memory::InMemoryEventStore;
use agenda::services::{Delivery, DeliveryError};
use agenda::{Reactor, ReminderScheduler};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

pub const ALICE: UserId = UserId(101);
pub const BOB: UserId = UserId(202);
pub const CHAT: ChatId = ChatId(-5001);

/// Wednesday 10 March 2027, 08:00 in Rome.
pub fn wednesday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2027, 3, 10, 7, 0, 0).single().expect("valid instant")
}

pub fn rome(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
    DEFAULT_TIMEZONE
        .from_local_datetime(
            &NaiveDate::from_ymd_opt(y, m, d)
                .expect("valid date")
                .and_hms_opt(h, min, 0)
                .expect("valid time"),
        )
        .single()
        .expect("unambiguous local time")
}

pub fn rome_ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
    rome(y, m, d, h, min).timestamp()
}

/// Keeps everything it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingDelivery {
    pub sent: Mutex<Vec<(ChatId, String)>>,
}

impl RecordingDelivery {
    pub fn messages(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Delivery for RecordingDelivery {
    async fn send(&self, chat: ChatId, text: &str) -> Result<(), DeliveryError> {
        self.sent.lock().expect("lock").push((chat, text.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub reactor: Reactor<InMemoryEventStore>,
    pub clock: Arc<FixedClock>,
    pub delivery: Arc<RecordingDelivery>,
}

/// Must be built inside a tokio runtime: reminders spawn tasks.
pub fn harness() -> Harness {
    let clock = Arc::new(FixedClock::new(wednesday_morning()));
    let delivery = Arc::new(RecordingDelivery::default());
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let reminders = ReminderScheduler::new(delivery.clone(), dyn_clock.clone(), DEFAULT_TIMEZONE);
    let reactor = Reactor::new(InMemoryEventStore::new(), reminders, dyn_clock, DEFAULT_TIMEZONE);
    Harness {
        reactor,
        clock,
        delivery,
    }
}

pub fn msg(user: UserId, text: &str) -> InputEvent {
    InputEvent::text("test", user, CHAT, text)
}
