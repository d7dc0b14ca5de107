//! Temporal extraction for Italian free text.
//!
//! Finds the first date-like expression and the first clock-time expression in
//! a message and combines them into one local instant:
//! - date without a clock time -> default time (09:00)
//! - clock time without a date -> today, or tomorrow if already past
//! - weekday -> next occurrence (today only while still in the future)
//! - day/month without a year -> this year, or next year if already past
//! - "tra 2 ore" / "tra 10 minuti" -> exact offset from now

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Timelike, Weekday};
use chrono_tz::Tz;

use crate::kernel::time::{localize, DEFAULT_TIMEZONE};
use crate::nlp::vocabulary::{
    month_from_word, small_number, weekday_from_word, BARE_CLOCK_RE, CLOCK_RE, IN_DURATION_RE,
    MONTH_DATE_RE, NAMED_TIME_RE, NUMERIC_DATE_RE, PM_HINT_RE, RELATIVE_DAY_RE, WEEKDAY_RE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DatePart {
    Day(NaiveDate),
    Weekday(Weekday),
    /// Sub-day offset from "now"; carries its own time of day.
    Offset(Duration),
}

#[derive(Debug, Clone, Copy)]
struct Found<T> {
    at: usize,
    value: T,
}

fn earliest<T: Copy>(found: impl IntoIterator<Item = Found<T>>) -> Option<Found<T>> {
    found.into_iter().min_by_key(|f| f.at)
}

#[derive(Debug, Clone)]
pub struct TemporalExtractor {
    tz: Tz,
    default_time: NaiveTime,
}

impl Default for TemporalExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

impl TemporalExtractor {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            default_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Best local date-time found in `text`, relative to `now`. Pure.
    pub fn extract(&self, text: &str, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
        let lower = text.to_lowercase();
        let now = now.with_timezone(&self.tz);
        let today = now.date_naive();

        let date = scan_date(&lower, today).map(|f| f.value);
        let time = scan_time(&lower).map(|f| f.value);

        match (date, time) {
            (None, None) => None,
            (Some(DatePart::Offset(offset)), _) => {
                let at = now + offset;
                at.with_second(0).and_then(|t| t.with_nanosecond(0))
            }
            (Some(DatePart::Day(day)), time) => localize(&self.tz, day.and_time(time.unwrap_or(self.default_time))),
            (Some(DatePart::Weekday(weekday)), time) => {
                let time = time.unwrap_or(self.default_time);
                let ahead = (7 + weekday.num_days_from_monday() as i64 - today.weekday().num_days_from_monday() as i64) % 7;
                let day = today + Duration::days(ahead);
                let candidate = localize(&self.tz, day.and_time(time))?;
                if candidate <= now {
                    localize(&self.tz, (day + Duration::days(7)).and_time(time))
                } else {
                    Some(candidate)
                }
            }
            (None, Some(time)) => {
                let candidate = localize(&self.tz, today.and_time(time))?;
                if candidate <= now {
                    localize(&self.tz, (today + Duration::days(1)).and_time(time))
                } else {
                    Some(candidate)
                }
            }
        }
    }

    /// Whether the text carries any recognisable date or clock-time expression.
    pub fn detects(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        let reference = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN);
        scan_date(&lower, reference).is_some() || scan_time(&lower).is_some()
    }

}

fn scan_date(lower: &str, today: NaiveDate) -> Option<Found<DatePart>> {
    let mut found: Vec<Found<DatePart>> = Vec::new();

    if let Some(c) = RELATIVE_DAY_RE.captures(lower) {
        let days = match &c[1] {
            "domani" => 1,
            "dopodomani" => 2,
            _ => 0,
        };
        found.push(Found { at: c.get(0).map_or(0, |m| m.start()), value: DatePart::Day(today + Duration::days(days)) });
    }

    for c in IN_DURATION_RE.captures_iter(lower) {
        let at = c.get(0).map_or(0, |m| m.start());
        if c.get(1).is_some() {
            found.push(Found { at, value: DatePart::Offset(Duration::minutes(30)) });
            break;
        }
        let (Some(n), Some(unit)) = (c.get(2).and_then(|m| small_number(m.as_str())), c.get(3)) else {
            continue;
        };
        let part = match unit.as_str() {
            "minuto" | "minuti" => Some(DatePart::Offset(Duration::minutes(n as i64))),
            "ora" | "ore" => Some(DatePart::Offset(Duration::hours(n as i64))),
            "giorno" | "giorni" => Some(DatePart::Day(today + Duration::days(n as i64))),
            "settimana" | "settimane" => Some(DatePart::Day(today + Duration::weeks(n as i64))),
            "mese" | "mesi" => today.checked_add_months(Months::new(n)).map(DatePart::Day),
            _ => None,
        };
        if let Some(value) = part {
            found.push(Found { at, value });
            break;
        }
    }

    if let Some(c) = WEEKDAY_RE.captures(lower) {
        if let Some(day) = weekday_from_word(&c[1]) {
            found.push(Found { at: c.get(0).map_or(0, |m| m.start()), value: DatePart::Weekday(day) });
        }
    }

    for c in NUMERIC_DATE_RE.captures_iter(lower) {
        let day: u32 = c[1].parse().unwrap_or(0);
        let month: u32 = c[2].parse().unwrap_or(0);
        let year = c.get(3).and_then(|y| y.as_str().parse::<i32>().ok()).map(|y| if y < 100 { 2000 + y } else { y });
        if let Some(date) = calendar_date(day, month, year, today) {
            found.push(Found { at: c.get(0).map_or(0, |m| m.start()), value: DatePart::Day(date) });
            break;
        }
    }

    for c in MONTH_DATE_RE.captures_iter(lower) {
        let day: u32 = c[1].parse().unwrap_or(0);
        let Some(month) = month_from_word(&c[2]) else { continue };
        let year = c.get(3).and_then(|y| y.as_str().parse::<i32>().ok());
        if let Some(date) = calendar_date(day, month, year, today) {
            found.push(Found { at: c.get(0).map_or(0, |m| m.start()), value: DatePart::Day(date) });
            break;
        }
    }

    earliest(found)
}

/// Explicit year is taken as-is; otherwise the next occurrence from `today`.
fn calendar_date(day: u32, month: u32, year: Option<i32>, today: NaiveDate) -> Option<NaiveDate> {
    match year {
        Some(y) => NaiveDate::from_ymd_opt(y, month, day),
        None => {
            let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
            match this_year {
                Some(d) if d >= today => Some(d),
                _ => (1..=4).find_map(|k| NaiveDate::from_ymd_opt(today.year() + k, month, day)),
            }
        }
    }
}

fn scan_time(lower: &str) -> Option<Found<NaiveTime>> {
    let mut found: Vec<Found<NaiveTime>> = Vec::new();
    let afternoon = PM_HINT_RE.is_match(lower);

    for c in CLOCK_RE.captures_iter(lower) {
        let hour: u32 = c[1].parse().unwrap_or(99);
        let mut minute: u32 = c
            .get(2)
            .or_else(|| c.get(3))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        if let Some(fraction) = c.get(4) {
            minute += if fraction.as_str().starts_with("mezz") { 30 } else { 15 };
        }
        let hour = if afternoon && (1..12).contains(&hour) { hour + 12 } else { hour };
        if let Some(t) = NaiveTime::from_hms_opt(hour, minute, 0) {
            found.push(Found { at: c.get(0).map_or(0, |m| m.start()), value: t });
            break;
        }
    }

    for c in BARE_CLOCK_RE.captures_iter(lower) {
        let hour: u32 = c[1].parse().unwrap_or(99);
        let minute: u32 = c[2].parse().unwrap_or(99);
        if let Some(t) = NaiveTime::from_hms_opt(hour, minute, 0) {
            found.push(Found { at: c.get(0).map_or(0, |m| m.start()), value: t });
            break;
        }
    }

    if let Some(c) = NAMED_TIME_RE.captures(lower) {
        let hour = match c.get(1).map(|m| m.as_str()) {
            Some("mezzogiorno") => 12,
            Some("mezzanotte") => 0,
            _ => if afternoon { 13 } else { 1 },
        };
        if let Some(t) = NaiveTime::from_hms_opt(hour, 0, 0) {
            found.push(Found { at: c.get(0).map_or(0, |m| m.start()), value: t });
        }
    }

    earliest(found)
}
