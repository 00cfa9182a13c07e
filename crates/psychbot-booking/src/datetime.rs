//! Natural language date and time parsing plus clinic opening hours.
//!
//! Understands weekday names (with `next`/`this`), `today`, `tomorrow`,
//! `15 Aug`, `Aug 15`, `15/08[/2026]`, ISO dates, and times such as `10am`,
//! `10:30 am`, `14:00` and `noon`. A message must carry both a date and a
//! time to be accepted.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use regex::{Captures, Regex};

use crate::error::{weekday_name, ValidationError};

// =============================================================================
// Clock
// =============================================================================

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall-clock time in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

// =============================================================================
// Operating hours
// =============================================================================

/// Weekly opening hours. Sunday is always closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingHours {
    pub weekday_open: NaiveTime,
    pub weekday_close: NaiveTime,
    pub saturday_open: NaiveTime,
    pub saturday_close: NaiveTime,
}

impl Default for OperatingHours {
    fn default() -> Self {
        let hm = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN);
        Self {
            weekday_open: hm(9),
            weekday_close: hm(19),
            saturday_open: hm(9),
            saturday_close: hm(17),
        }
    }
}

impl OperatingHours {
    /// Opening and closing time on a given day, `None` when closed.
    pub fn hours_on(&self, day: Weekday) -> Option<(NaiveTime, NaiveTime)> {
        match day {
            Weekday::Sun => None,
            Weekday::Sat => Some((self.saturday_open, self.saturday_close)),
            _ => Some((self.weekday_open, self.weekday_close)),
        }
    }

    /// Check that a session of `duration_minutes` starting at `start` fits
    /// entirely inside opening hours.
    pub fn check(&self, start: NaiveDateTime, duration_minutes: u32) -> Result<(), ValidationError> {
        let day = start.weekday();
        let (open, close) = self
            .hours_on(day)
            .ok_or(ValidationError::ClosedDay(day))?;
        let end = start + Duration::minutes(i64::from(duration_minutes));
        if start.time() < open || end > start.date().and_time(close) {
            return Err(ValidationError::OutsideHours);
        }
        Ok(())
    }

    /// "Monday to Friday 9am to 7pm, Saturday 9am to 5pm, closed on Sunday".
    pub fn summary(&self) -> String {
        format!(
            "Monday to Friday {} to {}, Saturday {} to {}, closed on Sunday",
            short_time(self.weekday_open),
            short_time(self.weekday_close),
            short_time(self.saturday_open),
            short_time(self.saturday_close),
        )
    }
}

/// `9am`, `7pm`, `10:30am`.
pub fn short_time(time: NaiveTime) -> String {
    let (pm, hour) = time.hour12();
    let suffix = if pm { "pm" } else { "am" };
    match time.minute() {
        0 => format!("{hour}{suffix}"),
        m => format!("{hour}:{m:02}{suffix}"),
    }
}

/// "Monday, 17 August 2026 at 10am".
pub fn format_slot(slot: NaiveDateTime) -> String {
    format!(
        "{}, {} at {}",
        weekday_name(&slot.weekday()),
        slot.format("%-d %B %Y"),
        short_time(slot.time())
    )
}

// =============================================================================
// Parsing
// =============================================================================

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("Invalid ISO date regex")
});

static SLASH_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b").expect("Invalid slash date regex")
});

static DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?(?:,?\s+(\d{4})\b)?",
    )
    .expect("Invalid day-month regex")
});

static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b(?:,?\s+(\d{4})\b)?",
    )
    .expect("Invalid month-day regex")
});

static RELATIVE_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(day\s+after\s+tomorrow|today|tonight|tomorrow|tmrw|tmr)\b")
        .expect("Invalid relative day regex")
});

static WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:(next|this|coming)\s+)?(monday|mon|tuesday|tues|tue|wednesday|wed|thursday|thurs|thur|thu|friday|fri|saturday|sat|sunday|sun)\b",
    )
    .expect("Invalid weekday regex")
});

static TIME_12H: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})(?:[:.](\d{2}))?\s*(am|pm)\b").expect("Invalid 12-hour time regex")
});

static TIME_24H: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").expect("Invalid 24-hour time regex")
});

static NOON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(noon|midday)\b").expect("Invalid noon regex"));

/// Parse a date and a time out of free text, relative to `now`.
///
/// Dates without a year that have already passed this year roll over to
/// next year. `next <weekday>` is the first such day strictly after today;
/// a bare or `this <weekday>` may be today.
pub fn parse_datetime(input: &str, now: NaiveDateTime) -> Result<NaiveDateTime, ValidationError> {
    let text = input
        .to_lowercase()
        .replace("a.m.", "am")
        .replace("p.m.", "pm");
    let today = now.date();

    let date = parse_date(&text, today)?;
    let time = parse_time(&text);
    match (date, time) {
        (Some(date), Some(time)) => Ok(date.and_time(time)),
        _ => Err(ValidationError::UnparsedDateTime),
    }
}

/// Check a parsed slot: in the future, and the whole session inside
/// opening hours.
pub fn validate_slot(
    start: NaiveDateTime,
    now: NaiveDateTime,
    hours: &OperatingHours,
    duration_minutes: u32,
) -> Result<(), ValidationError> {
    if start <= now {
        return Err(ValidationError::InPast);
    }
    hours.check(start, duration_minutes)
}

fn parse_date(text: &str, today: NaiveDate) -> Result<Option<NaiveDate>, ValidationError> {
    if let Some(caps) = ISO_DATE.captures(text) {
        let (y, m, d) = (num(&caps, 1), num(&caps, 2), num(&caps, 3));
        return ymd(y as i32, m, d).map(Some);
    }

    if let Some(caps) = SLASH_DATE.captures(text) {
        let (d, m) = (num(&caps, 1), num(&caps, 2));
        let year = caps.get(3).map(|y| {
            let y = y.as_str().parse::<i32>().unwrap_or_default();
            if y < 100 {
                2000 + y
            } else {
                y
            }
        });
        return day_month(d, m, year, today).map(Some);
    }

    if let Some(caps) = DAY_MONTH.captures(text) {
        let d = num(&caps, 1);
        let m = month_number(&caps[2]);
        let year = caps.get(3).map(|y| y.as_str().parse::<i32>().unwrap_or_default());
        return day_month(d, m, year, today).map(Some);
    }

    if let Some(caps) = MONTH_DAY.captures(text) {
        let m = month_number(&caps[1]);
        let d = num(&caps, 2);
        let year = caps.get(3).map(|y| y.as_str().parse::<i32>().unwrap_or_default());
        return day_month(d, m, year, today).map(Some);
    }

    if let Some(caps) = RELATIVE_DAY.captures(text) {
        let offset = match &caps[1] {
            "today" | "tonight" => 0,
            w if w.starts_with("day") => 2,
            _ => 1,
        };
        return Ok(Some(today + Duration::days(offset)));
    }

    if let Some(caps) = WEEKDAY.captures(text) {
        let strictly_after = caps.get(1).is_some_and(|m| m.as_str() == "next");
        let Some(target) = weekday_from(&caps[2]) else {
            return Ok(None);
        };
        let current = today.weekday().num_days_from_monday();
        let mut ahead = (7 + target.num_days_from_monday() - current) % 7;
        if strictly_after && ahead == 0 {
            ahead = 7;
        }
        return Ok(Some(today + Duration::days(i64::from(ahead))));
    }

    Ok(None)
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    if let Some(caps) = TIME_12H.captures(text) {
        let hour = num(&caps, 1);
        let minute = caps.get(2).map_or(0, |_| num(&caps, 2));
        if !(1..=12).contains(&hour) {
            return None;
        }
        let hour = match (&caps[3], hour) {
            ("am", 12) => 0,
            ("am", h) => h,
            ("pm", 12) => 12,
            (_, h) => h + 12,
        };
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    if let Some(caps) = TIME_24H.captures(text) {
        return NaiveTime::from_hms_opt(num(&caps, 1), num(&caps, 2), 0);
    }

    if NOON.is_match(text) {
        return NaiveTime::from_hms_opt(12, 0, 0);
    }

    None
}

fn num(caps: &Captures<'_>, index: usize) -> u32 {
    caps.get(index)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or_default()
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate, ValidationError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or(ValidationError::InvalidDate)
}

fn day_month(
    day: u32,
    month: u32,
    year: Option<i32>,
    today: NaiveDate,
) -> Result<NaiveDate, ValidationError> {
    match year {
        Some(year) => ymd(year, month, day),
        None => {
            let date = ymd(today.year(), month, day)?;
            if date < today {
                ymd(today.year() + 1, month, day)
            } else {
                Ok(date)
            }
        }
    }
}

fn month_number(abbrev: &str) -> u32 {
    match abbrev {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => 0,
    }
}

fn weekday_from(name: &str) -> Option<Weekday> {
    match name {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tues" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thurs" | "thur" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}
