//! Shared date/time heuristics for the extractor.
//!
//! Three concerns live here:
//! - anchor-date resolution from date phrases ("next tuesday", "tomorrow",
//!   "today"), evaluated in that priority order;
//! - time-of-day parsing ("at 2pm", "10:30 am") and combination with the
//!   anchor date, including the earlier-than-now-means-tomorrow rule;
//! - timezone normalization: localize a bare wall-clock time in the
//!   configured zone, then convert to UTC for storage.

use std::sync::LazyLock;

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use regex::Regex;

/// Weekday names paired with their `chrono` weekday, scan order fixed.
const WEEKDAYS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// `[at] <1-2 digits>[:<2 digits>] <am|pm>`, meridiem case-insensitive.
static TIME_OF_DAY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)(?:at\s+)?(\d{1,2}(?::(\d{2}))?)\s*(am|pm)").ok());

/// Resolve the anchor date from date phrases in the (lowercased) text.
///
/// Priority order, first match wins:
/// 1. `next <weekday>` — the next occurrence of that weekday strictly after
///    `today`; if today is that weekday the result is seven days out.
/// 2. `tomorrow` — today + 1 day.
/// 3. `today`.
///
/// Returns `None` when no phrase matches. Absence is distinct from "today":
/// the time-of-day rule falls back differently without an anchor.
pub fn resolve_anchor_date(lower: &str, today: NaiveDate) -> Option<NaiveDate> {
    for (name, weekday) in WEEKDAYS {
        if lower.contains(&format!("next {name}")) {
            return next_occurrence(today, *weekday);
        }
    }
    if lower.contains("tomorrow") {
        return today.checked_add_signed(Duration::days(1));
    }
    if lower.contains("today") {
        return Some(today);
    }
    None
}

/// The next date strictly after `today` that falls on `weekday`.
fn next_occurrence(today: NaiveDate, weekday: Weekday) -> Option<NaiveDate> {
    let diff = i64::from(weekday.num_days_from_monday())
        .saturating_sub(i64::from(today.weekday().num_days_from_monday()))
        .rem_euclid(7);
    let diff = if diff == 0 { 7 } else { diff };
    today.checked_add_signed(Duration::days(diff))
}

/// Resolve the meeting start from a time-of-day phrase in the text.
///
/// Searches for `[at] H[:MM] am|pm`. When found:
/// - with an anchor date, the parsed time is combined with it directly;
/// - without one, a time earlier than the current clock time is taken to
///   mean tomorrow (next occurrence of that time), otherwise today.
///
/// A matched-but-unparseable time (e.g. "13pm") is treated as if no time
/// pattern was present. Returns `None` when no usable time is found, in
/// which case the caller applies its now-plus-one-hour default.
pub fn resolve_start_time(
    text: &str,
    anchor: Option<NaiveDate>,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    let re = TIME_OF_DAY.as_ref()?;
    let caps = re.captures(text)?;

    let hour: u32 = caps.get(1)?.as_str().split(':').next()?.parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    let pm = caps.get(3)?.as_str().eq_ignore_ascii_case("pm");
    let time = clock_time(hour, minute, pm)?;

    match anchor {
        Some(date) => Some(date.and_time(time)),
        None => {
            if time < now.time() {
                let tomorrow = now.date().checked_add_signed(Duration::days(1))?;
                Some(tomorrow.and_time(time))
            } else {
                Some(now.date().and_time(time))
            }
        }
    }
}

/// Convert a 12-hour clock reading to a `NaiveTime`.
///
/// Hours outside 1–12 or minutes outside 0–59 are rejected, which the
/// caller treats as "pattern absent" rather than an error.
fn clock_time(hour: u32, minute: u32, pm: bool) -> Option<NaiveTime> {
    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour24 = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h.saturating_add(12),
    };
    NaiveTime::from_hms_opt(hour24, minute, 0)
}

/// Interpret a bare wall-clock time in `zone`, then convert to UTC.
///
/// The two-step localize-then-convert is required because a parsed time
/// carries no zone information and must not be assumed to already be UTC.
/// Ambiguous local times (DST fall-back) resolve to the earlier reading;
/// nonexistent ones (spring-forward gap) return `None`.
pub fn to_utc(local: NaiveDateTime, zone: Tz) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
