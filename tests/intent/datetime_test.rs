//! Tests for anchor-date and time-of-day resolution.

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use huddle::intent::datetime::{resolve_anchor_date, resolve_start_time, to_utc};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn at(d: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
    d.and_hms_opt(h, min, 0).expect("valid time")
}

// ---------------------------------------------------------------------------
// resolve_anchor_date
// ---------------------------------------------------------------------------

#[test]
fn every_weekday_resolves_from_a_friday() {
    // 2025-06-06 is a Friday.
    let friday = date(2025, 6, 6);
    let expected = [
        ("next monday", date(2025, 6, 9)),
        ("next tuesday", date(2025, 6, 10)),
        ("next wednesday", date(2025, 6, 11)),
        ("next thursday", date(2025, 6, 12)),
        ("next friday", date(2025, 6, 13)),
        ("next saturday", date(2025, 6, 7)),
        ("next sunday", date(2025, 6, 8)),
    ];
    for (phrase, want) in expected {
        assert_eq!(resolve_anchor_date(phrase, friday), Some(want), "{phrase}");
    }
}

#[test]
fn weekday_crossing_a_month_boundary() {
    // 2025-06-30 is a Monday; the next Thursday lands in July.
    let monday = date(2025, 6, 30);
    assert_eq!(
        resolve_anchor_date("next thursday", monday),
        Some(date(2025, 7, 3))
    );
}

#[test]
fn phrase_embedded_in_a_sentence() {
    let monday = date(2025, 6, 2);
    assert_eq!(
        resolve_anchor_date("let's sync sometime tomorrow afternoon", monday),
        Some(date(2025, 6, 3))
    );
}

#[test]
fn no_phrase_yields_none() {
    assert_eq!(resolve_anchor_date("schedule a meeting at 2pm", date(2025, 6, 2)), None);
}

// ---------------------------------------------------------------------------
// resolve_start_time
// ---------------------------------------------------------------------------

#[test]
fn anchor_plus_time_ignores_current_clock() {
    // 9am is in the past relative to now, but the anchor date pins it.
    let now = at(date(2025, 6, 2), 16, 0);
    let start = resolve_start_time("tomorrow at 9am", Some(date(2025, 6, 3)), now);
    assert_eq!(start, Some(at(date(2025, 6, 3), 9, 0)));
}

#[test]
fn exact_current_time_stays_today() {
    // Equal to now is not "earlier", so no rollover.
    let now = at(date(2025, 6, 2), 14, 0);
    let start = resolve_start_time("at 2pm", None, now);
    assert_eq!(start, Some(at(date(2025, 6, 2), 14, 0)));
}

#[test]
fn minutes_survive_parsing() {
    let now = at(date(2025, 6, 2), 8, 0);
    let start = resolve_start_time("at 9:05 pm", None, now);
    assert_eq!(start, Some(at(date(2025, 6, 2), 21, 5)));
}

#[test]
fn first_time_phrase_wins() {
    let now = at(date(2025, 6, 2), 8, 0);
    let start = resolve_start_time("at 10am or maybe 3pm", None, now);
    assert_eq!(start, Some(at(date(2025, 6, 2), 10, 0)));
}

// ---------------------------------------------------------------------------
// to_utc
// ---------------------------------------------------------------------------

#[test]
fn winter_offset_differs_from_summer() {
    // 14:00 in New York is 19:00 UTC under EST (-05:00).
    let local = at(date(2025, 1, 15), 14, 0);
    let utc = to_utc(local, chrono_tz::America::New_York).expect("unambiguous");
    assert_eq!(
        utc,
        Utc.with_ymd_and_hms(2025, 1, 15, 19, 0, 0).single().expect("valid")
    );
}

#[test]
fn ambiguous_fall_back_time_takes_earlier_reading() {
    // 01:30 on the US fall-back date occurs twice; the earlier reading is
    // still EDT (-04:00).
    let local = at(date(2025, 11, 2), 1, 30);
    let utc = to_utc(local, chrono_tz::America::New_York).expect("ambiguous resolves");
    assert_eq!(
        utc,
        Utc.with_ymd_and_hms(2025, 11, 2, 5, 30, 0).single().expect("valid")
    );
}

#[test]
fn utc_zone_is_identity() {
    let local = at(date(2025, 6, 2), 14, 0);
    let utc = to_utc(local, chrono_tz::UTC).expect("always valid");
    assert_eq!(
        utc,
        Utc.with_ymd_and_hms(2025, 6, 2, 14, 0, 0).single().expect("valid")
    );
}
