//! Meeting detail extractor — regex/heuristic chain over free-form text.
//!
//! Extraction runs in a fixed order, because later steps depend on earlier
//! ones: attendees (hard requirement) → anchor date → time-of-day →
//! duration → title. Every field except attendees degrades to a default
//! when its pattern is absent; only a message with no email address at all
//! fails.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDateTime};
use regex::Regex;

use super::datetime;
use super::{ExtractError, MeetingIntent};

/// Default meeting length when the text does not state one.
const DEFAULT_DURATION_MINUTES: u32 = 30;

/// Default title when no quoted or labeled title is found.
const DEFAULT_TITLE: &str = "Meeting";

/// Local-part `@` domain with at least one dot.
static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[\w.\-]+@[\w.\-]+\.\w+").ok());

/// `for <digits>` with an optional unit word. The unit is matched so the
/// phrase is recognized, but deliberately never applied as a multiplier:
/// "for 2 hours" yields duration 2. Bug-compatible with the original
/// behavior; do not fix without a product decision (see DESIGN.md).
static DURATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"for (\d+)\s*(?:min(?:ute)?s?|hours?)?").ok());

/// Quoted title preceded by a label word.
static TITLE_LABELED: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?:subject|title|about|regarding)\s+["'](.+?)["']"#).ok());

/// Any quoted string, first occurrence.
static TITLE_ANY: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r#"["'](.+?)["']"#).ok());

/// Intent under construction: starts from hard defaults, applies overrides
/// only when a pattern matches. Keeps the fallback policy in one place.
struct IntentBuilder {
    attendees: Vec<String>,
    start_time: NaiveDateTime,
    duration_minutes: u32,
    title: String,
}

impl IntentBuilder {
    /// Seed every optional field with its default; `now` anchors the
    /// fallback start time of one hour from now.
    fn new(attendees: Vec<String>, now: NaiveDateTime) -> Self {
        Self {
            attendees,
            start_time: now
                .checked_add_signed(Duration::hours(1))
                .unwrap_or(now),
            duration_minutes: DEFAULT_DURATION_MINUTES,
            title: DEFAULT_TITLE.to_owned(),
        }
    }

    fn build(self, original_text: &str) -> MeetingIntent {
        MeetingIntent {
            attendees: self.attendees,
            start_time: self.start_time,
            duration_minutes: self.duration_minutes,
            title: self.title,
            original_text: original_text.to_owned(),
        }
    }
}

/// Extract structured meeting details from `text`.
///
/// `now` is the current wall-clock time in the bot's display zone, injected
/// so extraction is deterministic: identical text and an identical `now`
/// yield identical results.
///
/// # Errors
///
/// Returns [`ExtractError::NoIntentFound`] when the text contains no email
/// address. All other missing fields fall back to defaults.
pub fn extract_meeting_details(
    text: &str,
    now: NaiveDateTime,
) -> Result<MeetingIntent, ExtractError> {
    // 1. Attendees — the one hard requirement. Kept in order of first
    //    appearance, duplicates included.
    let attendees: Vec<String> = EMAIL
        .as_ref()
        .map(|re| re.find_iter(text).map(|m| m.as_str().to_owned()).collect())
        .unwrap_or_default();
    if attendees.is_empty() {
        return Err(ExtractError::NoIntentFound);
    }

    let mut builder = IntentBuilder::new(attendees, now);
    let lower = text.to_lowercase();

    // 2–4. Anchor date, then time-of-day against it. Date resolution runs
    //      first because time parsing needs the anchor to combine with.
    let anchor = datetime::resolve_anchor_date(&lower, now.date());
    if let Some(start) = datetime::resolve_start_time(text, anchor, now) {
        builder.start_time = start;
    }

    // 6. Duration. Zero would violate the duration-is-positive invariant,
    //    so "for 0 minutes" falls back to the default like an absent phrase.
    if let Some(minutes) = DURATION
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|m| *m > 0)
    {
        builder.duration_minutes = minutes;
    }

    // 7. Title: labeled quote first, then any quote.
    let title_match = TITLE_LABELED
        .as_ref()
        .and_then(|re| re.captures(text))
        .or_else(|| TITLE_ANY.as_ref().and_then(|re| re.captures(text)));
    if let Some(title) = title_match.and_then(|caps| caps.get(1)) {
        builder.title = title.as_str().to_owned();
    }

    Ok(builder.build(text))
}
