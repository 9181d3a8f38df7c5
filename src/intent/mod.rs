//! Meeting-intent core: classifier, detail extractor, and date/time helpers.
//!
//! The flow for an inbound message is:
//!
//! 1. [`classifier::is_meeting_request`] decides whether the text is a
//!    scheduling request at all (pure keyword/pattern matching).
//! 2. [`extractor::extract_meeting_details`] turns a scheduling request into
//!    a [`MeetingIntent`]: attendees, start time, duration, title, with
//!    well-defined fallback defaults for everything but attendees.
//!
//! The extractor is a pure function over the message text and an injected
//! "now" value; see [`crate::clock`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod classifier;
pub mod datetime;
pub mod extractor;

pub use classifier::is_meeting_request;
pub use extractor::extract_meeting_details;

/// A structured meeting request extracted from free-form text.
///
/// Produced once per inbound message and handed to the scheduling layer;
/// never mutated or persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingIntent {
    /// Attendee email addresses in order of first appearance. Never empty —
    /// extraction fails instead. Duplicates are kept as written.
    pub attendees: Vec<String>,
    /// Start of the meeting as wall-clock time in the bot's display zone.
    /// No zone is attached yet; the caller localizes and converts to UTC
    /// before scheduling (see [`datetime::to_utc`]).
    pub start_time: NaiveDateTime,
    /// Meeting length in minutes. Defaults to 30 when the text says nothing.
    pub duration_minutes: u32,
    /// Meeting title. Defaults to `"Meeting"`.
    pub title: String,
    /// The verbatim input, kept for the event description downstream.
    pub original_text: String,
}

/// Failure modes of detail extraction.
///
/// Missing time, duration, or title degrade to defaults rather than failing;
/// the only hard failure is a message with no attendee address at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// No email address was found anywhere in the text.
    #[error("no attendee email address found in message")]
    NoIntentFound,
}
