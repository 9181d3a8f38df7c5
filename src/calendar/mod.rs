//! Calendar scheduling collaborators: the [`Scheduler`] seam, the per-user
//! OAuth gate, and the Google Calendar implementation.
//!
//! The router is agnostic to the implementation behind these traits; tests
//! substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod google;
pub mod oauth;

/// A fully resolved meeting, ready for the calendar API.
///
/// Unlike [`crate::intent::MeetingIntent`], the start time here is already
/// normalized to UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingRequest {
    /// Event title.
    pub title: String,
    /// Attendee email addresses, as extracted (duplicates preserved).
    pub attendees: Vec<String>,
    /// Meeting length in minutes, always positive.
    pub duration_minutes: u32,
    /// Start instant in UTC.
    pub start_time: DateTime<Utc>,
    /// Slack user ID of the organizer; selects whose calendar is used.
    pub organizer_slack_id: String,
    /// Event description (organizer mention plus the original request text).
    pub description: String,
}

/// The outcome of a successful scheduling call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledMeeting {
    /// Calendar event identifier.
    pub event_id: String,
    /// Human-viewable calendar link.
    pub html_link: String,
    /// Video call link, when the provider attached one.
    pub video_link: Option<String>,
}

/// Errors from the scheduling and OAuth layers.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// The organizer has no usable credentials; the OAuth handshake is needed.
    #[error("user is not authenticated with the calendar provider")]
    AuthRequired,
    /// HTTP transport failure.
    #[error("calendar request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The calendar API answered with an error status.
    #[error("calendar API returned status {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
    /// Response or token file did not match the expected shape.
    #[error("calendar response parse error: {0}")]
    Parse(String),
    /// Reading or writing a stored token failed.
    #[error("token store error: {0}")]
    TokenStore(String),
}

/// Accepts a resolved meeting and creates the calendar event.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Create the event on the organizer's calendar.
    async fn schedule(&self, request: &MeetingRequest) -> Result<ScheduledMeeting, CalendarError>;
}

/// Per-user authentication gate, consulted before extraction output is
/// used against the calendar API.
pub trait AuthGate: Send + Sync {
    /// Whether the user holds usable (present, unexpired or refreshable)
    /// credentials.
    fn is_authenticated(&self, user_id: &str) -> bool;

    /// The URL the user must visit to authorize calendar access.
    fn auth_url(&self, user_id: &str) -> String;
}
