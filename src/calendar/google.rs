//! Google Calendar client — event creation on the organizer's calendar.
//!
//! One write action: insert an event on the `primary` calendar with
//! attendees, reminder overrides, and a Google Meet conference request.
//! One read action: list upcoming events (used by the `upcoming` CLI
//! subcommand).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{CalendarError, MeetingRequest, ScheduledMeeting, Scheduler};
use crate::calendar::oauth::GoogleOauth;
use crate::clock::Clock;

/// Production API base for Google Calendar.
const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

/// Default number of events returned by [`GoogleCalendarClient::list_upcoming`].
pub const DEFAULT_UPCOMING_LIMIT: u32 = 10;

/// A calendar entry summary from the upcoming-events listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingMeeting {
    /// Event title, `"No title"` when absent.
    pub summary: String,
    /// Start as reported by the API (RFC 3339 or all-day date).
    pub start_time: String,
    /// Human-viewable event link, when present.
    pub link: Option<String>,
}

/// Google Calendar v3 client authenticated per user via [`GoogleOauth`].
pub struct GoogleCalendarClient {
    oauth: Arc<GoogleOauth>,
    clock: Arc<dyn Clock>,
    client: reqwest::Client,
    base_url: String,
}

impl GoogleCalendarClient {
    /// Create a client against the production API.
    pub fn new(oauth: Arc<GoogleOauth>, clock: Arc<dyn Clock>) -> Self {
        Self::with_base_url(oauth, clock, DEFAULT_API_BASE.to_owned())
    }

    /// Create a client against a non-default API base (testing).
    pub fn with_base_url(oauth: Arc<GoogleOauth>, clock: Arc<dyn Clock>, base_url: String) -> Self {
        Self {
            oauth,
            clock,
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// List up to `max_results` upcoming events on the user's primary
    /// calendar, soonest first.
    ///
    /// # Errors
    ///
    /// [`CalendarError::AuthRequired`] without stored credentials;
    /// [`CalendarError::Api`] on an error status from the API.
    pub async fn list_upcoming(
        &self,
        user_id: &str,
        max_results: u32,
    ) -> Result<Vec<UpcomingMeeting>, CalendarError> {
        let token = self.oauth.access_token(user_id).await?;
        let time_min = self
            .clock
            .now()
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let response = self
            .client
            .get(format!(
                "{}/calendar/v3/calendars/primary/events",
                self.base_url
            ))
            .bearer_auth(&token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("maxResults", &max_results.to_string()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await?;

        let body = check_status(response).await?;
        let parsed: Value =
            serde_json::from_str(&body).map_err(|e| CalendarError::Parse(e.to_string()))?;

        let events = parsed
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(events
            .iter()
            .map(|event| UpcomingMeeting {
                summary: event
                    .get("summary")
                    .and_then(Value::as_str)
                    .unwrap_or("No title")
                    .to_owned(),
                start_time: event
                    .get("start")
                    .and_then(|s| s.get("dateTime").or_else(|| s.get("date")))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
                link: event
                    .get("htmlLink")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            })
            .collect())
    }
}

/// Build the `events.insert` request body for `request`.
///
/// Start and end are emitted as RFC 3339 in UTC; reminders override the
/// calendar defaults with a 24-hour email and a 15-minute popup; the
/// conference request asks for a Google Meet link.
#[doc(hidden)]
pub fn build_event_body(request: &MeetingRequest, conference_request_id: &str) -> Value {
    let end_time = request
        .start_time
        .checked_add_signed(Duration::minutes(i64::from(request.duration_minutes)))
        .unwrap_or(request.start_time);

    json!({
        "summary": request.title,
        "description": request.description,
        "start": {
            "dateTime": request.start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            "timeZone": "UTC",
        },
        "end": {
            "dateTime": end_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            "timeZone": "UTC",
        },
        "attendees": request
            .attendees
            .iter()
            .map(|email| json!({"email": email}))
            .collect::<Vec<_>>(),
        "reminders": {
            "useDefault": false,
            "overrides": [
                {"method": "email", "minutes": 1440},
                {"method": "popup", "minutes": 15},
            ],
        },
        "conferenceData": {
            "createRequest": {
                "requestId": conference_request_id,
                "conferenceSolutionKey": {"type": "hangoutsMeet"},
            }
        },
    })
}

/// Extract the scheduling result from an `events.insert` response body.
#[doc(hidden)]
pub fn parse_event_response(body: &str) -> Result<ScheduledMeeting, CalendarError> {
    let event: Value =
        serde_json::from_str(body).map_err(|e| CalendarError::Parse(e.to_string()))?;

    let event_id = event
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| CalendarError::Parse("event response missing id".to_owned()))?
        .to_owned();
    let html_link = event
        .get("htmlLink")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let video_link = event
        .get("conferenceData")
        .and_then(|c| c.get("entryPoints"))
        .and_then(Value::as_array)
        .and_then(|points| points.first())
        .and_then(|p| p.get("uri"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    Ok(ScheduledMeeting {
        event_id,
        html_link,
        video_link,
    })
}

#[async_trait]
impl Scheduler for GoogleCalendarClient {
    #[instrument(skip(self, request), fields(organizer = %request.organizer_slack_id))]
    async fn schedule(&self, request: &MeetingRequest) -> Result<ScheduledMeeting, CalendarError> {
        let token = self.oauth.access_token(&request.organizer_slack_id).await?;

        let request_id = format!("meeting_{}", self.clock.now().format("%Y%m%d_%H%M%S"));
        let body = build_event_body(request, &request_id);

        let response = self
            .client
            .post(format!(
                "{}/calendar/v3/calendars/primary/events",
                self.base_url
            ))
            .bearer_auth(&token)
            .query(&[("conferenceDataVersion", "1"), ("sendUpdates", "all")])
            .json(&body)
            .send()
            .await?;

        let body = check_status(response).await?;
        let scheduled = parse_event_response(&body)?;
        info!(event_id = %scheduled.event_id, "calendar event created");
        Ok(scheduled)
    }
}

async fn check_status(response: reqwest::Response) -> Result<String, CalendarError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(CalendarError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}
