//! Per-message pipeline: classify, gate, extract, normalize, schedule, reply.
//!
//! Every inbound message takes one of two paths:
//! - **meeting request** — OAuth gate, detail extraction, timezone
//!   normalization (localize in the display zone, store as UTC), then the
//!   scheduling call;
//! - **general chat** — a single LLM completion.
//!
//! All user-facing reply strings live here. Failures never surface raw
//! errors to the user; extraction failure yields a clarification prompt
//! with an example format.

use std::sync::Arc;
use std::sync::LazyLock;

use chrono::Duration;
use chrono_tz::Tz;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::adapters::InboundMessage;
use crate::calendar::{AuthGate, CalendarError, MeetingRequest, ScheduledMeeting, Scheduler};
use crate::clock::Clock;
use crate::intent::{self, ExtractError, MeetingIntent};
use crate::providers::{CompletionRequest, LlmProvider};

/// System prompt for the general-chat path.
const CHAT_SYSTEM_PROMPT: &str = "You are a helpful assistant in a Slack channel.";

/// Clarification reply when extraction fails.
const CLARIFY_REPLY: &str = "I couldn't understand the meeting details. \
    Please use format: schedule meeting with user@example.com at 2pm for 30 minutes";

/// Generic failure reply for the scheduling path.
const SCHEDULE_FAILED_REPLY: &str =
    "Sorry, something went wrong while scheduling the meeting. Please try again.";

/// Generic failure reply for the chat path.
const CHAT_FAILED_REPLY: &str = "Sorry, I couldn't process your request at the moment.";

static USER_MENTION: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<@\w+>").ok());
static CHANNEL_MENTION: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<#\w+>").ok());
static FORMATTED_URL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"<(https?://[^|>]+)[^>]*>").ok());

/// Strip Slack markup from message text: user mentions, channel mentions,
/// and `<url|label>` link formatting (unwrapped to the bare URL).
pub fn clean_message(text: &str) -> String {
    let mut cleaned = text.to_owned();
    if let Some(re) = USER_MENTION.as_ref() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    if let Some(re) = CHANNEL_MENTION.as_ref() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    if let Some(re) = FORMATTED_URL.as_ref() {
        cleaned = re.replace_all(&cleaned, "$1").into_owned();
    }
    cleaned.trim().to_owned()
}

/// Routes inbound messages to the scheduling pipeline or the chat fallback.
pub struct MessageRouter {
    llm: Arc<dyn LlmProvider>,
    scheduler: Arc<dyn Scheduler>,
    auth: Arc<dyn AuthGate>,
    clock: Arc<dyn Clock>,
    /// Display zone: bare parsed times are interpreted here, and stored UTC
    /// times are rendered back into it for replies.
    timezone: Tz,
}

impl MessageRouter {
    /// Assemble the router from its collaborators.
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        scheduler: Arc<dyn Scheduler>,
        auth: Arc<dyn AuthGate>,
        clock: Arc<dyn Clock>,
        timezone: Tz,
    ) -> Self {
        Self {
            llm,
            scheduler,
            auth,
            clock,
            timezone,
        }
    }

    /// Handle one inbound message and produce the reply text.
    ///
    /// Total: every path ends in a reply string, never an error.
    #[instrument(skip(self, message), fields(user_id = %message.user_id, kind = ?message.kind))]
    pub async fn handle(&self, message: &InboundMessage) -> String {
        let text = clean_message(&message.text);

        let reply = if intent::is_meeting_request(&text) {
            self.handle_meeting_request(&text, &message.user_id).await
        } else {
            self.handle_chat(&text).await
        };

        // Every reply addresses the sender explicitly, in direct messages
        // as well as channel mentions.
        format!("<@{}> {}", message.user_id, reply)
    }

    /// The scheduling path: auth gate → extract → normalize → schedule.
    async fn handle_meeting_request(&self, text: &str, user_id: &str) -> String {
        if !self.auth.is_authenticated(user_id) {
            let auth_url = self.auth.auth_url(user_id);
            info!(user_id, "meeting request from unauthenticated user");
            return format!(
                "To schedule meetings, I need access to your Google Calendar. \
                 Please authenticate here: {auth_url}"
            );
        }

        // The extractor works in wall-clock time in the display zone.
        let local_now = self.clock.now().with_timezone(&self.timezone).naive_local();
        let intent = match intent::extract_meeting_details(text, local_now) {
            Ok(intent) => intent,
            Err(ExtractError::NoIntentFound) => {
                info!(user_id, "no meeting intent found in request");
                return CLARIFY_REPLY.to_owned();
            }
        };

        // Localize the bare parsed time, then convert to UTC for storage.
        let Some(start_utc) = intent::datetime::to_utc(intent.start_time, self.timezone) else {
            warn!(user_id, start = %intent.start_time, "start time does not exist in display zone");
            return CLARIFY_REPLY.to_owned();
        };

        let request = MeetingRequest {
            title: intent.title.clone(),
            attendees: intent.attendees.clone(),
            duration_minutes: intent.duration_minutes,
            start_time: start_utc,
            organizer_slack_id: user_id.to_owned(),
            description: format!(
                "Meeting scheduled via Slack by <@{user_id}>\nOriginal request: {}",
                intent.original_text
            ),
        };

        match self.scheduler.schedule(&request).await {
            Ok(scheduled) => self.format_success(&intent, &request, &scheduled),
            Err(CalendarError::AuthRequired) => {
                let auth_url = self.auth.auth_url(user_id);
                format!("Please authenticate first: {auth_url}")
            }
            Err(e) => {
                error!(user_id, error = %e, "scheduling failed");
                SCHEDULE_FAILED_REPLY.to_owned()
            }
        }
    }

    /// The chat path: one LLM completion, degraded to an apology on error.
    async fn handle_chat(&self, text: &str) -> String {
        let request = CompletionRequest {
            system: Some(CHAT_SYSTEM_PROMPT.to_owned()),
            user: text.to_owned(),
            max_tokens: None,
        };
        match self.llm.complete(request).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "chat completion failed");
                CHAT_FAILED_REPLY.to_owned()
            }
        }
    }

    /// Render the success reply, converting stored UTC back to the display
    /// zone for the user.
    fn format_success(
        &self,
        intent: &MeetingIntent,
        request: &MeetingRequest,
        scheduled: &ScheduledMeeting,
    ) -> String {
        let local_start = request.start_time.with_timezone(&self.timezone);
        let local_end = local_start
            .checked_add_signed(Duration::minutes(i64::from(request.duration_minutes)))
            .unwrap_or(local_start);

        format!(
            "Meeting '{}' scheduled!\n\
             Time: {} - {}\n\
             Attendees: {}\n\
             Duration: {} minutes\n\
             Calendar link: {}\n\
             Video call link: {}",
            intent.title,
            local_start.format("%I:%M %p %Z on %B %d, %Y"),
            local_end.format("%I:%M %p"),
            intent.attendees.join(", "),
            request.duration_minutes,
            scheduled.html_link,
            scheduled
                .video_link
                .as_deref()
                .unwrap_or("No video link available"),
        )
    }
}
