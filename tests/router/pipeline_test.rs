//! End-to-end pipeline behavior with in-memory collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use huddle::adapters::{InboundMessage, MessageKind};
use huddle::calendar::{
    AuthGate, CalendarError, MeetingRequest, ScheduledMeeting, Scheduler,
};
use huddle::clock::{Clock, FixedClock};
use huddle::providers::{CompletionRequest, LlmProvider, ProviderError};
use huddle::router::MessageRouter;

struct EchoLlm;

#[async_trait]
impl LlmProvider for EchoLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        Ok(format!("echo: {}", request.user))
    }

    fn model_id(&self) -> &str {
        "echo"
    }
}

#[derive(Default)]
struct RecordingScheduler {
    requests: Mutex<Vec<MeetingRequest>>,
}

#[async_trait]
impl Scheduler for RecordingScheduler {
    async fn schedule(&self, request: &MeetingRequest) -> Result<ScheduledMeeting, CalendarError> {
        self.requests.lock().expect("lock").push(request.clone());
        Ok(ScheduledMeeting {
            event_id: "evt".to_owned(),
            html_link: "https://calendar.google.com/evt".to_owned(),
            video_link: None,
        })
    }
}

struct OpenGate;

impl AuthGate for OpenGate {
    fn is_authenticated(&self, _user_id: &str) -> bool {
        true
    }

    fn auth_url(&self, user_id: &str) -> String {
        format!("https://auth.example/{user_id}")
    }
}

fn router(scheduler: Arc<RecordingScheduler>) -> MessageRouter {
    // Monday 2025-06-02 13:00 UTC, 09:00 in New York.
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2025, 6, 2, 13, 0, 0)
            .single()
            .expect("valid timestamp"),
    ));
    MessageRouter::new(
        Arc::new(EchoLlm),
        scheduler,
        Arc::new(OpenGate),
        clock,
        chrono_tz::America::New_York,
    )
}

fn inbound(kind: MessageKind, text: &str) -> InboundMessage {
    InboundMessage {
        kind,
        user_id: "U9".to_owned(),
        channel_id: "C9".to_owned(),
        text: text.to_owned(),
        event_id: "Ev9".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// reply addressing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn direct_messages_address_the_sender() {
    let scheduler = Arc::new(RecordingScheduler::default());
    let reply = router(scheduler)
        .handle(&inbound(MessageKind::DirectMessage, "hello there"))
        .await;
    assert_eq!(reply, "<@U9> echo: hello there");
}

#[tokio::test]
async fn channel_mentions_address_the_sender() {
    let scheduler = Arc::new(RecordingScheduler::default());
    let reply = router(scheduler)
        .handle(&inbound(MessageKind::Mention, "<@UBOT> hello there"))
        .await;
    assert_eq!(reply, "<@U9> echo: hello there");
}

// ---------------------------------------------------------------------------
// scheduling flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn weekday_request_lands_on_the_right_utc_instant() {
    let scheduler = Arc::new(RecordingScheduler::default());
    router(scheduler.clone())
        .handle(&inbound(
            MessageKind::DirectMessage,
            "schedule a meeting with dev@corp.io next friday at 4pm",
        ))
        .await;

    let requests = scheduler.requests.lock().expect("lock");
    // Friday 2025-06-06 16:00 in New York is 20:00 UTC.
    assert_eq!(
        requests[0].start_time,
        Utc.with_ymd_and_hms(2025, 6, 6, 20, 0, 0)
            .single()
            .expect("valid")
    );
}

#[tokio::test]
async fn hours_phrase_is_taken_as_a_raw_minute_count() {
    // "for 2 hours" parses the number but never the unit, so the event is
    // two minutes long. The confirmation makes this visible to the user.
    let scheduler = Arc::new(RecordingScheduler::default());
    let reply = router(scheduler.clone())
        .handle(&inbound(
            MessageKind::DirectMessage,
            "schedule a meeting with dev@corp.io at 2pm for 2 hours",
        ))
        .await;

    let requests = scheduler.requests.lock().expect("lock");
    assert_eq!(requests[0].duration_minutes, 2);
    assert!(reply.contains("Duration: 2 minutes"));
}

#[tokio::test]
async fn all_attendees_appear_in_request_and_reply() {
    let scheduler = Arc::new(RecordingScheduler::default());
    let reply = router(scheduler.clone())
        .handle(&inbound(
            MessageKind::DirectMessage,
            "set up a call with ana@corp.io and ben@corp.io at 3pm",
        ))
        .await;

    let requests = scheduler.requests.lock().expect("lock");
    assert_eq!(requests[0].attendees, vec!["ana@corp.io", "ben@corp.io"]);
    assert!(reply.contains("ana@corp.io, ben@corp.io"));
}

#[tokio::test]
async fn description_quotes_the_cleaned_request() {
    let scheduler = Arc::new(RecordingScheduler::default());
    router(scheduler.clone())
        .handle(&inbound(
            MessageKind::Mention,
            "<@UBOT> book a meeting with dev@corp.io at 5pm",
        ))
        .await;

    let requests = scheduler.requests.lock().expect("lock");
    assert!(requests[0].description.contains("<@U9>"));
    assert!(requests[0]
        .description
        .contains("book a meeting with dev@corp.io at 5pm"));
}

#[tokio::test]
async fn missing_video_link_is_spelled_out() {
    let scheduler = Arc::new(RecordingScheduler::default());
    let reply = router(scheduler)
        .handle(&inbound(
            MessageKind::DirectMessage,
            "schedule a meeting with dev@corp.io at 3pm",
        ))
        .await;
    assert!(reply.contains("No video link available"));
}
