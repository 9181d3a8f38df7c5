//! Tests for event body construction and response parsing.

use chrono::{TimeZone, Utc};
use huddle::calendar::google::{build_event_body, parse_event_response};
use huddle::calendar::{CalendarError, MeetingRequest};

fn request_at(hour: u32, minute: u32, duration_minutes: u32) -> MeetingRequest {
    MeetingRequest {
        title: "Sync".to_owned(),
        attendees: vec!["dev@corp.io".to_owned()],
        duration_minutes,
        start_time: Utc
            .with_ymd_and_hms(2025, 6, 2, hour, minute, 0)
            .single()
            .expect("valid timestamp"),
        organizer_slack_id: "U7".to_owned(),
        description: "Meeting scheduled via Slack by <@U7>".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// build_event_body
// ---------------------------------------------------------------------------

#[test]
fn end_time_crosses_midnight() {
    let body = build_event_body(&request_at(23, 30, 45), "rid");
    assert_eq!(body["start"]["dateTime"], "2025-06-02T23:30:00Z");
    assert_eq!(body["end"]["dateTime"], "2025-06-03T00:15:00Z");
}

#[test]
fn conference_request_id_is_forwarded() {
    let body = build_event_body(&request_at(10, 0, 30), "meeting_20250602_100000");
    assert_eq!(
        body["conferenceData"]["createRequest"]["requestId"],
        "meeting_20250602_100000"
    );
}

#[test]
fn description_carries_the_organizer_mention() {
    let body = build_event_body(&request_at(10, 0, 30), "rid");
    assert_eq!(body["description"], "Meeting scheduled via Slack by <@U7>");
}

#[test]
fn reminder_overrides_replace_calendar_defaults() {
    let body = build_event_body(&request_at(10, 0, 30), "rid");
    assert_eq!(body["reminders"]["useDefault"], false);
    let overrides = body["reminders"]["overrides"]
        .as_array()
        .expect("overrides array");
    assert_eq!(overrides.len(), 2);
    assert_eq!(overrides[0]["method"], "email");
    assert_eq!(overrides[1]["method"], "popup");
}

// ---------------------------------------------------------------------------
// parse_event_response
// ---------------------------------------------------------------------------

#[test]
fn missing_html_link_degrades_to_empty_string() {
    let scheduled = parse_event_response(r#"{"id": "evt9"}"#).expect("parse");
    assert_eq!(scheduled.event_id, "evt9");
    assert_eq!(scheduled.html_link, "");
}

#[test]
fn empty_entry_points_yield_no_video_link() {
    let body = r#"{"id": "evt9", "conferenceData": {"entryPoints": []}}"#;
    let scheduled = parse_event_response(body).expect("parse");
    assert_eq!(scheduled.video_link, None);
}

#[test]
fn first_entry_point_wins() {
    let body = r#"{
        "id": "evt9",
        "conferenceData": {"entryPoints": [
            {"uri": "https://meet.google.com/first"},
            {"uri": "tel:+1-555-0100"}
        ]}
    }"#;
    let scheduled = parse_event_response(body).expect("parse");
    assert_eq!(
        scheduled.video_link.as_deref(),
        Some("https://meet.google.com/first")
    );
}

#[test]
fn invalid_json_is_a_parse_error() {
    assert!(matches!(
        parse_event_response("not json"),
        Err(CalendarError::Parse(_))
    ));
}
