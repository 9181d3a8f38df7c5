//! Tests for the per-user token store and auth gate.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use huddle::calendar::oauth::{GoogleOauth, OauthConfig, StoredToken};
use huddle::calendar::{AuthGate, CalendarError};
use huddle::clock::{Clock, FixedClock};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn now_offset(seconds: i64) -> DateTime<Utc> {
    fixed_now()
        .checked_add_signed(chrono::Duration::seconds(seconds))
        .expect("valid offset")
}

fn manager(dir: &Path) -> GoogleOauth {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(fixed_now()));
    GoogleOauth::new(
        OauthConfig {
            client_id: "client".to_owned(),
            client_secret: "secret".to_owned(),
            redirect_uri: "http://localhost:8080/oauth/callback".to_owned(),
            tokens_dir: dir.to_path_buf(),
        },
        clock,
    )
    .expect("manager should initialise")
}

fn token_at(expires_at: DateTime<Utc>, refresh: Option<&str>) -> StoredToken {
    StoredToken {
        access_token: "access".to_owned(),
        refresh_token: refresh.map(str::to_owned),
        expires_at,
    }
}

// ---------------------------------------------------------------------------
// token store
// ---------------------------------------------------------------------------

#[test]
fn users_get_separate_token_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oauth = manager(dir.path());
    let expires = now_offset(3600);
    oauth.save_token("U1", &token_at(expires, None)).expect("save");
    oauth.save_token("U2", &token_at(expires, Some("r2"))).expect("save");

    let first = oauth.load_token("U1").expect("load U1");
    let second = oauth.load_token("U2").expect("load U2");
    assert_eq!(first.refresh_token, None);
    assert_eq!(second.refresh_token.as_deref(), Some("r2"));
}

#[test]
fn corrupted_token_file_reads_as_absent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oauth = manager(dir.path());
    std::fs::write(dir.path().join("U1_token.json"), "{not json").expect("write");

    assert!(oauth.load_token("U1").is_none());
    assert!(!oauth.is_authenticated("U1"));
}

#[cfg(unix)]
#[test]
fn token_file_is_owner_readable_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let oauth = manager(dir.path());
    let expires = now_offset(3600);
    oauth.save_token("U1", &token_at(expires, None)).expect("save");

    let mode = std::fs::metadata(dir.path().join("U1_token.json"))
        .expect("metadata")
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

// ---------------------------------------------------------------------------
// expiry margin
// ---------------------------------------------------------------------------

#[test]
fn token_expiring_within_the_margin_counts_as_expired() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oauth = manager(dir.path());
    // 30s of validity left is inside the 60s refresh margin.
    let soon = now_offset(30);
    oauth.save_token("U1", &token_at(soon, None)).expect("save");
    assert!(!oauth.is_authenticated("U1"));
}

#[test]
fn token_expiring_after_the_margin_is_still_good() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oauth = manager(dir.path());
    let later = now_offset(120);
    oauth.save_token("U1", &token_at(later, None)).expect("save");
    assert!(oauth.is_authenticated("U1"));
}

// ---------------------------------------------------------------------------
// access_token failure paths (no network involved)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_reports_auth_required() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oauth = manager(dir.path());
    let err = oauth.access_token("UNOBODY").await.expect_err("no token");
    assert!(matches!(err, CalendarError::AuthRequired));
}

#[tokio::test]
async fn expired_token_without_refresh_reports_auth_required() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oauth = manager(dir.path());
    let past = now_offset(-3600);
    oauth.save_token("U1", &token_at(past, None)).expect("save");
    let err = oauth.access_token("U1").await.expect_err("expired");
    assert!(matches!(err, CalendarError::AuthRequired));
}

#[tokio::test]
async fn valid_token_is_returned_without_refresh() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oauth = manager(dir.path());
    let later = now_offset(3600);
    oauth.save_token("U1", &token_at(later, None)).expect("save");
    let access = oauth.access_token("U1").await.expect("valid token");
    assert_eq!(access, "access");
}

// ---------------------------------------------------------------------------
// auth_url
// ---------------------------------------------------------------------------

#[test]
fn auth_url_escapes_the_redirect_uri() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oauth = manager(dir.path());
    let url = oauth.auth_url("U42");
    assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Foauth%2Fcallback"));
    assert!(url.contains("prompt=consent"));
    assert!(url.contains("response_type=code"));
}
