use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use chrono::{NaiveDate, TimeZone, Utc};
use http_body_util::BodyExt;
use standup_core::calendar::Holiday;
use standup_core::config::Config;
use standup_core::notify::{LogNotifier, RetryPolicy};
use standup_core::paths;
use standup_core::scheduler::{FixedClock, Scheduler};
use standup_core::store::Store;
use standup_core::types::Member;
use standup_server::state::AppState;
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Initialise a project with two members and a July 4th holiday.
fn setup() -> (TempDir, AppState) {
    let dir = TempDir::new().unwrap();
    let mut config = Config::new("acme");
    config.holidays = vec![Holiday::Date(NaiveDate::from_ymd_opt(2024, 7, 4).unwrap())];
    config.save(dir.path()).unwrap();

    let store = Store::open(&paths::db_path(dir.path())).unwrap();
    store.upsert_member(Member::new("alice", "Alice", "U1")).unwrap();
    store.upsert_member(Member::new("bob", "Bob", "U2")).unwrap();

    let scheduler = Scheduler::new(store, &config, Arc::new(LogNotifier))
        .unwrap()
        .with_retry(RetryPolicy::immediate(1));
    let state = AppState::new(dir.path().to_path_buf(), scheduler);
    (dir, state)
}

fn app(state: &AppState) -> axum::Router {
    standup_server::build_router(state.clone())
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Send a POST request with a JSON body via `oneshot` and return (status, parsed JSON body).
async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn trigger(state: &AppState, kind: &str, date: &str) -> (StatusCode, serde_json::Value) {
    post_json(
        app(state),
        "/api/runs/trigger",
        serde_json::json!({ "kind": kind, "date": date }),
    )
    .await
}

// ---------------------------------------------------------------------------
// Status and calendar
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_lists_missing_members() {
    let (_dir, state) = setup();
    let (status, json) = get(app(&state), "/api/status?date=2024-06-03").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["working_day"], true);
    assert_eq!(json["missing"], serde_json::json!(["alice", "bob"]));
    assert_eq!(json["triggers"][0]["status"], "not_started");
}

#[tokio::test]
async fn calendar_reports_holidays() {
    let (_dir, state) = setup();
    let (status, json) = get(app(&state), "/api/calendar/2024-07-04").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["working_day"], false);
    assert_eq!(json["rest_reason"], "holiday");
    assert_eq!(json["next_working_day"], "2024-07-05");
}

#[tokio::test]
async fn calendar_rejects_malformed_date() {
    let (_dir, state) = setup();
    let (status, json) = get(app(&state), "/api/calendar/July-4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("YYYY-MM-DD"));
}

#[tokio::test]
async fn members_are_listed() {
    let (_dir, state) = setup();
    let (status, json) = get(app(&state), "/api/members").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[0]["id"], "alice");
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_report_conflicts() {
    let (_dir, state) = setup();
    let body = serde_json::json!({
        "member_id": "alice",
        "date": "2024-06-03",
        "fields": { "accomplishments": "shipped the parser" }
    });
    let (status, json) = post_json(app(&state), "/api/reports", body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["fields"]["accomplishments"], "shipped the parser");

    let (status, json) = post_json(app(&state), "/api/reports", body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("already submitted"));
}

#[tokio::test]
async fn report_from_unknown_member_is_404() {
    let (_dir, state) = setup();
    let (status, _) = post_json(
        app(&state),
        "/api/reports",
        serde_json::json!({ "member_id": "mallory", "date": "2024-06-03" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_settles_pending_escalation() {
    let (_dir, state) = setup();
    trigger(&state, "reminder:0", "2024-06-03").await;
    let (status, _) = post_json(
        app(&state),
        "/api/reports",
        serde_json::json!({ "member_id": "bob", "date": "2024-06-03" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, json) = get(app(&state), "/api/escalations?date=2024-06-03").await;
    let bob = json
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["member_id"] == "bob")
        .unwrap();
    assert_eq!(bob["standing"]["type"], "satisfied");
    assert_eq!(bob["standing"]["last_tier"], "reminded");
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trigger_reminder_advances_every_missing_member() {
    let (_dir, state) = setup();
    let (status, json) = trigger(&state, "reminder:0", "2024-06-03").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "completed");
    assert_eq!(json["run"]["summary"]["delivered"], 2);

    let (_, json) = get(app(&state), "/api/escalations?date=2024-06-03").await;
    let states = json.as_array().unwrap();
    assert_eq!(states.len(), 2);
    assert!(states
        .iter()
        .all(|s| s["standing"]["tier"] == "reminded" && s["delivery"]["type"] == "delivered"));
}

#[tokio::test]
async fn second_trigger_is_already_handled() {
    let (_dir, state) = setup();
    trigger(&state, "prompt", "2024-06-03").await;
    let (status, json) = trigger(&state, "prompt", "2024-06-03").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "already_handled");
    assert_eq!(json["run"]["attempts"], 1);
}

#[tokio::test]
async fn holiday_trigger_is_skipped() {
    let (_dir, state) = setup();
    let (_, json) = trigger(&state, "prompt", "2024-07-04").await;
    assert_eq!(json["outcome"], "skipped");
    assert_eq!(json["run"]["status"]["reason"], "holiday");
}

#[tokio::test]
async fn invalid_run_kind_is_400() {
    let (_dir, state) = setup();
    let (status, _) = trigger(&state, "nudge", "2024-06-03").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = trigger(&state, "reminder:9", "2024-06-03").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn runs_are_listed_by_date_and_recency() {
    let (_dir, state) = setup();
    trigger(&state, "prompt", "2024-06-03").await;
    trigger(&state, "prompt", "2024-06-04").await;

    let (_, json) = get(app(&state), "/api/runs?date=2024-06-03").await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["kind"]["type"], "prompt");

    let (_, json) = get(app(&state), "/api/runs?limit=1").await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["date"], "2024-06-04");
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[tokio::test]
async fn roster_sync_applies_roster_file_while_serving() {
    let (dir, state) = setup();
    let (_, json) = post_json(app(&state), "/api/roster/sync", serde_json::json!({})).await;
    assert_eq!(json["synced"], false);

    std::fs::write(
        paths::roster_path(dir.path()),
        "members:\n  - { id: alice, name: Alice, target: U1 }\n  - { id: carol, name: Carol, target: U3 }\n",
    )
    .unwrap();
    let (status, json) = post_json(app(&state), "/api/roster/sync", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["report"]["added"], serde_json::json!(["carol"]));
    assert_eq!(json["report"]["deactivated"], serde_json::json!(["bob"]));

    let (_, json) = get(app(&state), "/api/status?date=2024-06-03").await;
    assert_eq!(json["missing"], serde_json::json!(["alice", "carol"]));
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_is_not_held_up_by_an_open_event_stream() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::new("acme");
    config.schedule.shutdown_grace_seconds = 1;
    config.save(dir.path()).unwrap();
    let store = Store::open(&paths::db_path(dir.path())).unwrap();
    // Saturday midnight: nothing is due, so the daemon only idles.
    let saturday = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let scheduler = Scheduler::new(store, &config, Arc::new(LogNotifier))
        .unwrap()
        .with_clock(Arc::new(FixedClock::new(saturday)));
    let state = AppState::new(dir.path().to_path_buf(), scheduler);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(standup_server::serve_on(state, listener, async move {
        let _ = stopped.await;
    }));

    let events = reqwest::get(format!("http://{addr}/api/events")).await.unwrap();
    assert_eq!(events.status(), reqwest::StatusCode::OK);

    stop.send(()).unwrap();
    let served = tokio::time::timeout(Duration::from_secs(10), server)
        .await
        .expect("serve_on must return once the grace period ends")
        .unwrap();
    assert!(served.is_ok());
    drop(events);
}
