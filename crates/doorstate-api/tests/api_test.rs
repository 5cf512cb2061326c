// Router tests against the in-memory history store
//
// Drives the real axum router in-process with tower's `oneshot`.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{FixedOffset, Utc};
use doorstate_api::{build_app, DoorService};
use doorstate_core::{
    sign, DoorState, History, HistoryWindow, InMemoryHistoryStore, SigningKey, StateEvent,
    SubmissionPolicy, SubmissionProtocol,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const KEY: &[u8] = b"correct horse battery staple";

fn key() -> SigningKey {
    SigningKey::from_bytes(KEY).unwrap()
}

fn app_with(store: InMemoryHistoryStore, window: HistoryWindow, prefix: &str) -> Router {
    app_with_policy(store, window, SubmissionPolicy::default(), prefix)
}

fn app_with_policy(
    store: InMemoryHistoryStore,
    window: HistoryWindow,
    policy: SubmissionPolicy,
    prefix: &str,
) -> Router {
    let service = DoorService::new(
        SubmissionProtocol::new(Arc::new(key()), policy),
        History::new(Arc::new(store), window),
        FixedOffset::east_opt(0).unwrap(),
    );
    build_app(Arc::new(service), prefix, &[])
}

fn app(store: InMemoryHistoryStore) -> Router {
    app_with(store, HistoryWindow::default(), "")
}

fn signed_json(seconds: i64, state: DoorState) -> Value {
    json!({
        "time": seconds,
        "state": state.as_str(),
        "hmac": sign(&key(), Some(seconds), state),
    })
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_submit_then_read_current() {
    let store = InMemoryHistoryStore::new();
    let app = app(store.clone());
    let now = Utc::now().timestamp();

    let (status, body) = send(&app, post_json("/door/", &signed_json(now, DoorState::Open))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"time": now, "state": "open"}));

    let (status, body) = send(&app, get("/door/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "open");
    assert_eq!(body["time"], now);
    assert!(body["text"].as_str().unwrap().starts_with("Open for"));
}

#[tokio::test]
async fn test_current_unknown_when_empty() {
    let app = app(InMemoryHistoryStore::new());

    let (status, body) = send(&app, get("/door/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "unknown");
    assert_eq!(body["time"], 0);
    assert_eq!(body["text"], "No door state recorded yet.");
}

#[tokio::test]
async fn test_resubmission_is_idempotent() {
    let store = InMemoryHistoryStore::new();
    let app = app(store.clone());
    let request = signed_json(Utc::now().timestamp() - 60, DoorState::Closed);

    for _ in 0..3 {
        let (status, _) = send(&app, post_json("/door/", &request)).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_same_timestamp_replaces_state() {
    let store = InMemoryHistoryStore::new();
    let app = app(store.clone());
    // Inside the default 365 day window, which is measured from the real clock
    let t0 = Utc::now().timestamp() - 60;

    send(&app, post_json("/door/", &signed_json(t0, DoorState::Open))).await;
    let (status, body) = send(&app, post_json("/door/", &signed_json(t0, DoorState::Closed))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "closed");

    assert_eq!(store.len().await, 1);
    let (_, body) = send(&app, get("/door/all/?from=0")).await;
    assert_eq!(body["data"], json!([{"time": t0, "state": "closed"}]));

    let (_, body) = send(&app, get("/door/")).await;
    assert_eq!(body["state"], "closed");
    assert_eq!(body["time"], t0);
}

#[tokio::test]
async fn test_concurrent_submissions_for_one_timestamp() {
    let store = InMemoryHistoryStore::new();
    let app = app(store.clone());
    let t0 = Utc::now().timestamp() - 60;

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let app = app.clone();
            let state = if i % 2 == 0 {
                DoorState::Open
            } else {
                DoorState::Closed
            };
            tokio::spawn(async move {
                let request = post_json("/door/", &signed_json(t0, state));
                app.oneshot(request).await.unwrap().status()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(store.len().await, 1);
    let (_, body) = send(&app, get("/door/all/")).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["time"], t0);
    assert!(data[0]["state"] == "open" || data[0]["state"] == "closed");
}

#[tokio::test]
async fn test_rejections_are_indistinguishable() {
    let store = InMemoryHistoryStore::new();
    let app = app(store.clone());
    let good = signed_json(1_700_000_000, DoorState::Open);

    let mut bad_signature = good.clone();
    bad_signature["hmac"] = json!("00".repeat(32));

    let mut tampered_state = good.clone();
    tampered_state["state"] = json!("closed");

    let mut bad_state = good.clone();
    bad_state["state"] = json!("ajar");

    let mut bad_time = good.clone();
    bad_time["time"] = json!("17e8");

    let mut missing_hmac = good.clone();
    missing_hmac.as_object_mut().unwrap().remove("hmac");

    let mut bodies = Vec::new();
    for request in [
        bad_signature,
        tampered_state,
        bad_state,
        bad_time,
        missing_hmac,
    ] {
        let (status, body) = send(&app, post_json("/door/", &request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        bodies.push(body);
    }

    assert!(bodies.iter().all(|b| b == &json!({"error": "Submission rejected"})));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_unreadable_body_is_rejected() {
    let app = app(InMemoryHistoryStore::new());

    let request = Request::builder()
        .method("POST")
        .uri("/door/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Submission rejected"}));
}

#[tokio::test]
async fn test_form_submission_with_aliases() {
    let store = InMemoryHistoryStore::new();
    let app = app(store.clone());
    let signature = sign(&key(), Some(1_700_000_000), DoorState::Open);

    let request = Request::builder()
        .method("POST")
        .uri("/door/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "timestamp=1700000000&state=open&signature={}",
            signature
        )))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"time": 1_700_000_000, "state": "open"}));
    assert_eq!(store.len().await, 1);
}

fn untimed_json(state: DoorState) -> Value {
    json!({
        "state": state.as_str(),
        "hmac": sign(&key(), None, state),
    })
}

#[tokio::test]
async fn test_submission_without_time_rejected_by_default() {
    let store = InMemoryHistoryStore::new();
    let app = app(store.clone());

    let (status, body) = send(&app, post_json("/door/", &untimed_json(DoorState::Open))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Submission rejected"}));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_submission_without_time_uses_receipt_time_when_allowed() {
    let store = InMemoryHistoryStore::new();
    let app = app_with_policy(
        store.clone(),
        HistoryWindow::default(),
        SubmissionPolicy::default().with_allow_untimed(true),
        "",
    );
    let before = Utc::now().timestamp();

    let (status, body) = send(&app, post_json("/door/", &untimed_json(DoorState::Open))).await;
    let after = Utc::now().timestamp();

    assert_eq!(status, StatusCode::OK);
    let time = body["time"].as_i64().unwrap();
    assert!(before <= time && time <= after);
}

#[tokio::test]
async fn test_history_is_clipped_to_window() {
    let store = InMemoryHistoryStore::new();
    let now = Utc::now().timestamp();
    store
        .seed((0..10).map(|i| {
            let state = if i % 2 == 0 {
                DoorState::Open
            } else {
                DoorState::Closed
            };
            StateEvent::from_seconds(now - 1000 + i * 60, state).unwrap()
        }))
        .await;
    let window = HistoryWindow::new(4, chrono::Duration::days(365));
    let app = app_with(store, window, "");

    // Asking for more than the window allows is narrowed silently
    let (status, body) = send(&app, get("/door/all/?limit=100")).await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 4);
    let times: Vec<i64> = data.iter().map(|e| e["time"].as_i64().unwrap()).collect();
    assert_eq!(
        times,
        vec![now - 1000 + 360, now - 1000 + 420, now - 1000 + 480, now - 1000 + 540]
    );

    let (_, body) = send(&app, get("/door/all/?limit=2")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = send(
        &app,
        get(&format!("/door/all/?from={}&to={}", now - 1000, now - 1000 + 60)),
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_history_bad_query() {
    let app = app(InMemoryHistoryStore::new());

    let (status, body) = send(&app, get("/door/all/?from=yesterday")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["error"].as_str().unwrap().is_empty());

    let (status, body) = send(&app, get(&format!("/door/all/?from={}", i64::MAX))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("from"));
}

#[tokio::test]
async fn test_stats_endpoint() {
    let store = InMemoryHistoryStore::new();
    let now = Utc::now().timestamp();
    store
        .seed([
            StateEvent::from_seconds(now - 7200, DoorState::Open).unwrap(),
            StateEvent::from_seconds(now - 3600, DoorState::Closed).unwrap(),
        ])
        .await;
    let app = app(store);

    let (status, body) = send(&app, get("/door/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["by"], "hour");
    assert_eq!(body["events"], 2);
    assert_eq!(body["buckets"].as_array().unwrap().len(), 24);
    let observed: i64 = body["buckets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["observed_seconds"].as_i64().unwrap())
        .sum();
    assert!((7199..=7201).contains(&observed));

    let (status, body) = send(&app, get("/door/stats?by=week")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["buckets"].as_array().unwrap().len(), 7 * 24);
    assert_eq!(body["buckets"][0]["weekday"], "Mon");

    let (status, body) = send(&app, get("/door/stats?by=weekly-totals")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("buckets").is_none());
    let open_hours: f64 = body["weeks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["open_hours"].as_f64().unwrap())
        .sum();
    assert!((open_hours - 1.0).abs() < 1e-9);

    let (status, _) = send(&app, get("/door/stats?by=fortnight")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_backend() {
    let app = app(InMemoryHistoryStore::new());

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_prefixed_routes() {
    let app = app_with(InMemoryHistoryStore::new(), HistoryWindow::default(), "/api");

    let (status, _) = send(&app, get("/api/door/")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get("/door/")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Health stays unprefixed
    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_openapi_document_lists_door_routes() {
    let app = app(InMemoryHistoryStore::new());

    let (status, body) = send(&app, get("/api-doc/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/door/").is_some());
    assert!(body["paths"].get("/door/all/").is_some());
    assert!(body["paths"].get("/door/stats").is_some());
}
