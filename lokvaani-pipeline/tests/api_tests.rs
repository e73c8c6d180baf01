//! HTTP API integration tests

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use helpers::{analyze_comment, create_test_db, fake_services, seed_comment};
use http_body_util::BodyExt;
use lokvaani_common::db::Sentiment;
use lokvaani_pipeline::config::PipelineConfig;
use lokvaani_pipeline::{build_router, AppState};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

async fn create_test_app() -> (TempDir, Router, SqlitePool) {
    let (dir, pool) = create_test_db().await.unwrap();
    let mut config = PipelineConfig::default();
    config.intake_timeout = Duration::from_millis(50);
    config.rag.chunk_delay = Duration::ZERO;
    config.rag.batch_delay = Duration::ZERO;

    let state = AppState::new(pool.clone(), &fake_services(), &config);
    (dir, build_router(state), pool)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app, _pool) = create_test_app().await;

    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "lokvaani-pipeline");
    assert_eq!(body["pipeline"]["failed"], 0);
}

#[tokio::test]
async fn test_counts_endpoint() {
    let (_dir, app, pool) = create_test_app().await;
    let c = seed_comment(&pool, "p1", None, "Support").await.unwrap();
    analyze_comment(&pool, &c.id, Some(Sentiment::Positive), &["support"]).await.unwrap();

    let (status, body) = send(app, get("/posts/p1/counts")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"positive": 1, "negative": 0, "neutral": 0, "total": 1}));
}

#[tokio::test]
async fn test_keywords_endpoint_honours_limit() {
    let (_dir, app, pool) = create_test_app().await;
    let c = seed_comment(&pool, "p1", None, "Text").await.unwrap();
    analyze_comment(&pool, &c.id, Some(Sentiment::Neutral), &["fees", "timeline", "clause"]).await.unwrap();

    let (status, body) = send(app, get("/posts/p1/keywords?limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["keyword"], "fees");
}

#[tokio::test]
async fn test_events_rejects_unknown_channel() {
    let (_dir, app, _pool) = create_test_app().await;

    let (status, body) = send(app, get("/events?channels=total-count-update,bogus")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

/// Read body frames until one complete SSE event; returns (event name, data)
async fn next_sse_event(body: &mut Body) -> (String, Value) {
    let mut buffer = String::new();
    while !buffer.contains("\n\n") {
        let frame = body.frame().await.unwrap().unwrap();
        if let Ok(data) = frame.into_data() {
            buffer.push_str(std::str::from_utf8(&data).unwrap());
        }
    }

    let mut event = String::new();
    let mut data = Value::Null;
    for line in buffer.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = name.trim().to_string();
        } else if let Some(payload) = line.strip_prefix("data:") {
            data = serde_json::from_str(payload.trim()).unwrap();
        }
    }
    (event, data)
}

#[tokio::test]
async fn test_events_first_frame_is_fresh_snapshot() {
    let (_dir, pool) = create_test_db().await.unwrap();
    for (text, sentiment) in [
        ("Support", Sentiment::Positive),
        ("Oppose", Sentiment::Negative),
        ("Fine", Sentiment::Positive),
    ] {
        let c = seed_comment(&pool, "p1", None, text).await.unwrap();
        analyze_comment(&pool, &c.id, Some(sentiment), &[]).await.unwrap();
    }

    let state = AppState::new(pool.clone(), &fake_services(), &PipelineConfig::default());
    let expected = state.aggregation.counts(None).await.unwrap();
    let broadcast = state.broadcast.clone();
    let app = build_router(state);

    let response = app.oneshot(get("/events?channels=total-count-update")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    let mut body = response.into_body();

    let (event, data) = next_sse_event(&mut body).await;
    assert_eq!(event, "total-count-update");
    assert_eq!(data, serde_json::to_value(expected).unwrap());
    assert_eq!(data, json!({"positive": 2, "negative": 1, "neutral": 0, "total": 3}));

    // A tick publishes every channel; only the subscribed one comes through
    assert_eq!(broadcast.tick().await.unwrap(), 4);
    let (event, _) = next_sse_event(&mut body).await;
    assert_eq!(event, "total-count-update");

    let nothing_more = tokio::time::timeout(Duration::from_millis(200), body.frame()).await;
    assert!(nothing_more.is_err());
}

#[tokio::test]
async fn test_summary_lifecycle() {
    let (_dir, app, _pool) = create_test_app().await;

    let (status, _) = send(app.clone(), get("/posts/p1/summaries/latest")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, created) = send(app.clone(), with_json("POST", "/posts/p1/summaries", json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, latest) = send(app.clone(), get("/posts/p1/summaries/latest")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["id"], id.as_str());

    let (status, by_id) = send(app, get(&format!("/summaries/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_id["category_summaries"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_submit_comment_returns_pending_record() {
    let (_dir, app, _pool) = create_test_app().await;

    let request = with_json(
        "POST",
        "/comments",
        json!({"post_id": "p1", "content": {"type": "text", "comment": "Please extend the deadline"}}),
    );
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["completed"], false);
    assert_eq!(body["comment"]["status"], "RAW");
}

#[tokio::test]
async fn test_submit_empty_comment_is_bad_request() {
    let (_dir, app, _pool) = create_test_app().await;

    let request = with_json(
        "POST",
        "/comments",
        json!({"post_id": "p1", "content": {"type": "text", "comment": "  "}}),
    );
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_agent_sync_and_status() {
    let (_dir, app, _pool) = create_test_app().await;

    let (status, _) = send(app.clone(), with_json("POST", "/agent/sync", json!({"postId": "p1"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        app.clone(),
        with_json(
            "PUT",
            "/posts/p1",
            json!({"title": "Draft Rules", "extracted_text": "Rule 1 applies to every registered valuer in the country from the notified date."}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, report) = send(app.clone(), with_json("POST", "/agent/sync", json!({"postId": "p1"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["processedChunks"], 1);

    let (status, agent) = send(app, get("/agent/status/p1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(agent["isInitialized"], true);
    assert_eq!(agent["needsSync"], false);
}

#[tokio::test]
async fn test_agent_ask() {
    let (_dir, app, _pool) = create_test_app().await;

    let (status, body) = send(
        app,
        with_json("POST", "/agent/ask", json!({"postId": "p1", "question": "Summarize concerns"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Answer to: Summarize concerns");
    assert_eq!(body["context"]["hasStatistics"], false);
}
