mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::TestApp;
use serde_json::Value;
use shortlink::domain::entities::VisitEvent;
use shortlink::domain::repositories::VisitRepository;

#[tokio::test]
async fn test_stats_without_days() {
    let app = TestApp::new();
    app.seed("stats01", "https://example.com/s", None).await;

    let response = app.server.get("/stats/stats01").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["code"], "stats01");
    assert_eq!(body["target_url"], "https://example.com/s");
    assert_eq!(body["visit_count"], 0);
    assert!(body["last_visited_at"].is_null());
    assert!(body.get("daily").is_none());
}

#[tokio::test]
async fn test_stats_with_daily_window() {
    let app = TestApp::new();
    app.seed("stats02", "https://example.com", None).await;

    let visits: Vec<VisitEvent> = (0..3)
        .map(|_| VisitEvent::new("stats02".to_string(), None, None))
        .collect();
    app.repo.record_batch(&visits).await.unwrap();

    let response = app.server.get("/stats/stats02").add_query_param("days", 7).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["visit_count"], 3);
    assert!(body["last_visited_at"].is_string());

    // Days without visits are omitted.
    let daily = body["daily"].as_array().unwrap();
    assert_eq!(daily.len(), 1);
    assert_eq!(daily[0]["day"], Utc::now().date_naive().to_string());
    assert_eq!(daily[0]["count"], 3);
}

#[tokio::test]
async fn test_stats_bad_days() {
    let app = TestApp::new();
    app.seed("stats03", "https://example.com", None).await;

    for days in ["0", "366"] {
        let response = app
            .server
            .get("/stats/stats03")
            .add_query_param("days", days)
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "days={days}");
    }

    let response = app
        .server
        .get("/stats/stats03")
        .add_query_param("days", "week")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_not_found() {
    let app = TestApp::new();

    let response = app.server.get("/stats/missing1").await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_stats_for_expired_link() {
    let app = TestApp::new();
    app.seed(
        "gone01",
        "https://example.com",
        Some(Utc::now() - chrono::Duration::minutes(5)),
    )
    .await;

    let response = app.server.get("/stats/gone01").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["expires_at"].is_string());
}
