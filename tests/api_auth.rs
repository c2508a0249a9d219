use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use sofia_ops::api::{router, AppState};
use sofia_ops::{GateConfig, MetricsClient, MetricsConfig};
use tower::ServiceExt;

fn app() -> axum::Router {
    let state = Arc::new(AppState {
        metrics: MetricsClient::from_config(MetricsConfig::unconfigured()).unwrap(),
        gate: GateConfig::new("opsviewer", "strongpassword"),
    });
    router(state)
}

#[tokio::test]
async fn unauthenticated_page_gets_basic_challenge() {
    let response = app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    assert!(challenge.starts_with("Basic"), "got challenge: {challenge}");
}

#[tokio::test]
async fn authorized_page_renders() {
    // base64("opsviewer:strongpassword")
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(
                    header::AUTHORIZATION,
                    "Basic b3Bzdmlld2VyOnN0cm9uZ3Bhc3N3b3Jk",
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8_lossy(&body);
    assert!(html.contains("Sofia Ops Dashboard"));
}

#[tokio::test]
async fn wrong_credentials_are_rejected() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::AUTHORIZATION, "Basic d3Jvbmc6Y3JlZHM=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn api_stats_is_open_and_never_errors() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();
    // No metrics source configured, so the mock snapshot is served.
    assert_eq!(stats["mockData"], true);
    assert_eq!(stats["newLeads"], 30.0);
    assert_eq!(stats["uptime"], 99.8);
    assert!(stats["lastUpdate"].is_string());
}

#[tokio::test]
async fn api_ping_is_open_and_never_errors() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/ping")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(payload["status"], "healthy");
    assert_eq!(payload["service"], "sofia-lite");
}
