use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{
    config::{GateConfig, MetricsMode},
    dashboard::{
        client::MetricsClient, fetch_with_fallback, map_summary_to_dashboard,
        text::parse_text_export, timestamp, unconfigured_stats, unreachable_stats, DashboardStats,
    },
};

pub struct AppState {
    pub metrics: MetricsClient,
    pub gate: GateConfig,
}

/// Builds the dashboard router: open API routes plus the Basic-auth gated
/// status page. CORS and request tracing wrap everything.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let gated = Router::new()
        .route("/", get(index))
        .layer(middleware::from_fn_with_state(state.clone(), basic_auth_gate));

    Router::new()
        .route("/api/stats", get(stats))
        .route("/api/ping", get(ping))
        .merge(gated)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Shared-credential gate for the non-API pages. API routes and assets are
/// deliberately outside this layer.
async fn basic_auth_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if state.gate.accepts(authorization) {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            [(
                header::WWW_AUTHENTICATE,
                "Basic realm=\"Sofia Ops Dashboard\"",
            )],
            "Authentication required",
        )
            .into_response()
    }
}

/// `GET /api/stats` — always 200; fallback data on upstream failure.
async fn stats(State(state): State<Arc<AppState>>) -> Json<DashboardStats> {
    Json(fetch_stats(&state.metrics).await)
}

pub async fn fetch_stats(metrics: &MetricsClient) -> DashboardStats {
    if !metrics.is_configured() {
        return unconfigured_stats();
    }

    let fetched = match metrics.config().mode {
        MetricsMode::Summary => {
            fetch_with_fallback(
                async {
                    let summary = metrics.summary().await?;
                    Ok(map_summary_to_dashboard(&summary))
                },
                unreachable_stats,
            )
            .await
        }
        MetricsMode::Text => {
            fetch_with_fallback(
                async {
                    let export = metrics.text_export().await?;
                    Ok(parse_text_export(&export).into_stats())
                },
                unreachable_stats,
            )
            .await
        }
    };

    let fallback = fetched.is_fallback();
    let mut stats = fetched.value;
    if fallback {
        stats.mock_data = true;
    }
    stats
}

/// `GET /api/ping` — health passthrough; always 200, static payload when the
/// upstream is unreachable or unconfigured.
async fn ping(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(fetch_ping(&state.metrics).await)
}

pub async fn fetch_ping(metrics: &MetricsClient) -> Value {
    let base = json!({
        "status": "healthy",
        "service": "sofia-lite",
        "timestamp": timestamp(),
    });

    match metrics.health().await {
        Ok(health) => merge_health(base, health),
        Err(err) => {
            tracing::warn!(error = %err, "health passthrough failed, serving static payload");
            let mut payload = base;
            if let Value::Object(obj) = &mut payload {
                obj.insert("orchestrator".to_string(), json!("ready"));
                obj.insert("message".to_string(), json!("Sofia Lite è operativa!"));
            }
            payload
        }
    }
}

/// Upstream health fields overlay the base payload, matching the existing
/// passthrough shape.
fn merge_health(base: Value, health: Value) -> Value {
    match base {
        Value::Object(mut merged) => {
            if let Value::Object(upstream) = health {
                for (key, value) in upstream {
                    merged.insert(key, value);
                }
            }
            Value::Object(merged)
        }
        other => other,
    }
}

async fn index() -> Html<&'static str> {
    Html(
        "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\">\
         <title>Sofia Ops Dashboard</title></head>\n<body>\n\
         <h1>Sofia Ops Dashboard</h1>\n\
         <p>KPI data: <a href=\"/api/stats\">/api/stats</a> \
         &middot; service health: <a href=\"/api/ping\">/api/ping</a></p>\n\
         </body>\n</html>\n",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_health_overlays_upstream_fields() {
        let base = json!({"status": "healthy", "service": "sofia-lite"});
        let health = json!({"status": "degraded", "orchestrator": "ready"});
        let merged = merge_health(base, health);
        assert_eq!(merged["status"], "degraded");
        assert_eq!(merged["service"], "sofia-lite");
        assert_eq!(merged["orchestrator"], "ready");
    }

    #[tokio::test]
    async fn unconfigured_metrics_serve_mock_stats() {
        let metrics = MetricsClient::from_config(crate::config::MetricsConfig::unconfigured())
            .unwrap();
        let stats = fetch_stats(&metrics).await;
        assert!(stats.mock_data);
        assert_eq!(stats.new_leads, 30.0);
        assert_eq!(stats.response_time, 1.9);
    }

    #[tokio::test]
    async fn unconfigured_metrics_serve_static_ping() {
        let metrics = MetricsClient::from_config(crate::config::MetricsConfig::unconfigured())
            .unwrap();
        let payload = fetch_ping(&metrics).await;
        assert_eq!(payload["status"], "healthy");
        assert_eq!(payload["service"], "sofia-lite");
        assert_eq!(payload["message"], "Sofia Lite è operativa!");
    }
}
