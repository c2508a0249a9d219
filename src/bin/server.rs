use std::{net::SocketAddr, sync::Arc};

use sofia_ops::api::{router, AppState};
use sofia_ops::{GateConfig, MetricsClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,server=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let metrics = MetricsClient::from_env().expect("failed to build metrics client");
    if !metrics.is_configured() {
        tracing::warn!("METRICS_URL not set, /api/stats will serve mock data");
    }

    let state = Arc::new(AppState {
        metrics,
        gate: GateConfig::from_env(),
    });

    let app = router(state);

    let addr: SocketAddr = std::env::var("OPS_BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3002".to_string())
        .parse()
        .expect("invalid OPS_BIND_ADDR");
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
