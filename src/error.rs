use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpsError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse flow file: {0}")]
    FlowParse(#[from] serde_yaml::Error),

    #[error("METRICS_URL is not configured")]
    Unconfigured,

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("target service unhealthy: health check returned status {0}")]
    UnhealthyTarget(u16),
}
