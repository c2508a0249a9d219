use std::{env, time::Duration};

use base64::{engine::general_purpose::STANDARD, Engine as _};

const DEFAULT_SOFIA_URL: &str = "http://localhost:8000";
const DEFAULT_METRICS_TOKEN: &str = "changeme";

/// Connection settings for the Sofia Lite service under test.
#[derive(Debug, Clone)]
pub struct SofiaConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl SofiaConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_env() -> Self {
        let base_url = env::var("SOFIA_URL").unwrap_or_else(|_| DEFAULT_SOFIA_URL.to_string());
        Self::new(base_url)
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

/// Which upstream representation `/api/stats` is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsMode {
    /// JSON `SummaryMetrics` from `/metrics/summary` (authoritative).
    Summary,
    /// Flat text export from `/metrics`, for deployments without the summary endpoint.
    Text,
}

/// Settings for the metrics source consumed by the dashboard API.
///
/// `base_url: None` means no live source is configured; the aggregator then
/// serves its mock snapshot.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub base_url: Option<String>,
    pub token: String,
    pub mode: MetricsMode,
    pub request_timeout: Duration,
}

impl MetricsConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            token: DEFAULT_METRICS_TOKEN.to_string(),
            mode: MetricsMode::Summary,
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            base_url: None,
            token: DEFAULT_METRICS_TOKEN.to_string(),
            mode: MetricsMode::Summary,
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_env() -> Self {
        let mut config = match env::var("METRICS_URL") {
            Ok(url) if !url.is_empty() => Self::new(url),
            _ => Self::unconfigured(),
        };
        if let Ok(token) = env::var("METRICS_TOKEN") {
            config.token = token;
        }
        if let Ok(mode) = env::var("METRICS_MODE") {
            if mode.eq_ignore_ascii_case("text") {
                config.mode = MetricsMode::Text;
            }
        }
        config
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_mode(mut self, mode: MetricsMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

/// Shared-credential Basic auth gate for the dashboard pages.
#[derive(Debug, Clone)]
pub struct GateConfig {
    expected: String,
}

impl GateConfig {
    pub fn new(user: &str, pass: &str) -> Self {
        let expected = format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")));
        Self { expected }
    }

    pub fn from_env() -> Self {
        let user = env::var("BASIC_AUTH_USER").unwrap_or_else(|_| "opsviewer".to_string());
        let pass = env::var("BASIC_AUTH_PASS").unwrap_or_else(|_| "strongpassword".to_string());
        Self::new(&user, &pass)
    }

    /// Whole-header comparison, same as the shared-credential check the
    /// dashboard middleware performs.
    pub fn accepts(&self, authorization: Option<&str>) -> bool {
        authorization == Some(self.expected.as_str())
    }
}
