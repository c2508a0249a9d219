use reqwest::Client;
use serde_json::Value;

use crate::{
    config::MetricsConfig,
    dashboard::SummaryMetrics,
    error::OpsError,
};

/// Bearer-authenticated client for the Sofia metrics endpoints.
#[derive(Debug, Clone)]
pub struct MetricsClient {
    client: Client,
    config: MetricsConfig,
}

impl MetricsClient {
    pub fn from_config(config: MetricsConfig) -> Result<Self, OpsError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, OpsError> {
        Self::from_config(MetricsConfig::from_env())
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.config.base_url.is_some()
    }

    fn endpoint(&self, path: &str) -> Result<String, OpsError> {
        let base = self.config.base_url.as_deref().ok_or(OpsError::Unconfigured)?;
        Ok(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }

    /// `GET /metrics/summary` — structured JSON snapshot.
    pub async fn summary(&self) -> Result<SummaryMetrics, OpsError> {
        let url = self.endpoint("/metrics/summary")?;
        let summary = self
            .client
            .get(url)
            .bearer_auth(&self.config.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(summary)
    }

    /// `GET /metrics` — flat text export.
    pub async fn text_export(&self) -> Result<String, OpsError> {
        let url = self.endpoint("/metrics")?;
        let text = self
            .client
            .get(url)
            .bearer_auth(&self.config.token)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }

    /// `GET /health` — whatever JSON the service reports about itself.
    pub async fn health(&self) -> Result<Value, OpsError> {
        let url = self.endpoint("/health")?;
        let health = self
            .client
            .get(url)
            .bearer_auth(&self.config.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(health)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_client_refuses_endpoints() {
        let client = MetricsClient::from_config(MetricsConfig::unconfigured()).unwrap();
        assert!(!client.is_configured());
        assert!(matches!(
            client.endpoint("/metrics/summary"),
            Err(OpsError::Unconfigured)
        ));
    }

    #[test]
    fn endpoint_joins_cleanly() {
        let client =
            MetricsClient::from_config(MetricsConfig::new("https://sofia.example.com/")).unwrap();
        assert_eq!(
            client.endpoint("/metrics/summary").unwrap(),
            "https://sofia.example.com/metrics/summary"
        );
    }
}
