use async_trait::async_trait;
use reqwest::Client;

use crate::{
    config::SofiaConfig,
    error::OpsError,
    verifier::{ChatResponse, ChatTransport},
};

/// Production transport: form-encoded POSTs to the Sofia WhatsApp webhook.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: Client,
    config: SofiaConfig,
}

impl WebhookClient {
    pub fn from_config(config: SofiaConfig) -> Result<Self, OpsError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, OpsError> {
        Self::from_config(SofiaConfig::from_env())
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ChatTransport for WebhookClient {
    async fn send_message(&self, from: &str, body: &str) -> Result<ChatResponse, OpsError> {
        let response = self
            .client
            .post(self.endpoint("/webhook/whatsapp"))
            .form(&[("From", from), ("Body", body)])
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ChatResponse { status, body })
    }

    async fn health(&self) -> Result<u16, OpsError> {
        let response = self.client.get(self.endpoint("/health")).send().await?;
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_path_without_double_slash() {
        let client =
            WebhookClient::from_config(SofiaConfig::new("http://localhost:8000/")).unwrap();
        assert_eq!(
            client.endpoint("/webhook/whatsapp"),
            "http://localhost:8000/webhook/whatsapp"
        );
        assert_eq!(client.endpoint("health"), "http://localhost:8000/health");
    }
}
