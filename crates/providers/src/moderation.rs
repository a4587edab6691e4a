use crate::traits::*;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// HTTP client for the image moderation service.
///
/// Posts `{"url": ...}` and expects `{"context": ..., "blocked": ...}` back.
pub struct RemoteModerator {
    client: Client,
    endpoint: String,
    timeout_secs: u64,
}

impl RemoteModerator {
    pub fn new(endpoint: String, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            endpoint,
            timeout_secs,
        }
    }
}

#[async_trait]
impl ImageModerator for RemoteModerator {
    async fn moderate(&self, url: &str) -> Result<ModerationVerdict, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "url": url }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout_secs)
                } else {
                    ProviderError::Http(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("{}: {}", status, text)));
        }

        response
            .json::<ModerationVerdict>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}
