//! HTTP plumbing shared by the backend providers.
//!
//! [`HttpBackend`] owns the client, credentials and timeouts for one vendor.
//! Providers build the vendor-specific request and hand it to
//! [`HttpBackend::send`], which bounds it by the request timeout and maps
//! transport failures and non-2xx statuses into [`ProviderError`].

use crate::analysis::error::ProviderError;
use crate::config::{AnalysisConfig, BackendSettings, RetryConfig};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

pub struct HttpBackend {
    provider_name: &'static str,
    client: reqwest::Client,
    settings: BackendSettings,
    api_key: String,
    request_timeout: Duration,
    health_timeout: Duration,
}

impl HttpBackend {
    /// Build the client for one backend. A missing key is a configuration
    /// error naming `key_variable`.
    pub fn new(
        provider_name: &'static str,
        config: &AnalysisConfig,
        settings: BackendSettings,
        key_variable: &str,
    ) -> Result<Self, ProviderError> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            ProviderError::configuration(
                provider_name,
                format!("{} is required for the {} provider", key_variable, provider_name),
            )
        })?;

        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                ProviderError::configuration(
                    provider_name,
                    format!("failed to build HTTP client: {}", e),
                )
            })?;

        info!(provider = provider_name, model = %settings.model, "Initialized analysis provider");

        Ok(Self {
            provider_name,
            client,
            settings,
            api_key,
            request_timeout: config.request_timeout(),
            health_timeout: config.health_timeout(),
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Send a request and return the body of a 2xx reply.
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, ProviderError> {
        let name = self.provider_name;
        let call = async {
            let response = request
                .send()
                .await
                .map_err(|e| ProviderError::from_reqwest(name, e))?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| ProviderError::from_reqwest(name, e))?;

            if !status.is_success() {
                return Err(ProviderError::from_status(name, status.as_u16(), &text));
            }
            Ok::<_, ProviderError>(text)
        };

        tokio::time::timeout(self.request_timeout, call)
            .await
            .map_err(|_| {
                ProviderError::timeout(
                    name,
                    format!("no response within {} ms", self.request_timeout.as_millis()),
                )
            })?
    }

    /// True only when the probe answers 2xx within the health timeout.
    pub async fn probe(&self, request: reqwest::RequestBuilder) -> bool {
        match tokio::time::timeout(self.health_timeout, request.send()).await {
            Ok(Ok(response)) => response.status().is_success(),
            Ok(Err(e)) => {
                debug!(provider = self.provider_name, "Health probe failed: {}", e);
                false
            }
            Err(_) => {
                debug!(provider = self.provider_name, "Health probe timed out");
                false
            }
        }
    }

    /// Configuration entries common to every HTTP backend. Never includes the key.
    pub fn configuration(&self, retry: &RetryConfig) -> HashMap<String, serde_json::Value> {
        HashMap::from([
            ("provider".to_string(), json!(self.provider_name)),
            ("model".to_string(), json!(self.settings.model)),
            ("baseUrl".to_string(), json!(self.settings.base_url)),
            ("maxTokens".to_string(), json!(self.settings.max_tokens)),
            ("temperature".to_string(), json!(self.settings.temperature)),
            (
                "timeoutMs".to_string(),
                json!(self.request_timeout.as_millis() as u64),
            ),
            ("maxAttempts".to_string(), json!(retry.max_attempts)),
        ])
    }
}
