//! Anthropic Claude implementation of [`AnalysisProvider`].
//!
//! Sends the assembled prompt to the Messages API and hands the reply text to
//! [`BaseProvider`] for fence stripping and validation.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use solution_analyzer::analysis::{AnalysisProvider, AnalysisRequest, ClaudeProvider, ProblemContext};
//! use solution_analyzer::AnalysisConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalysisConfig::from_env()?;
//!     let provider = ClaudeProvider::new(&config)?;
//!
//!     let request = AnalysisRequest::new(ProblemContext::default(), "fn main() {}");
//!     let result = provider.analyze_comprehensively(request).await?;
//!     println!("score: {}", result.overall_score);
//!     Ok(())
//! }
//! ```

use crate::analysis::base::BaseProvider;
use crate::analysis::error::ProviderError;
use crate::analysis::http::HttpBackend;
use crate::analysis::provider::AnalysisProvider;
use crate::analysis::types::{AnalysisRequest, AnalysisResult, ProviderId};
use crate::config::AnalysisConfig;
use crate::env;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

const SYSTEM_MESSAGE: &str =
    "You are a code review assistant. Always answer with a single valid JSON object.";

pub struct ClaudeProvider {
    base: BaseProvider,
    http: HttpBackend,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

impl ClaudeProvider {
    pub fn new(config: &AnalysisConfig) -> Result<Self, ProviderError> {
        let name = ProviderId::Claude.as_str();
        let http = HttpBackend::new(name, config, config.claude.clone(), env::claude::API_KEY)?;

        Ok(Self {
            base: BaseProvider::new(name, config.retry.clone()),
            http,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("x-api-key", self.http.api_key())
            .header("anthropic-version", env::claude::API_VERSION)
    }

    async fn send_prompt(&self, prompt: &str) -> Result<AnalysisResult, ProviderError> {
        let name = self.base.provider_name();
        let settings = self.http.settings();
        let body = MessagesRequest {
            model: &settings.model,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            system: SYSTEM_MESSAGE,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let request = self
            .authorized(self.http.client().post(self.http.endpoint("/v1/messages")))
            .json(&body);
        let text = self.http.send(request).await?;

        let envelope: MessagesResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::parsing(name, format!("unexpected Messages API body: {}", e))
        })?;
        let reply: String = envelope
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();
        if reply.trim().is_empty() {
            return Err(ProviderError::parsing(name, "reply contained no text content"));
        }

        self.base.parse_response(&reply)
    }
}

impl AnalysisProvider for ClaudeProvider {
    fn analyze_comprehensively(
        &self,
        request: AnalysisRequest,
    ) -> BoxFuture<'_, Result<AnalysisResult, ProviderError>> {
        Box::pin(async move {
            let prompt = self.base.build_prompt(&request);
            let prompt = prompt.as_str();
            debug!(
                provider = self.base.provider_name(),
                request_id = %request.id,
                prompt_chars = prompt.len(),
                "Sending analysis request"
            );
            self.base
                .execute_with_retry(|_| self.send_prompt(prompt))
                .await
        })
    }

    fn provider_name(&self) -> &str {
        self.base.provider_name()
    }

    fn is_healthy(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            let probe = self.authorized(self.http.client().get(self.http.endpoint("/v1/models")));
            self.http.probe(probe).await
        })
    }

    fn get_configuration(&self) -> HashMap<String, serde_json::Value> {
        let mut configuration = self.http.configuration(self.base.retry_config());
        configuration.insert("apiVersion".to_string(), serde_json::json!(env::claude::API_VERSION));
        configuration
    }
}
