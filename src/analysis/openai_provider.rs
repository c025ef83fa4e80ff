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
use tracing::{debug, warn};

const SYSTEM_MESSAGE: &str =
    "You are a code review assistant. Always answer with a single valid JSON object.";

/// OpenAI Chat Completions backed provider.
pub struct OpenAIProvider {
    base: BaseProvider,
    http: HttpBackend,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIProvider {
    pub fn new(config: &AnalysisConfig) -> Result<Self, ProviderError> {
        let name = ProviderId::OpenAI.as_str();
        let http = HttpBackend::new(name, config, config.openai.clone(), env::openai::API_KEY)?;

        Ok(Self {
            base: BaseProvider::new(name, config.retry.clone()),
            http,
        })
    }

    async fn send_prompt(&self, prompt: &str) -> Result<AnalysisResult, ProviderError> {
        let name = self.base.provider_name();
        let settings = self.http.settings();
        let body = ChatCompletionRequest {
            model: &settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_MESSAGE,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let request = self
            .http
            .client()
            .post(self.http.endpoint("/v1/chat/completions"))
            .bearer_auth(self.http.api_key())
            .json(&body);
        let text = self.http.send(request).await?;

        let completion: ChatCompletionResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::parsing(name, format!("unexpected chat completion body: {}", e))
        })?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::parsing(name, "completion contained no choices"))?;

        if choice.finish_reason.as_deref() == Some("length") {
            warn!(provider = name, "Completion was truncated at max_tokens");
        }

        let reply = choice
            .message
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::parsing(name, "completion message had no content"))?;

        self.base.parse_response(&reply)
    }
}

impl AnalysisProvider for OpenAIProvider {
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
            let probe = self
                .http
                .client()
                .get(self.http.endpoint("/v1/models"))
                .bearer_auth(self.http.api_key());
            self.http.probe(probe).await
        })
    }

    fn get_configuration(&self) -> HashMap<String, serde_json::Value> {
        let mut configuration = self.http.configuration(self.base.retry_config());
        configuration.insert("responseFormat".to_string(), serde_json::json!("json_object"));
        configuration
    }
}
