//! Configuration for the analysis layer.
//!
//! Values come from the process environment ([`AnalysisConfig::from_env`]),
//! from any key/value source ([`AnalysisConfig::from_lookup`]) or from a TOML
//! file ([`AnalysisConfig::from_toml_file`]). Invalid values are reported as
//! [`ProviderError::Configuration`] at construction time.

use crate::analysis::{ProviderError, ProviderId};
use crate::env;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const CONFIG_SCOPE: &str = "analysis";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub primary_provider: ProviderId,
    pub fallback_enabled: bool,
    pub fallback_provider: ProviderId,
    pub request_timeout_ms: u64,
    pub health_timeout_ms: u64,
    pub retry: RetryConfig,
    pub claude: BackendSettings,
    pub openai: BackendSettings,
}

/// Bounded linear backoff: delay before retry `n` is `retry_delay_base_ms * n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub retry_delay_base_ms: u64,
}

/// Settings for one HTTP backend. The API key is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            primary_provider: ProviderId::OpenAI,
            fallback_enabled: true,
            fallback_provider: ProviderId::Claude,
            request_timeout_ms: env::defaults::REQUEST_TIMEOUT_MS,
            health_timeout_ms: env::defaults::HEALTH_TIMEOUT_MS,
            retry: RetryConfig::default(),
            claude: BackendSettings::claude_defaults(),
            openai: BackendSettings::openai_defaults(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: env::defaults::MAX_ATTEMPTS,
            retry_delay_base_ms: env::defaults::RETRY_DELAY_BASE_MS,
        }
    }
}

impl RetryConfig {
    pub fn retry_delay_base(&self) -> Duration {
        Duration::from_millis(self.retry_delay_base_ms)
    }

    /// Delay to wait after the given (1-based) failed attempt. Saturates
    /// instead of overflowing.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.retry_delay_base()
            .checked_mul(attempt)
            .unwrap_or(Duration::MAX)
    }
}

impl BackendSettings {
    pub fn claude_defaults() -> Self {
        Self {
            api_key: None,
            model: env::claude::DEFAULT_MODEL.to_string(),
            base_url: env::claude::DEFAULT_BASE_URL.to_string(),
            max_tokens: env::defaults::MAX_TOKENS,
            temperature: env::defaults::TEMPERATURE,
        }
    }

    pub fn openai_defaults() -> Self {
        Self {
            api_key: None,
            model: env::openai::DEFAULT_MODEL.to_string(),
            base_url: env::openai::DEFAULT_BASE_URL.to_string(),
            max_tokens: env::defaults::MAX_TOKENS,
            temperature: env::defaults::TEMPERATURE,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source, starting from defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file. Credentials still come from the environment.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(
                CONFIG_SCOPE,
                format!("cannot read {}: {}", path.display(), e),
            )
        })?;
        let mut config: AnalysisConfig = toml::from_str(&content).map_err(|e| {
            ProviderError::configuration(
                CONFIG_SCOPE,
                format!("invalid TOML in {}: {}", path.display(), e),
            )
        })?;
        debug!("Loaded analysis configuration from {:?}", path);

        if config.claude.api_key.is_none() {
            config.claude.api_key = non_empty(std::env::var(env::claude::API_KEY).ok());
        }
        if config.openai.api_key.is_none() {
            config.openai.api_key = non_empty(std::env::var(env::openai::API_KEY).ok());
        }
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML (credentials omitted)
    pub fn to_toml_string(&self) -> Result<String, ProviderError> {
        toml::to_string_pretty(self)
            .map_err(|e| ProviderError::configuration(CONFIG_SCOPE, e.to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    pub fn backend(&self, id: ProviderId) -> &BackendSettings {
        match id {
            ProviderId::Claude => &self.claude,
            ProviderId::OpenAI => &self.openai,
        }
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));

        if let Some(value) = get(env::ANALYSIS_PROVIDER) {
            self.primary_provider = value.parse()?;
        }
        if let Some(value) = get(env::ANALYSIS_FALLBACK_PROVIDER) {
            self.fallback_provider = value.parse()?;
        }
        if let Some(value) = get(env::ANALYSIS_FALLBACK_ENABLED) {
            self.fallback_enabled = parse_bool(env::ANALYSIS_FALLBACK_ENABLED, &value)?;
        }
        if let Some(value) = get(env::ANALYSIS_TIMEOUT_MS) {
            self.request_timeout_ms = parse_number(env::ANALYSIS_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = get(env::ANALYSIS_HEALTH_TIMEOUT_MS) {
            self.health_timeout_ms = parse_number(env::ANALYSIS_HEALTH_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = get(env::ANALYSIS_MAX_ATTEMPTS) {
            self.retry.max_attempts = parse_number(env::ANALYSIS_MAX_ATTEMPTS, &value)?;
        }
        if let Some(value) = get(env::ANALYSIS_RETRY_DELAY_MS) {
            self.retry.retry_delay_base_ms = parse_number(env::ANALYSIS_RETRY_DELAY_MS, &value)?;
        }

        self.claude.api_key = get(env::claude::API_KEY).or(self.claude.api_key.take());
        if let Some(model) = get(env::claude::MODEL) {
            self.claude.model = model;
        }
        if let Some(base_url) = get(env::claude::BASE_URL) {
            self.claude.base_url = base_url;
        }

        self.openai.api_key = get(env::openai::API_KEY).or(self.openai.api_key.take());
        if let Some(model) = get(env::openai::MODEL) {
            self.openai.model = model;
        }
        if let Some(base_url) = get(env::openai::BASE_URL) {
            self.openai.base_url = base_url;
        }

        Ok(())
    }

    /// Structural checks. Missing credentials are reported by the provider
    /// constructors, since only the selected providers need one.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.retry.max_attempts == 0 {
            return Err(ProviderError::configuration(
                CONFIG_SCOPE,
                "retry.max_attempts must be at least 1",
            ));
        }
        if self.retry.max_attempts > env::defaults::MAX_ATTEMPTS_LIMIT {
            return Err(ProviderError::configuration(
                CONFIG_SCOPE,
                format!(
                    "retry.max_attempts must be at most {}, got {}",
                    env::defaults::MAX_ATTEMPTS_LIMIT,
                    self.retry.max_attempts
                ),
            ));
        }
        if self.retry.retry_delay_base_ms > env::defaults::RETRY_DELAY_BASE_LIMIT_MS {
            return Err(ProviderError::configuration(
                CONFIG_SCOPE,
                format!(
                    "retry.retry_delay_base_ms must be at most {}, got {}",
                    env::defaults::RETRY_DELAY_BASE_LIMIT_MS,
                    self.retry.retry_delay_base_ms
                ),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ProviderError::configuration(
                CONFIG_SCOPE,
                "request_timeout_ms must be greater than zero",
            ));
        }
        for id in ProviderId::all() {
            let backend = self.backend(*id);
            url::Url::parse(&backend.base_url).map_err(|e| {
                ProviderError::configuration(
                    id.as_str(),
                    format!("invalid base url '{}': {}", backend.base_url, e),
                )
            })?;
            if backend.model.trim().is_empty() {
                return Err(ProviderError::configuration(id.as_str(), "model must not be empty"));
            }
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ProviderError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ProviderError::configuration(
            CONFIG_SCOPE,
            format!("{} must be a boolean, got '{}'", key, value),
        )),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ProviderError> {
    value.parse().map_err(|_| {
        ProviderError::configuration(
            CONFIG_SCOPE,
            format!("{} must be a non-negative integer, got '{}'", key, value),
        )
    })
}
