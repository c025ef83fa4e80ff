//! Closed error taxonomy for analysis providers.
//!
//! Every failure that leaves a provider is a [`ProviderError`]. Transport
//! failures and unexpected bodies are folded into one of the seven kinds by
//! [`ProviderError::from_status`] and [`ProviderError::from_unclassified`]
//! before they reach the caller.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Failure category. Retryability is fixed per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderErrorKind {
    ModelOverload,
    ResponseParsing,
    ServiceError,
    Authentication,
    Timeout,
    Configuration,
    HealthCheck,
}

impl ProviderErrorKind {
    pub fn is_retryable(self) -> bool {
        match self {
            ProviderErrorKind::ModelOverload
            | ProviderErrorKind::ServiceError
            | ProviderErrorKind::Timeout
            | ProviderErrorKind::HealthCheck => true,
            ProviderErrorKind::ResponseParsing
            | ProviderErrorKind::Authentication
            | ProviderErrorKind::Configuration => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderErrorKind::ModelOverload => "ModelOverload",
            ProviderErrorKind::ResponseParsing => "ResponseParsing",
            ProviderErrorKind::ServiceError => "ServiceError",
            ProviderErrorKind::Authentication => "Authentication",
            ProviderErrorKind::Timeout => "Timeout",
            ProviderErrorKind::Configuration => "Configuration",
            ProviderErrorKind::HealthCheck => "HealthCheck",
        }
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("[{provider}] model overloaded: {message}")]
    ModelOverload { provider: String, message: String },
    #[error("[{provider}] failed to parse response: {message}")]
    ResponseParsing { provider: String, message: String },
    #[error("[{provider}] service error: {message}")]
    ServiceError { provider: String, message: String },
    #[error("[{provider}] authentication failed: {message}")]
    Authentication { provider: String, message: String },
    #[error("[{provider}] request timed out: {message}")]
    Timeout { provider: String, message: String },
    #[error("[{provider}] configuration error: {message}")]
    Configuration { provider: String, message: String },
    #[error("[{provider}] health check failed: {message}")]
    HealthCheck { provider: String, message: String },
}

static SERVER_ERROR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)internal server error|bad gateway|gateway timeout|\b5\d\d\b")
        .expect("server error pattern is valid")
});

static TIMEOUT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)timed? ?out|deadline exceeded").expect("timeout pattern is valid")
});

static AUTH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)unauthori[sz]ed|forbidden|invalid api key|\b40[13]\b")
        .expect("auth pattern is valid")
});

static OVERLOAD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)overloaded|rate limit|too many requests|\b429\b")
        .expect("overload pattern is valid")
});

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, provider: impl Into<String>, message: impl Into<String>) -> Self {
        let provider = provider.into();
        let message = message.into();
        match kind {
            ProviderErrorKind::ModelOverload => ProviderError::ModelOverload { provider, message },
            ProviderErrorKind::ResponseParsing => {
                ProviderError::ResponseParsing { provider, message }
            }
            ProviderErrorKind::ServiceError => ProviderError::ServiceError { provider, message },
            ProviderErrorKind::Authentication => {
                ProviderError::Authentication { provider, message }
            }
            ProviderErrorKind::Timeout => ProviderError::Timeout { provider, message },
            ProviderErrorKind::Configuration => ProviderError::Configuration { provider, message },
            ProviderErrorKind::HealthCheck => ProviderError::HealthCheck { provider, message },
        }
    }

    pub fn parsing(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::ResponseParsing, provider, message)
    }

    pub fn configuration(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Configuration, provider, message)
    }

    pub fn timeout(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, provider, message)
    }

    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            ProviderError::ModelOverload { .. } => ProviderErrorKind::ModelOverload,
            ProviderError::ResponseParsing { .. } => ProviderErrorKind::ResponseParsing,
            ProviderError::ServiceError { .. } => ProviderErrorKind::ServiceError,
            ProviderError::Authentication { .. } => ProviderErrorKind::Authentication,
            ProviderError::Timeout { .. } => ProviderErrorKind::Timeout,
            ProviderError::Configuration { .. } => ProviderErrorKind::Configuration,
            ProviderError::HealthCheck { .. } => ProviderErrorKind::HealthCheck,
        }
    }

    /// Identifier of the provider that raised this error.
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::ModelOverload { provider, .. }
            | ProviderError::ResponseParsing { provider, .. }
            | ProviderError::ServiceError { provider, .. }
            | ProviderError::Authentication { provider, .. }
            | ProviderError::Timeout { provider, .. }
            | ProviderError::Configuration { provider, .. }
            | ProviderError::HealthCheck { provider, .. } => provider,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ProviderError::ModelOverload { message, .. }
            | ProviderError::ResponseParsing { message, .. }
            | ProviderError::ServiceError { message, .. }
            | ProviderError::Authentication { message, .. }
            | ProviderError::Timeout { message, .. }
            | ProviderError::Configuration { message, .. }
            | ProviderError::HealthCheck { message, .. } => message,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Status the route layer should answer with when this error reaches it.
    pub fn suggested_http_status(&self) -> u16 {
        match self.kind() {
            ProviderErrorKind::Authentication | ProviderErrorKind::Configuration => 500,
            ProviderErrorKind::ModelOverload | ProviderErrorKind::Timeout => 503,
            ProviderErrorKind::ServiceError
            | ProviderErrorKind::HealthCheck
            | ProviderErrorKind::ResponseParsing => 502,
        }
    }

    /// Maps a non-2xx backend status to a kind.
    ///
    /// Only 5xx statuses become [`ProviderErrorKind::ServiceError`]. A 404 means
    /// the base URL or model is wrong, and any other rejected request would be
    /// rejected again, so neither is retried.
    pub fn from_status(provider: impl Into<String>, status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => ProviderErrorKind::Authentication,
            408 => ProviderErrorKind::Timeout,
            429 | 503 | 529 => ProviderErrorKind::ModelOverload,
            404 => ProviderErrorKind::Configuration,
            500.. => ProviderErrorKind::ServiceError,
            _ => ProviderErrorKind::ResponseParsing,
        };
        let message = if body.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, truncate(body.trim(), 512))
        };
        Self::new(kind, provider, message)
    }

    /// Classifies a failure that carries no status by matching its message.
    pub fn from_unclassified(provider: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = if looks_like_server_error(&message) {
            ProviderErrorKind::ServiceError
        } else if AUTH_PATTERN.is_match(&message) {
            ProviderErrorKind::Authentication
        } else if OVERLOAD_PATTERN.is_match(&message) {
            ProviderErrorKind::ModelOverload
        } else if TIMEOUT_PATTERN.is_match(&message) {
            ProviderErrorKind::Timeout
        } else {
            ProviderErrorKind::ServiceError
        };
        Self::new(kind, provider, message)
    }

    pub fn from_reqwest(provider: impl Into<String>, error: reqwest::Error) -> Self {
        let provider = provider.into();
        if error.is_timeout() {
            return Self::timeout(provider, error.to_string());
        }
        if let Some(status) = error.status() {
            return Self::from_status(provider, status.as_u16(), &error.to_string());
        }
        if error.is_decode() {
            return Self::parsing(provider, error.to_string());
        }
        Self::from_unclassified(provider, format!("{:#}", error))
    }
}

/// True when a message looks like an HTTP 5xx from the backend.
pub fn looks_like_server_error(message: &str) -> bool {
    SERVER_ERROR_PATTERN.is_match(message)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}
