//! Environment variable names and built-in defaults for the analysis layer.
//!
//! Everything read from the process environment is named here so the
//! configuration loader and the documentation stay in sync.

/// Primary analysis provider name (`claude` or `openai`)
pub const ANALYSIS_PROVIDER: &str = "ANALYSIS_PROVIDER";

/// Enables wrapping the primary provider with the fallback orchestrator
pub const ANALYSIS_FALLBACK_ENABLED: &str = "ANALYSIS_FALLBACK_ENABLED";

/// Designated fallback provider name
pub const ANALYSIS_FALLBACK_PROVIDER: &str = "ANALYSIS_FALLBACK_PROVIDER";

/// Per-request timeout in milliseconds
pub const ANALYSIS_TIMEOUT_MS: &str = "ANALYSIS_TIMEOUT_MS";

/// Health probe timeout in milliseconds
pub const ANALYSIS_HEALTH_TIMEOUT_MS: &str = "ANALYSIS_HEALTH_TIMEOUT_MS";

/// Attempt ceiling for the retry loop
pub const ANALYSIS_MAX_ATTEMPTS: &str = "ANALYSIS_MAX_ATTEMPTS";

/// Linear backoff base in milliseconds
pub const ANALYSIS_RETRY_DELAY_MS: &str = "ANALYSIS_RETRY_DELAY_MS";

/// Anthropic backend variables
pub mod claude {
    pub const API_KEY: &str = "ANTHROPIC_API_KEY";
    pub const MODEL: &str = "ANTHROPIC_MODEL";
    pub const BASE_URL: &str = "ANTHROPIC_BASE_URL";

    pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
    pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
    pub const API_VERSION: &str = "2023-06-01";
}

/// OpenAI backend variables
pub mod openai {
    pub const API_KEY: &str = "OPENAI_API_KEY";
    pub const MODEL: &str = "OPENAI_MODEL";
    pub const BASE_URL: &str = "OPENAI_BASE_URL";

    pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
    pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
}

/// Built-in defaults
pub mod defaults {
    pub const REQUEST_TIMEOUT_MS: u64 = 30_000;
    pub const HEALTH_TIMEOUT_MS: u64 = 5_000;
    pub const MAX_ATTEMPTS: u32 = 2;
    pub const RETRY_DELAY_BASE_MS: u64 = 1_000;
    pub const MAX_ATTEMPTS_LIMIT: u32 = 10;
    pub const RETRY_DELAY_BASE_LIMIT_MS: u64 = 60_000;
    pub const MAX_TOKENS: u32 = 4_096;
    pub const TEMPERATURE: f32 = 0.2;
}

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "solution_analyzer=info";
