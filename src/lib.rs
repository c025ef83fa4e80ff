//! # Solution Analyzer
//!
//! Provider layer that sends a submitted solution and its problem description
//! to an AI analysis backend and returns a validated, structured result.
//!
//! ## Architecture Overview
//!
//! - **[`analysis`]**: provider contract, shared base behavior (prompt,
//!   validation, retry), the Claude and OpenAI providers, the fallback
//!   orchestrator and the provider factory
//! - **[`config`]**: configuration from the environment or a TOML file
//! - **[`env`]**: environment variable names and defaults
//! - **[`cli`]**: command line front end
//!
//! ```text
//! caller ─► ProviderFactory::get_primary_provider()
//!              │
//!              ▼
//!        FallbackProvider ──► primary (e.g. OpenAI)
//!              │                 └─ BaseProvider: prompt ─► HTTP ─► validate (retry ≤ N)
//!              └──────────► secondary (e.g. Claude), only on recoverable failures
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use solution_analyzer::{AnalysisRequest, ProblemContext, ProviderFactory};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let factory = ProviderFactory::from_env()?;
//!     let provider = factory.get_primary_provider()?;
//!
//!     let request = AnalysisRequest::new(ProblemContext::default(), "function f(){return 1}");
//!     let result = provider.analyze_comprehensively(request).await?;
//!
//!     println!("{} ({}% confidence)", result.overall_score, result.ai_confidence);
//!     Ok(())
//! }
//! ```

/// Provider abstraction, fallback orchestration and provider construction.
pub mod analysis;

/// Configuration loading and validation.
pub mod config;

/// Environment variable names and built-in defaults.
pub mod env;

/// Command line argument parsing and input loading.
pub mod cli;

pub use analysis::{
    AnalysisProvider, AnalysisRequest, AnalysisResult, Difficulty, EvaluatedParameter,
    FallbackProvider, Feedback, ProblemContext, ProviderError, ProviderErrorKind, ProviderFactory,
    ProviderId, ProviderMetrics, TechnicalParameter,
};
pub use config::{AnalysisConfig, BackendSettings, RetryConfig};
