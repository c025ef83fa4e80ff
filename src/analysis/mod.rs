pub mod base;
pub mod claude_provider;
pub mod error;
pub mod factory;
pub mod fallback;
pub mod http;
pub mod openai_provider;
pub mod provider;
pub mod types;


pub use base::BaseProvider;
pub use claude_provider::ClaudeProvider;
pub use error::{ProviderError, ProviderErrorKind};
pub use factory::{ProviderConstructor, ProviderFactory};
pub use fallback::{FallbackProvider, ProviderMetrics};
pub use http::HttpBackend;
pub use openai_provider::OpenAIProvider;
pub use provider::AnalysisProvider;
pub use types::*;
