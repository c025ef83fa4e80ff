use crate::analysis::error::ProviderError;
use crate::analysis::types::{AnalysisRequest, AnalysisResult};
use futures::future::BoxFuture;
use std::collections::HashMap;

/// Contract every analysis backend implements.
pub trait AnalysisProvider: Send + Sync {
    /// Analyze a submitted solution against its problem.
    ///
    /// Fails with a [`ProviderError`] of one of the seven kinds; callers never
    /// see an untyped failure.
    fn analyze_comprehensively(
        &self,
        request: AnalysisRequest,
    ) -> BoxFuture<'_, Result<AnalysisResult, ProviderError>>;

    /// Stable identifier used in logs and metric keys
    fn provider_name(&self) -> &str;

    /// Best-effort liveness probe. Returns false on any internal failure.
    fn is_healthy(&self) -> BoxFuture<'_, bool>;

    /// Diagnostic view of the provider configuration, without credentials
    fn get_configuration(&self) -> HashMap<String, serde_json::Value>;
}
