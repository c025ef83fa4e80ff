//! Primary/secondary fail-over with per-provider reliability metrics.
//!
//! ```text
//! call primary ──ok──────────────────────────────► result
//!      │
//!     err ── should_fallback? ──no──────────────► primary error
//!                   │
//!                  yes ── call secondary ──ok────► secondary result
//!                               │
//!                              err ─────────────► primary error
//! ```

use crate::analysis::error::{ProviderError, ProviderErrorKind};
use crate::analysis::provider::AnalysisProvider;
use crate::analysis::types::{AnalysisRequest, AnalysisResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

static NETWORK_FAILURE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)timeout|timed out|connection|reset|enotfound|name not found|not known|refused|\b50[0234]\b",
    )
    .expect("network failure pattern is valid")
});

/// Reliability counters for one provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetrics {
    pub success_count: u64,
    pub failure_count: u64,
    pub fallback_count: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub total_response_time_ms: u64,
    pub average_response_time_ms: u64,
}

impl ProviderMetrics {
    fn record(&mut self, success: bool, elapsed: Duration) {
        let now = Utc::now();
        if success {
            self.success_count += 1;
            self.last_success = Some(now);
        } else {
            self.failure_count += 1;
            self.last_failure = Some(now);
        }
        self.total_response_time_ms += elapsed.as_millis() as u64;
        let calls = self.success_count + self.failure_count;
        self.average_response_time_ms = self.total_response_time_ms / calls;
    }
}

/// Wraps a primary provider and retries failed calls on a secondary one.
pub struct FallbackProvider {
    primary: Arc<dyn AnalysisProvider>,
    secondary: Arc<dyn AnalysisProvider>,
    name: String,
    metrics: DashMap<String, ProviderMetrics>,
}

impl FallbackProvider {
    pub fn new(primary: Arc<dyn AnalysisProvider>, secondary: Arc<dyn AnalysisProvider>) -> Self {
        let name = format!(
            "{}-with-{}-fallback",
            primary.provider_name(),
            secondary.provider_name()
        );
        let metrics = DashMap::new();
        metrics.insert(primary.provider_name().to_string(), ProviderMetrics::default());
        metrics.insert(secondary.provider_name().to_string(), ProviderMetrics::default());

        Self {
            primary,
            secondary,
            name,
            metrics,
        }
    }

    pub fn primary(&self) -> &Arc<dyn AnalysisProvider> {
        &self.primary
    }

    pub fn secondary(&self) -> &Arc<dyn AnalysisProvider> {
        &self.secondary
    }

    /// Whether a failure of the primary should be retried on the secondary.
    pub fn should_fallback(error: &ProviderError) -> bool {
        match error.kind() {
            ProviderErrorKind::Authentication | ProviderErrorKind::Configuration => false,
            _ => error.is_retryable() || NETWORK_FAILURE_PATTERN.is_match(error.message()),
        }
    }

    /// Snapshot of the counters for one provider
    pub fn metrics_for(&self, provider_name: &str) -> Option<ProviderMetrics> {
        self.metrics.get(provider_name).map(|entry| entry.clone())
    }

    /// Snapshot of all counters, keyed by provider name
    pub fn metrics(&self) -> HashMap<String, ProviderMetrics> {
        self.metrics
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn record_outcome(&self, provider_name: &str, success: bool, elapsed: Duration) {
        self.metrics
            .entry(provider_name.to_string())
            .or_default()
            .record(success, elapsed);
    }

    fn record_fallback(&self, provider_name: &str) {
        self.metrics
            .entry(provider_name.to_string())
            .or_default()
            .fallback_count += 1;
    }

    async fn analyze_with_fallback(
        &self,
        request: AnalysisRequest,
    ) -> Result<AnalysisResult, ProviderError> {
        let primary_name = self.primary.provider_name();
        let secondary_name = self.secondary.provider_name();
        let request_id = request.id;

        let started = Instant::now();
        let primary_error = match self.primary.analyze_comprehensively(request.clone()).await {
            Ok(result) => {
                self.record_outcome(primary_name, true, started.elapsed());
                return Ok(result);
            }
            Err(error) => {
                self.record_outcome(primary_name, false, started.elapsed());
                error
            }
        };

        if !Self::should_fallback(&primary_error) {
            warn!(
                provider = primary_name,
                %request_id,
                kind = %primary_error.kind(),
                "Primary failed with a non-recoverable error, not falling back"
            );
            return Err(primary_error);
        }

        info!(
            provider = primary_name,
            fallback = secondary_name,
            %request_id,
            "Primary failed ({}), falling back",
            primary_error
        );
        self.record_fallback(secondary_name);

        let started = Instant::now();
        match self.secondary.analyze_comprehensively(request).await {
            Ok(result) => {
                self.record_outcome(secondary_name, true, started.elapsed());
                Ok(result)
            }
            Err(secondary_error) => {
                self.record_outcome(secondary_name, false, started.elapsed());
                error!(
                    provider = secondary_name,
                    %request_id,
                    "Fallback also failed: {}",
                    secondary_error
                );
                Err(primary_error)
            }
        }
    }
}

async fn probe(provider: &Arc<dyn AnalysisProvider>) -> bool {
    match AssertUnwindSafe(async { provider.is_healthy().await })
        .catch_unwind()
        .await
    {
        Ok(healthy) => healthy,
        Err(_) => {
            warn!(provider = provider.provider_name(), "Health probe panicked");
            false
        }
    }
}

impl AnalysisProvider for FallbackProvider {
    fn analyze_comprehensively(
        &self,
        request: AnalysisRequest,
    ) -> BoxFuture<'_, Result<AnalysisResult, ProviderError>> {
        Box::pin(self.analyze_with_fallback(request))
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn is_healthy(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            let (primary, secondary) = tokio::join!(probe(&self.primary), probe(&self.secondary));
            primary || secondary
        })
    }

    fn get_configuration(&self) -> HashMap<String, serde_json::Value> {
        let mut configuration = HashMap::new();
        configuration.insert("provider".to_string(), serde_json::json!(self.name));
        configuration.insert(
            "primary".to_string(),
            serde_json::json!(self.primary.get_configuration()),
        );
        configuration.insert(
            "secondary".to_string(),
            serde_json::json!(self.secondary.get_configuration()),
        );
        configuration.insert("metrics".to_string(), serde_json::json!(self.metrics()));
        configuration
    }
}
