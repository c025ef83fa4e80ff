//! Provider construction and caching.
//!
//! The factory owns a registry of constructors keyed by [`ProviderId`] and a
//! concurrent cache of built instances. Requests for the same id always return
//! the same `Arc`. Construction errors are not caught here; they reach the
//! caller on first use.

use crate::analysis::claude_provider::ClaudeProvider;
use crate::analysis::error::ProviderError;
use crate::analysis::fallback::FallbackProvider;
use crate::analysis::openai_provider::OpenAIProvider;
use crate::analysis::provider::AnalysisProvider;
use crate::analysis::types::ProviderId;
use crate::config::AnalysisConfig;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub type ProviderConstructor = Arc<
    dyn Fn(&AnalysisConfig) -> Result<Arc<dyn AnalysisProvider>, ProviderError> + Send + Sync,
>;

pub struct ProviderFactory {
    config: AnalysisConfig,
    registry: HashMap<ProviderId, ProviderConstructor>,
    providers: DashMap<ProviderId, Arc<dyn AnalysisProvider>>,
    orchestrators: DashMap<(ProviderId, ProviderId), Arc<FallbackProvider>>,
}

impl ProviderFactory {
    /// Factory with the built-in Claude and OpenAI constructors registered
    pub fn new(config: AnalysisConfig) -> Self {
        let mut registry: HashMap<ProviderId, ProviderConstructor> = HashMap::new();
        registry.insert(
            ProviderId::Claude,
            Arc::new(|config: &AnalysisConfig| {
                Ok(Arc::new(ClaudeProvider::new(config)?) as Arc<dyn AnalysisProvider>)
            }),
        );
        registry.insert(
            ProviderId::OpenAI,
            Arc::new(|config: &AnalysisConfig| {
                Ok(Arc::new(OpenAIProvider::new(config)?) as Arc<dyn AnalysisProvider>)
            }),
        );

        Self {
            config,
            registry,
            providers: DashMap::new(),
            orchestrators: DashMap::new(),
        }
    }

    /// Factory configured from the process environment
    pub fn from_env() -> Result<Self, ProviderError> {
        Ok(Self::new(AnalysisConfig::from_env()?))
    }

    /// Replace the constructor for one provider id. Clears any cached instance
    /// of that id.
    pub fn with_constructor<F>(mut self, id: ProviderId, constructor: F) -> Self
    where
        F: Fn(&AnalysisConfig) -> Result<Arc<dyn AnalysisProvider>, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        self.registry.insert(id, Arc::new(constructor));
        self.providers.remove(&id);
        self.orchestrators.retain(|(primary, secondary), _| *primary != id && *secondary != id);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Return the cached provider for `id`, building it on first request.
    pub fn get_provider(&self, id: ProviderId) -> Result<Arc<dyn AnalysisProvider>, ProviderError> {
        if let Some(provider) = self.providers.get(&id) {
            return Ok(Arc::clone(provider.value()));
        }

        // The entry lock makes racing first-time callers share one instance.
        match self.providers.entry(id) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let constructor = self.registry.get(&id).ok_or_else(|| {
                    ProviderError::configuration(id.as_str(), "no constructor registered")
                })?;
                let provider = constructor(&self.config)?;
                debug!(provider = id.as_str(), "Cached new provider instance");
                entry.insert(Arc::clone(&provider));
                Ok(provider)
            }
        }
    }

    /// Provider selected by configuration, wrapped with fail-over when enabled.
    pub fn get_primary_provider(&self) -> Result<Arc<dyn AnalysisProvider>, ProviderError> {
        let primary_id = self.config.primary_provider;
        let fallback_id = self.config.fallback_provider;

        if !self.config.fallback_enabled || primary_id == fallback_id {
            return self.get_provider(primary_id);
        }

        Ok(self.get_fallback_provider(primary_id, fallback_id)? as Arc<dyn AnalysisProvider>)
    }

    /// The cached orchestrator for the configured pair, if fail-over applies
    pub fn get_orchestrator(&self) -> Result<Option<Arc<FallbackProvider>>, ProviderError> {
        let primary_id = self.config.primary_provider;
        let fallback_id = self.config.fallback_provider;

        if !self.config.fallback_enabled || primary_id == fallback_id {
            return Ok(None);
        }
        self.get_fallback_provider(primary_id, fallback_id).map(Some)
    }

    fn get_fallback_provider(
        &self,
        primary_id: ProviderId,
        fallback_id: ProviderId,
    ) -> Result<Arc<FallbackProvider>, ProviderError> {
        let key = (primary_id, fallback_id);
        if let Some(orchestrator) = self.orchestrators.get(&key) {
            return Ok(Arc::clone(orchestrator.value()));
        }

        let primary = self.get_provider(primary_id)?;
        let secondary = self.get_provider(fallback_id)?;

        let orchestrator = self
            .orchestrators
            .entry(key)
            .or_insert_with(|| {
                info!(
                    primary = primary_id.as_str(),
                    fallback = fallback_id.as_str(),
                    "Enabled provider fallback"
                );
                Arc::new(FallbackProvider::new(primary, secondary))
            })
            .clone();
        Ok(orchestrator)
    }

    /// Drop every cached instance. The next request rebuilds from the registry.
    pub fn reset(&self) {
        self.orchestrators.clear();
        self.providers.clear();
    }
}
