use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{BatchConfig, FallbackConfig};
use crate::error::{AppError, ProviderError, Result};
use crate::models::{ProviderId, SummaryOptions, SummaryOverrides, SummaryResult};

use super::provider::SummaryProvider;

#[derive(Debug, Clone)]
pub struct ManagerSettings {
    pub active: ProviderId,
    pub fallback: FallbackConfig,
    pub defaults: SummaryOptions,
    pub batch: BatchConfig,
}

/// Routes summary requests to the active provider and falls back on transient failures.
pub struct AiManager {
    providers: HashMap<ProviderId, Arc<dyn SummaryProvider>>,
    settings: ManagerSettings,
}

impl AiManager {
    pub fn new(providers: Vec<Arc<dyn SummaryProvider>>, settings: ManagerSettings) -> Result<Self> {
        let providers: HashMap<_, _> = providers.into_iter().map(|p| (p.id(), p)).collect();
        if !providers.contains_key(&settings.active) {
            return Err(AppError::Config(format!(
                "active provider '{}' is not configured",
                settings.active
            )));
        }
        Ok(Self {
            providers,
            settings,
        })
    }

    pub fn active_provider(&self) -> ProviderId {
        self.settings.active
    }

    pub fn provider(&self, id: ProviderId) -> Option<Arc<dyn SummaryProvider>> {
        self.providers.get(&id).cloned()
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn resolve_options(&self, overrides: &SummaryOverrides) -> SummaryOptions {
        overrides.apply_to(&self.settings.defaults)
    }

    pub async fn generate_summary(
        &self,
        content: &str,
        overrides: &SummaryOverrides,
    ) -> std::result::Result<SummaryResult, ProviderError> {
        let options = self.resolve_options(overrides);
        let active = self.settings.active;
        let primary = self
            .providers
            .get(&active)
            .ok_or(ProviderError::MissingApiKey { provider: active })?;

        let error = match primary.generate_summary(content, &options).await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if !self.settings.fallback.enabled || !error.is_fallback_eligible() {
            return Err(error);
        }

        tracing::warn!(
            provider = %active,
            kind = %error.kind(),
            error = %error,
            "primary provider failed, looking for a fallback"
        );

        match self.try_fallback(active, content, &options).await {
            Some(result) => Ok(result),
            None => Err(error),
        }
    }

    async fn try_fallback(
        &self,
        failed: ProviderId,
        content: &str,
        options: &SummaryOptions,
    ) -> Option<SummaryResult> {
        for id in &self.settings.fallback.order {
            if *id == failed {
                continue;
            }
            let Some(provider) = self.providers.get(id) else {
                continue;
            };
            if let Err(e) = provider.validate_credentials().await {
                tracing::debug!(provider = %id, error = %e, "skipping fallback candidate");
                continue;
            }

            // One attempt only; the primary error wins if this fails too.
            return match provider.generate_summary(content, options).await {
                Ok(result) => {
                    tracing::info!(from = %failed, to = %id, "fallback provider succeeded");
                    Some(result)
                }
                Err(e) => {
                    tracing::warn!(provider = %id, error = %e, "fallback provider failed");
                    None
                }
            };
        }
        None
    }

    /// Summaries for `contents`, in input order, one result per input.
    pub async fn batch_generate_summaries(
        &self,
        contents: &[String],
        overrides: &SummaryOverrides,
    ) -> Vec<std::result::Result<SummaryResult, ProviderError>> {
        let batch = &self.settings.batch;
        let chunk_size = batch.size.max(1);
        let mut results = Vec::with_capacity(contents.len());

        for (chunk_index, chunk) in contents.chunks(chunk_size).enumerate() {
            if chunk_index > 0 && !batch.chunk_delay().is_zero() {
                tokio::time::sleep(batch.chunk_delay()).await;
            }
            for (item_index, content) in chunk.iter().enumerate() {
                if item_index > 0 && !batch.item_delay().is_zero() {
                    tokio::time::sleep(batch.item_delay()).await;
                }
                results.push(self.generate_summary(content, overrides).await);
            }
            tracing::debug!(chunk = chunk_index + 1, done = results.len(), "batch chunk finished");
        }

        results
    }
}
