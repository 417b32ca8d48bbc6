mod cache;
mod chat_completions;
mod claude;
mod deepseek;
mod diagnostics;
mod gemini;
mod gpt;
mod manager;
pub mod markdown;
pub mod prompt;
mod provider;
mod rate_limit;

use std::sync::Arc;

pub use cache::{cache_key, SummaryCache};
pub use diagnostics::{test_api_connection, DiagnosticReport, DiagnosticStep};
pub use manager::{AiManager, ManagerSettings};
pub use prompt::{Prompt, PromptManager};
pub use provider::{HttpProvider, ProviderRuntime, RetryPolicy, SummaryProvider};
pub use rate_limit::RateLimiter;

use crate::config::Config;
use crate::error::Result;
use crate::models::ProviderId;

/// Shared stores built from the config: one rate counter, one cache, one prompt manager.
pub fn build_runtime(config: &Config) -> Result<ProviderRuntime> {
    let prompts = PromptManager::new(config.prompt_template.clone())?;
    Ok(ProviderRuntime::new(
        RetryPolicy::from(&config.retry),
        Arc::new(RateLimiter::new(config.rate_window())),
        Arc::new(SummaryCache::new(config.cache_ttl())),
        Arc::new(prompts),
    ))
}

/// One HTTP provider per known id, all sharing `runtime`.
pub fn build_providers(
    config: &Config,
    runtime: &ProviderRuntime,
) -> Result<Vec<Arc<dyn SummaryProvider>>> {
    ProviderId::ALL
        .iter()
        .map(|&id| {
            let provider = HttpProvider::new(id, config.provider_settings(id), runtime.clone())?;
            Ok(Arc::new(provider) as Arc<dyn SummaryProvider>)
        })
        .collect()
}
