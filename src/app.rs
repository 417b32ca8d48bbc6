use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::ai::{self, test_api_connection, AiManager, DiagnosticReport, ManagerSettings, SummaryProvider};
use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{
    ProviderId, StoredSummary, SummaryOverrides, SummaryResult, SummaryStats, SummaryStatus,
};
use crate::services::prepare_content;

const BATCH_EXTENSIONS: [&str; 3] = ["txt", "html", "md"];

/// Outcome of a batch run, keyed by post id.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<(i64, SummaryResult)>,
    pub failed: Vec<(i64, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

#[derive(Debug, Clone)]
pub struct ProviderOverview {
    pub id: ProviderId,
    pub display_name: &'static str,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub rate_limit_per_minute: u32,
    pub has_api_key: bool,
    pub active: bool,
}

pub struct App {
    config: Config,
    repository: Repository,
    manager: AiManager,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let runtime = ai::build_runtime(&config)?;
        let providers = ai::build_providers(&config, &runtime)?;
        Self::with_providers(config, providers).await
    }

    /// Build the app around an explicit provider set.
    pub async fn with_providers(
        config: Config,
        providers: Vec<Arc<dyn SummaryProvider>>,
    ) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        let manager = AiManager::new(
            providers,
            ManagerSettings {
                active: config.active_provider,
                fallback: config.fallback.clone(),
                defaults: config.defaults.clone(),
                batch: config.batch.clone(),
            },
        )?;

        Ok(Self {
            config,
            repository,
            manager,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &AiManager {
        &self.manager
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Summarize raw post content and persist the result. Nothing is stored on failure.
    pub async fn summarize_post(
        &self,
        post_id: i64,
        raw_content: &str,
        overrides: &SummaryOverrides,
    ) -> Result<SummaryResult> {
        let content = prepare_content(raw_content, self.config.max_content_chars)?;
        let result = self.manager.generate_summary(&content, overrides).await?;
        self.repository.save_summary(post_id, &result).await?;
        tracing::info!(post_id, provider = %result.provider, "summary saved");
        Ok(result)
    }

    pub async fn summarize_file(
        &self,
        post_id: i64,
        path: &Path,
        overrides: &SummaryOverrides,
    ) -> Result<SummaryResult> {
        let raw = tokio::fs::read_to_string(path).await?;
        self.summarize_post(post_id, &raw, overrides).await
    }

    /// Summarize every `<post-id>.{txt,html,md}` file in `dir`, in post id order.
    pub async fn summarize_batch(
        &self,
        dir: &Path,
        overrides: &SummaryOverrides,
    ) -> Result<BatchReport> {
        let files = batch_files(dir)?;
        let mut report = BatchReport::default();
        let mut post_ids = Vec::with_capacity(files.len());
        let mut contents = Vec::with_capacity(files.len());

        for (post_id, path) in files {
            let prepared = match tokio::fs::read_to_string(&path).await {
                Ok(raw) => prepare_content(&raw, self.config.max_content_chars),
                Err(e) => Err(AppError::Io(e)),
            };
            match prepared {
                Ok(content) => {
                    post_ids.push(post_id);
                    contents.push(content);
                }
                Err(e) => {
                    tracing::warn!(post_id, path = %path.display(), error = %e, "skipping post");
                    report.failed.push((post_id, e.to_string()));
                }
            }
        }

        let results = self
            .manager
            .batch_generate_summaries(&contents, overrides)
            .await;

        for (post_id, result) in post_ids.into_iter().zip(results) {
            match result {
                Ok(summary) => match self.repository.save_summary(post_id, &summary).await {
                    Ok(_) => report.succeeded.push((post_id, summary)),
                    Err(e) => {
                        tracing::error!(post_id, error = %e, "could not store summary");
                        report.failed.push((post_id, format!("could not store summary: {}", e)));
                    }
                },
                Err(e) => report.failed.push((post_id, e.to_string())),
            }
        }

        report.failed.sort_by_key(|(post_id, _)| *post_id);
        Ok(report)
    }

    pub async fn show_summary(&self, post_id: i64) -> Result<Option<StoredSummary>> {
        self.repository.get_summary(post_id).await
    }

    pub async fn delete_summary(&self, post_id: i64) -> Result<bool> {
        self.repository.delete_summary(post_id).await
    }

    pub async fn set_summary_status(&self, post_id: i64, status: SummaryStatus) -> Result<bool> {
        self.repository.set_status(post_id, status).await
    }

    pub async fn stats(&self) -> Result<SummaryStats> {
        self.repository.stats().await
    }

    /// Diagnostics for one provider, or for all of them when `provider` is `None`.
    pub async fn test_connection(&self, provider: Option<ProviderId>) -> Vec<DiagnosticReport> {
        let ids: Vec<ProviderId> = match provider {
            Some(id) => vec![id],
            None => ProviderId::ALL.to_vec(),
        };

        let mut reports = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(provider) = self.manager.provider(id) else {
                continue;
            };
            let has_api_key = self.config.provider_settings(id).has_api_key();
            reports.push(test_api_connection(provider.as_ref(), has_api_key).await);
        }
        reports
    }

    pub fn providers_overview(&self) -> Vec<ProviderOverview> {
        ProviderId::ALL
            .iter()
            .map(|&id| {
                let settings = self.config.provider_settings(id);
                ProviderOverview {
                    id,
                    display_name: id.config().display_name,
                    has_api_key: settings.has_api_key(),
                    model: settings.model,
                    base_url: settings.base_url,
                    timeout: settings.timeout,
                    rate_limit_per_minute: settings.rate_limit_per_minute,
                    active: id == self.manager.active_provider(),
                }
            })
            .collect()
    }
}

/// `<post-id>.<ext>` files in `dir`, sorted by post id. Other files are ignored.
pub fn batch_files(dir: &Path) -> Result<Vec<(i64, PathBuf)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if !BATCH_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()) {
            continue;
        }
        let post_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|id| *id > 0);
        match post_id {
            Some(post_id) => files.push((post_id, path)),
            None => tracing::debug!(path = %path.display(), "ignoring file without a post id name"),
        }
    }
    files.sort();
    files.dedup_by_key(|(post_id, _)| *post_id);
    Ok(files)
}
