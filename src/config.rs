use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ProviderId, SummaryOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_active_provider")]
    pub active_provider: ProviderId,

    /// Custom prompt template. The built-in template is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_rate_window")]
    pub rate_window_secs: u64,

    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,

    #[serde(default)]
    pub defaults: SummaryOptions,

    #[serde(default)]
    pub fallback: FallbackConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deepseek: Option<ProviderOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini: Option<ProviderOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude: Option<ProviderOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpt: Option<ProviderOverrides>,
}

impl ProvidersConfig {
    pub fn get(&self, id: ProviderId) -> Option<&ProviderOverrides> {
        match id {
            ProviderId::DeepSeek => self.deepseek.as_ref(),
            ProviderId::Gemini => self.gemini.as_ref(),
            ProviderId::Claude => self.claude.as_ref(),
            ProviderId::Gpt => self.gpt.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
    pub order: Vec<ProviderId>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            order: ProviderId::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub size: usize,
    pub item_delay_ms: u64,
    pub chunk_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: 5,
            item_delay_ms: 1_000,
            chunk_delay_ms: 5_000,
        }
    }
}

impl BatchConfig {
    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
        }
    }
}

/// Per-provider settings from the config file. Unset values use the compiled-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_minute: Option<u32>,
}

/// Runtime settings for one provider after merging overrides, environment and defaults.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub rate_limit_per_minute: u32,
}

impl ProviderSettings {
    pub fn defaults_for(id: ProviderId) -> Self {
        let config = id.config();
        Self {
            api_key: None,
            model: config.default_model.to_string(),
            base_url: config.base_url.to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            rate_limit_per_minute: config.rate_limit_per_minute,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("post-tldr");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("summaries.db").to_string_lossy().to_string()
}

fn default_active_provider() -> ProviderId {
    ProviderId::DeepSeek
}

fn default_cache_ttl() -> u64 {
    2 * 60 * 60
}

fn default_rate_window() -> u64 {
    60
}

fn default_max_content_chars() -> usize {
    12_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            active_provider: default_active_provider(),
            prompt_template: None,
            cache_ttl_secs: default_cache_ttl(),
            rate_window_secs: default_rate_window(),
            max_content_chars: default_max_content_chars(),
            defaults: SummaryOptions::default(),
            fallback: FallbackConfig::default(),
            batch: BatchConfig::default(),
            retry: RetryConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save()?;
            config.validate()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("post-tldr")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.size == 0 {
            return Err(AppError::Config("batch.size must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_content_chars == 0 {
            return Err(AppError::Config(
                "max_content_chars must be at least 1".to_string(),
            ));
        }
        for id in ProviderId::ALL {
            let Some(overrides) = self.providers.get(id) else {
                continue;
            };
            if let Some(base_url) = &overrides.base_url {
                Url::parse(base_url).map_err(|e| {
                    AppError::Config(format!("providers.{}.base_url is invalid: {}", id, e))
                })?;
            }
            if overrides.rate_limit_per_minute == Some(0) {
                return Err(AppError::Config(format!(
                    "providers.{}.rate_limit_per_minute must be at least 1",
                    id
                )));
            }
        }
        Ok(())
    }

    /// Resolve the runtime settings for `id`, reading the API key from the
    /// environment when the config file does not carry one.
    pub fn provider_settings(&self, id: ProviderId) -> ProviderSettings {
        let mut settings = ProviderSettings::defaults_for(id);
        let overrides = self.providers.get(id).cloned().unwrap_or_default();

        settings.api_key = overrides
            .api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(id.api_key_env()).ok())
            .filter(|k| !k.trim().is_empty());
        if let Some(model) = overrides.model.filter(|m| !m.trim().is_empty()) {
            settings.model = model;
        }
        if let Some(base_url) = overrides.base_url {
            settings.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = overrides.timeout_secs {
            settings.timeout = Duration::from_secs(timeout);
        }
        if let Some(limit) = overrides.rate_limit_per_minute {
            settings.rate_limit_per_minute = limit;
        }
        settings
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }
}
