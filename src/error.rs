use thiserror::Error;

use crate::models::ProviderId;

/// Flat classification of provider failures. Retry and fallback decisions are
/// made on this tag alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingApiKey,
    RateLimitExceeded,
    Timeout,
    ServiceUnavailable,
    ApiError,
    InvalidCredentials,
}

impl ErrorKind {
    /// Whether the provider's own retry loop should try the request again.
    pub fn is_retryable(self) -> bool {
        match self {
            ErrorKind::RateLimitExceeded | ErrorKind::Timeout | ErrorKind::ServiceUnavailable => {
                true
            }
            ErrorKind::MissingApiKey | ErrorKind::ApiError | ErrorKind::InvalidCredentials => {
                false
            }
        }
    }

    /// Whether the manager may hand the request to another provider.
    pub fn is_fallback_eligible(self) -> bool {
        match self {
            ErrorKind::RateLimitExceeded
            | ErrorKind::ApiError
            | ErrorKind::Timeout
            | ErrorKind::ServiceUnavailable => true,
            ErrorKind::MissingApiKey | ErrorKind::InvalidCredentials => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MissingApiKey => "missing_api_key",
            ErrorKind::RateLimitExceeded => "rate_limit_exceeded",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::ApiError => "api_error",
            ErrorKind::InvalidCredentials => "invalid_credentials",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("no API key configured for {provider}")]
    MissingApiKey { provider: ProviderId },

    #[error("{provider} rate limit exceeded after {attempts} attempt(s)")]
    RateLimitExceeded {
        provider: ProviderId,
        endpoint: Option<String>,
        attempts: u32,
    },

    #[error("{provider} request to {endpoint} timed out after {attempts} attempt(s)")]
    Timeout {
        provider: ProviderId,
        endpoint: String,
        attempts: u32,
    },

    #[error("{provider} unavailable at {endpoint} (status {}) after {attempts} attempt(s)", status_label(.status))]
    ServiceUnavailable {
        provider: ProviderId,
        endpoint: String,
        status: Option<u16>,
        attempts: u32,
    },

    #[error("{provider} API error at {endpoint} (status {}): {detail}", status_label(.status))]
    Api {
        provider: ProviderId,
        endpoint: String,
        status: Option<u16>,
        detail: String,
    },

    #[error("{provider} rejected the configured credentials (status {status} from {endpoint})")]
    InvalidCredentials {
        provider: ProviderId,
        endpoint: String,
        status: u16,
    },
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::MissingApiKey { .. } => ErrorKind::MissingApiKey,
            ProviderError::RateLimitExceeded { .. } => ErrorKind::RateLimitExceeded,
            ProviderError::Timeout { .. } => ErrorKind::Timeout,
            ProviderError::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            ProviderError::Api { .. } => ErrorKind::ApiError,
            ProviderError::InvalidCredentials { .. } => ErrorKind::InvalidCredentials,
        }
    }

    pub fn provider(&self) -> ProviderId {
        match self {
            ProviderError::MissingApiKey { provider }
            | ProviderError::RateLimitExceeded { provider, .. }
            | ProviderError::Timeout { provider, .. }
            | ProviderError::ServiceUnavailable { provider, .. }
            | ProviderError::Api { provider, .. }
            | ProviderError::InvalidCredentials { provider, .. } => *provider,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::ServiceUnavailable { status, .. } | ProviderError::Api { status, .. } => {
                *status
            }
            ProviderError::RateLimitExceeded { attempts, .. } if *attempts > 0 => Some(429),
            ProviderError::InvalidCredentials { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub fn is_fallback_eligible(&self) -> bool {
        self.kind().is_fallback_eligible()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("prompt template is empty")]
    Empty,

    #[error("prompt template is too short ({actual} chars, minimum {min})")]
    TooShort { min: usize, actual: usize },

    #[error("prompt template must contain the {{content}} placeholder")]
    MissingContentPlaceholder,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid prompt template: {0}")]
    Prompt(#[from] PromptError),

    #[error("Content error: {0}")]
    Content(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
