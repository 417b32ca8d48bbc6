use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};

use crate::config::{ProviderSettings, RetryConfig};
use crate::error::{ProviderError, Result};
use crate::models::{ProviderId, SummaryOptions, SummaryResult};

use super::cache::{cache_key, SummaryCache};
use super::markdown::finalize_summary;
use super::prompt::{Prompt, PromptManager};
use super::rate_limit::RateLimiter;
use super::{chat_completions, claude, deepseek, gemini, gpt};

const LOG_BODY_LIMIT: usize = 500;

/// Contract every summary backend fulfils.
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn model(&self) -> &str;

    async fn generate_summary(
        &self,
        content: &str,
        options: &SummaryOptions,
    ) -> std::result::Result<SummaryResult, ProviderError>;

    async fn validate_credentials(&self) -> std::result::Result<(), ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl From<&SummaryOptions> for GenerationParams {
    fn from(options: &SummaryOptions) -> Self {
        Self {
            max_tokens: options.max_tokens(),
            temperature: options.temperature(),
        }
    }
}

/// Raw vendor output before post-processing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: Option<String>,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cached_tokens: u32,
    pub total_tokens: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Sleep before retrying after `attempt` (1-based) failed: `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

/// State shared by every provider: retry policy, rate counters, result cache and prompts.
#[derive(Clone)]
pub struct ProviderRuntime {
    pub retry: RetryPolicy,
    pub limiter: Arc<RateLimiter>,
    pub cache: Arc<SummaryCache>,
    pub prompts: Arc<PromptManager>,
}

impl ProviderRuntime {
    pub fn new(
        retry: RetryPolicy,
        limiter: Arc<RateLimiter>,
        cache: Arc<SummaryCache>,
        prompts: Arc<PromptManager>,
    ) -> Self {
        Self {
            retry,
            limiter,
            cache,
            prompts,
        }
    }
}

/// HTTP-backed provider. Vendor specifics are picked by matching on [`ProviderId`].
pub struct HttpProvider {
    id: ProviderId,
    settings: ProviderSettings,
    client: Client,
    runtime: ProviderRuntime,
}

impl HttpProvider {
    pub fn new(id: ProviderId, settings: ProviderSettings, runtime: ProviderRuntime) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout.min(Duration::from_secs(10)))
            .user_agent(concat!("post-tldr/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            id,
            settings,
            client,
            runtime,
        })
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    pub fn endpoint(&self) -> String {
        let base = &self.settings.base_url;
        let model = &self.settings.model;
        match self.id {
            ProviderId::DeepSeek | ProviderId::Gpt => chat_completions::endpoint(base, model),
            ProviderId::Gemini => gemini::endpoint(base, model),
            ProviderId::Claude => claude::endpoint(base, model),
        }
    }

    fn models_endpoint(&self) -> String {
        let base = &self.settings.base_url;
        match self.id {
            ProviderId::DeepSeek | ProviderId::Gpt => chat_completions::models_endpoint(base),
            ProviderId::Gemini => gemini::models_endpoint(base),
            ProviderId::Claude => claude::models_endpoint(base),
        }
    }

    fn generate_request(
        &self,
        endpoint: &str,
        api_key: &str,
        prompt: &Prompt,
        params: GenerationParams,
    ) -> RequestBuilder {
        let client = &self.client;
        let model = self.settings.model.as_str();
        match self.id {
            ProviderId::DeepSeek | ProviderId::Gpt => {
                chat_completions::generate_request(client, endpoint, api_key, model, prompt, params)
            }
            ProviderId::Gemini => {
                gemini::generate_request(client, endpoint, api_key, model, prompt, params)
            }
            ProviderId::Claude => {
                claude::generate_request(client, endpoint, api_key, model, prompt, params)
            }
        }
    }

    fn validation_request(&self, endpoint: &str, api_key: &str) -> RequestBuilder {
        match self.id {
            ProviderId::DeepSeek | ProviderId::Gpt => {
                chat_completions::validation_request(&self.client, endpoint, api_key)
            }
            ProviderId::Gemini => gemini::validation_request(&self.client, endpoint, api_key),
            ProviderId::Claude => claude::validation_request(&self.client, endpoint, api_key),
        }
    }

    fn parse_completion(&self, body: &str) -> std::result::Result<Completion, String> {
        match self.id {
            ProviderId::DeepSeek => deepseek::parse_completion(body),
            ProviderId::Gemini => gemini::parse_completion(body),
            ProviderId::Claude => claude::parse_completion(body),
            ProviderId::Gpt => gpt::parse_completion(body),
        }
    }

    fn api_key(&self) -> std::result::Result<&str, ProviderError> {
        self.settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::MissingApiKey { provider: self.id })
    }

    /// One HTTP exchange. Non-2xx statuses and transport failures are classified here.
    async fn send_once(
        &self,
        endpoint: &str,
        request: RequestBuilder,
        attempt: u32,
    ) -> std::result::Result<String, ProviderError> {
        let started = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                // The request URL may carry a query-string API key.
                let e = e.without_url();
                tracing::warn!(
                    provider = %self.id,
                    endpoint,
                    attempt,
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "transport failure"
                );
                return Err(classify_transport(self.id, endpoint, attempt, e));
            }
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(self.id, endpoint, attempt, e.without_url()))?;
        let duration_ms = started.elapsed().as_millis() as u64;

        if status.is_success() {
            tracing::debug!(
                provider = %self.id,
                endpoint,
                attempt,
                duration_ms,
                status = status.as_u16(),
                "request succeeded"
            );
            return Ok(body);
        }

        tracing::warn!(
            provider = %self.id,
            endpoint,
            attempt,
            duration_ms,
            status = status.as_u16(),
            body = %truncate_for_log(&body, LOG_BODY_LIMIT),
            "request failed"
        );
        Err(classify_status(self.id, endpoint, status, &body, attempt))
    }

    /// Send with the shared retry policy. `build` is called once per attempt.
    async fn send_with_retry<F>(
        &self,
        endpoint: &str,
        build: F,
    ) -> std::result::Result<String, ProviderError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let max_attempts = self.runtime.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.send_once(endpoint, build(), attempt).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.runtime.retry.delay_for(attempt);
                    tracing::info!(
                        provider = %self.id,
                        endpoint,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        kind = %err.kind(),
                        "retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl SummaryProvider for HttpProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn generate_summary(
        &self,
        content: &str,
        options: &SummaryOptions,
    ) -> std::result::Result<SummaryResult, ProviderError> {
        let api_key = self.api_key()?;

        let key = cache_key(self.id, &self.settings.model, content, options);
        if let Some(mut hit) = self.runtime.cache.get(&key).await {
            tracing::debug!(provider = %self.id, "serving summary from cache");
            hit.cached = true;
            return Ok(hit);
        }

        let endpoint = self.endpoint();
        if !self
            .runtime
            .limiter
            .try_acquire(self.id, self.settings.rate_limit_per_minute)
            .await
        {
            tracing::warn!(
                provider = %self.id,
                limit = self.settings.rate_limit_per_minute,
                "local rate limit reached"
            );
            return Err(ProviderError::RateLimitExceeded {
                provider: self.id,
                endpoint: Some(endpoint),
                attempts: 0,
            });
        }

        let prompt = self.runtime.prompts.build_prompt(content, options);
        let params = GenerationParams::from(options);

        let started = Instant::now();
        let body = self
            .send_with_retry(&endpoint, || {
                self.generate_request(&endpoint, api_key, &prompt, params)
            })
            .await?;
        let generation_time = started.elapsed().as_secs_f64();

        let completion = self.parse_completion(&body).map_err(|detail| {
            tracing::error!(
                provider = %self.id,
                endpoint = %endpoint,
                body = %truncate_for_log(&body, LOG_BODY_LIMIT),
                "{}",
                detail
            );
            ProviderError::Api {
                provider: self.id,
                endpoint: endpoint.clone(),
                status: Some(200),
                detail,
            }
        })?;

        let summary = finalize_summary(&completion.text);
        if summary.is_empty() {
            return Err(ProviderError::Api {
                provider: self.id,
                endpoint,
                status: Some(200),
                detail: "response contained no summary text".to_string(),
            });
        }

        let tokens_used = total_tokens(&completion);
        let result = SummaryResult {
            summary,
            provider: self.id,
            model: completion
                .model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| self.settings.model.clone()),
            tokens_used,
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            cached_tokens: completion.cached_tokens,
            generation_time,
            cached: false,
            language: options.language.clone(),
        };

        tracing::info!(
            provider = %self.id,
            model = %result.model,
            tokens = result.tokens_used,
            seconds = result.generation_time,
            "summary generated"
        );

        self.runtime.cache.insert(key, result.clone()).await;
        Ok(result)
    }

    async fn validate_credentials(&self) -> std::result::Result<(), ProviderError> {
        let api_key = self.api_key()?;
        let endpoint = self.models_endpoint();

        match self
            .send_once(&endpoint, self.validation_request(&endpoint, api_key), 1)
            .await
        {
            Ok(_) => Ok(()),
            Err(ProviderError::Api {
                status: Some(status @ (401 | 403)),
                ..
            }) => Err(ProviderError::InvalidCredentials {
                provider: self.id,
                endpoint,
                status,
            }),
            Err(err) => Err(err),
        }
    }
}

fn total_tokens(completion: &Completion) -> u32 {
    completion
        .total_tokens
        .unwrap_or(completion.input_tokens.saturating_add(completion.output_tokens))
}

fn classify_transport(
    provider: ProviderId,
    endpoint: &str,
    attempts: u32,
    error: reqwest::Error,
) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout {
            provider,
            endpoint: endpoint.to_string(),
            attempts,
        }
    } else if error.is_builder() {
        ProviderError::Api {
            provider,
            endpoint: endpoint.to_string(),
            status: None,
            detail: error.to_string(),
        }
    } else {
        ProviderError::ServiceUnavailable {
            provider,
            endpoint: endpoint.to_string(),
            status: None,
            attempts,
        }
    }
}

pub(crate) fn classify_status(
    provider: ProviderId,
    endpoint: &str,
    status: StatusCode,
    body: &str,
    attempts: u32,
) -> ProviderError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ProviderError::RateLimitExceeded {
            provider,
            endpoint: Some(endpoint.to_string()),
            attempts,
        };
    }
    if status.is_server_error() {
        return ProviderError::ServiceUnavailable {
            provider,
            endpoint: endpoint.to_string(),
            status: Some(status.as_u16()),
            attempts,
        };
    }
    ProviderError::Api {
        provider,
        endpoint: endpoint.to_string(),
        status: Some(status.as_u16()),
        detail: extract_error_message(body)
            .unwrap_or_else(|| truncate_for_log(body, LOG_BODY_LIMIT)),
    }
}

/// Vendor error bodies all look like `{"error": {"message": "..."}}` or `{"error": "..."}`.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(str::to_string)
}

pub(crate) fn truncate_for_log(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn classifies_statuses() {
        let kind = |code: u16| {
            classify_status(
                ProviderId::Gpt,
                "https://x.test",
                StatusCode::from_u16(code).unwrap(),
                "",
                1,
            )
            .kind()
        };
        assert_eq!(kind(429), ErrorKind::RateLimitExceeded);
        assert_eq!(kind(500), ErrorKind::ServiceUnavailable);
        assert_eq!(kind(503), ErrorKind::ServiceUnavailable);
        assert_eq!(kind(400), ErrorKind::ApiError);
        assert_eq!(kind(401), ErrorKind::ApiError);
        assert_eq!(kind(404), ErrorKind::ApiError);
    }

    #[test]
    fn api_error_uses_vendor_message() {
        let err = classify_status(
            ProviderId::Claude,
            "https://x.test",
            StatusCode::BAD_REQUEST,
            r#"{"type":"error","error":{"type":"invalid_request_error","message":"max_tokens too large"}}"#,
            1,
        );
        match err {
            ProviderError::Api { detail, status, .. } => {
                assert_eq!(detail, "max_tokens too large");
                assert_eq!(status, Some(400));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn token_total_saturates() {
        let mut completion = Completion {
            text: "x".to_string(),
            model: None,
            input_tokens: u32::MAX,
            output_tokens: 5,
            cached_tokens: 0,
            total_tokens: None,
        };
        assert_eq!(total_tokens(&completion), u32::MAX);

        completion.total_tokens = Some(12);
        assert_eq!(total_tokens(&completion), 12);
    }

    #[test]
    fn truncation_is_char_safe() {
        assert_eq!(truncate_for_log("héllo wörld", 5), "héllo…");
        assert_eq!(truncate_for_log("short", 10), "short");
    }
}
