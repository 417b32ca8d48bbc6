//! Fallback and batch behaviour of the manager, using in-memory providers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use post_tldr::ai::{AiManager, ManagerSettings, SummaryProvider};
use post_tldr::config::{BatchConfig, FallbackConfig};
use post_tldr::models::{ProviderId, SummaryOptions, SummaryOverrides, SummaryResult, SummaryStyle};
use post_tldr::ProviderError;

/// Replays a fixed outcome and records every call.
struct StubProvider {
    id: ProviderId,
    failure: Option<ProviderError>,
    valid: bool,
    calls: AtomicUsize,
    validations: AtomicUsize,
    seen: Mutex<Vec<(String, SummaryOptions)>>,
}

impl StubProvider {
    fn new(id: ProviderId, failure: Option<ProviderError>, valid: bool) -> Arc<Self> {
        Arc::new(Self {
            id,
            failure,
            valid,
            calls: AtomicUsize::new(0),
            validations: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn ok(id: ProviderId) -> Arc<Self> {
        Self::new(id, None, true)
    }

    fn failing(id: ProviderId, failure: ProviderError) -> Arc<Self> {
        Self::new(id, Some(failure), true)
    }

    fn invalid(id: ProviderId) -> Arc<Self> {
        Self::new(id, None, false)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummaryProvider for StubProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn model(&self) -> &str {
        "stub-model"
    }

    async fn generate_summary(
        &self,
        content: &str,
        options: &SummaryOptions,
    ) -> Result<SummaryResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((content.to_string(), options.clone()));
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        Ok(SummaryResult {
            summary: format!("{} says: {}", self.id, content),
            provider: self.id,
            model: "stub-model".to_string(),
            tokens_used: 10,
            input_tokens: 7,
            output_tokens: 3,
            cached_tokens: 0,
            generation_time: 0.01,
            cached: false,
            language: options.language.clone(),
        })
    }

    async fn validate_credentials(&self) -> Result<(), ProviderError> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        if self.valid {
            Ok(())
        } else {
            Err(ProviderError::InvalidCredentials {
                provider: self.id,
                endpoint: "stub://models".to_string(),
                status: 401,
            })
        }
    }
}

fn unavailable(id: ProviderId) -> ProviderError {
    ProviderError::ServiceUnavailable {
        provider: id,
        endpoint: "stub://generate".to_string(),
        status: Some(503),
        attempts: 3,
    }
}

fn settings(active: ProviderId, order: Vec<ProviderId>) -> ManagerSettings {
    ManagerSettings {
        active,
        fallback: FallbackConfig {
            enabled: true,
            order,
        },
        defaults: SummaryOptions::default(),
        batch: BatchConfig {
            size: 2,
            item_delay_ms: 0,
            chunk_delay_ms: 0,
        },
    }
}

fn manager(providers: Vec<Arc<StubProvider>>, settings: ManagerSettings) -> AiManager {
    let providers = providers
        .into_iter()
        .map(|p| p as Arc<dyn SummaryProvider>)
        .collect();
    AiManager::new(providers, settings).unwrap()
}

#[tokio::test]
async fn active_provider_handles_request() {
    let primary = StubProvider::ok(ProviderId::DeepSeek);
    let backup = StubProvider::ok(ProviderId::Gpt);
    let manager = manager(
        vec![primary.clone(), backup.clone()],
        settings(ProviderId::DeepSeek, ProviderId::ALL.to_vec()),
    );

    let result = manager
        .generate_summary("post", &SummaryOverrides::default())
        .await
        .unwrap();

    assert_eq!(result.provider, ProviderId::DeepSeek);
    assert_eq!(primary.calls(), 1);
    assert_eq!(backup.calls(), 0);
}

#[tokio::test]
async fn falls_back_and_reports_actual_provider() {
    let primary = StubProvider::failing(ProviderId::DeepSeek, unavailable(ProviderId::DeepSeek));
    let backup = StubProvider::ok(ProviderId::Claude);
    let manager = manager(
        vec![primary.clone(), backup.clone()],
        settings(ProviderId::DeepSeek, ProviderId::ALL.to_vec()),
    );

    let result = manager
        .generate_summary("post", &SummaryOverrides::default())
        .await
        .unwrap();

    assert_eq!(result.provider, ProviderId::Claude);
    assert_eq!(primary.calls(), 1);
    assert_eq!(backup.calls(), 1);
}

#[tokio::test]
async fn credential_errors_never_fall_back() {
    for failure in [
        ProviderError::MissingApiKey {
            provider: ProviderId::Gemini,
        },
        ProviderError::InvalidCredentials {
            provider: ProviderId::Gemini,
            endpoint: "stub://models".to_string(),
            status: 403,
        },
    ] {
        let primary = StubProvider::failing(ProviderId::Gemini, failure.clone());
        let backup = StubProvider::ok(ProviderId::Gpt);
        let manager = manager(
            vec![primary, backup.clone()],
            settings(ProviderId::Gemini, ProviderId::ALL.to_vec()),
        );

        let err = manager
            .generate_summary("post", &SummaryOverrides::default())
            .await
            .unwrap_err();

        assert_eq!(err, failure);
        assert_eq!(backup.calls(), 0);
        assert_eq!(backup.validations.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn disabled_fallback_returns_primary_error() {
    let primary = StubProvider::failing(ProviderId::Gpt, unavailable(ProviderId::Gpt));
    let backup = StubProvider::ok(ProviderId::Claude);
    let mut settings = settings(ProviderId::Gpt, ProviderId::ALL.to_vec());
    settings.fallback.enabled = false;
    let manager = manager(vec![primary, backup.clone()], settings);

    let err = manager
        .generate_summary("post", &SummaryOverrides::default())
        .await
        .unwrap_err();

    assert_eq!(err, unavailable(ProviderId::Gpt));
    assert_eq!(backup.calls(), 0);
}

#[tokio::test]
async fn primary_error_wins_when_fallback_fails() {
    let primary_error = ProviderError::Timeout {
        provider: ProviderId::Claude,
        endpoint: "stub://generate".to_string(),
        attempts: 3,
    };
    let primary = StubProvider::failing(ProviderId::Claude, primary_error.clone());
    let backup = StubProvider::failing(ProviderId::Gpt, unavailable(ProviderId::Gpt));
    let last = StubProvider::ok(ProviderId::Gemini);
    let manager = manager(
        vec![primary, backup.clone(), last.clone()],
        settings(
            ProviderId::Claude,
            vec![ProviderId::Claude, ProviderId::Gpt, ProviderId::Gemini],
        ),
    );

    let err = manager
        .generate_summary("post", &SummaryOverrides::default())
        .await
        .unwrap_err();

    assert_eq!(err, primary_error);
    assert_eq!(backup.calls(), 1);
    // Only one fallback attempt is made.
    assert_eq!(last.calls(), 0);
}

#[tokio::test]
async fn fallback_skips_invalid_and_unconfigured_providers() {
    let primary = StubProvider::failing(
        ProviderId::DeepSeek,
        ProviderError::RateLimitExceeded {
            provider: ProviderId::DeepSeek,
            endpoint: None,
            attempts: 0,
        },
    );
    let invalid = StubProvider::invalid(ProviderId::Gemini);
    let good = StubProvider::ok(ProviderId::Gpt);
    let manager = manager(
        vec![primary, invalid.clone(), good.clone()],
        settings(
            ProviderId::DeepSeek,
            vec![
                ProviderId::Claude,
                ProviderId::Gemini,
                ProviderId::DeepSeek,
                ProviderId::Gpt,
            ],
        ),
    );

    let result = manager
        .generate_summary("post", &SummaryOverrides::default())
        .await
        .unwrap();

    assert_eq!(result.provider, ProviderId::Gpt);
    assert_eq!(invalid.validations.load(Ordering::SeqCst), 1);
    assert_eq!(invalid.calls(), 0);
}

#[tokio::test]
async fn overrides_are_merged_over_defaults() {
    let primary = StubProvider::ok(ProviderId::Gpt);
    let manager = manager(
        vec![primary.clone()],
        settings(ProviderId::Gpt, vec![ProviderId::Gpt]),
    );
    let overrides = SummaryOverrides {
        language: Some("es".to_string()),
        style: Some(SummaryStyle::Creative),
        ..Default::default()
    };

    let result = manager.generate_summary("post", &overrides).await.unwrap();
    assert_eq!(result.language, "es");

    let seen = primary.seen.lock().unwrap();
    let (_, options) = &seen[0];
    assert_eq!(options.language, "es");
    assert_eq!(options.style, SummaryStyle::Creative);
    assert_eq!(options.max_length, SummaryOptions::default().max_length);
}

#[tokio::test]
async fn batch_preserves_order_across_chunks() {
    let primary = StubProvider::ok(ProviderId::DeepSeek);
    let manager = manager(
        vec![primary.clone()],
        settings(ProviderId::DeepSeek, vec![ProviderId::DeepSeek]),
    );
    let contents: Vec<String> = (1..=5).map(|i| format!("post {}", i)).collect();

    let results = manager
        .batch_generate_summaries(&contents, &SummaryOverrides::default())
        .await;

    assert_eq!(results.len(), 5);
    for (i, result) in results.iter().enumerate() {
        let summary = &result.as_ref().unwrap().summary;
        assert!(summary.ends_with(&format!("post {}", i + 1)), "{summary}");
    }
    assert_eq!(primary.calls(), 5);
}

#[tokio::test]
async fn batch_reports_failures_in_place() {
    let primary = StubProvider::failing(
        ProviderId::Gpt,
        ProviderError::Api {
            provider: ProviderId::Gpt,
            endpoint: "stub://generate".to_string(),
            status: Some(400),
            detail: "bad request".to_string(),
        },
    );
    let manager = manager(
        vec![primary],
        settings(ProviderId::Gpt, vec![ProviderId::Gpt]),
    );
    let contents = vec!["a".to_string(), "b".to_string(), "c".to_string()];

    let results = manager
        .batch_generate_summaries(&contents, &SummaryOverrides::default())
        .await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.is_err()));
}

#[tokio::test(start_paused = true)]
async fn batch_sleeps_between_items_and_chunks() {
    let primary = StubProvider::ok(ProviderId::Gpt);
    let mut settings = settings(ProviderId::Gpt, vec![ProviderId::Gpt]);
    settings.batch = BatchConfig {
        size: 2,
        item_delay_ms: 1_000,
        chunk_delay_ms: 5_000,
    };
    let manager = manager(vec![primary], settings);
    let contents: Vec<String> = (0..4).map(|i| i.to_string()).collect();

    let started = tokio::time::Instant::now();
    let results = manager
        .batch_generate_summaries(&contents, &SummaryOverrides::default())
        .await;

    assert_eq!(results.len(), 4);
    // Two chunks of two: one item delay per chunk plus one chunk delay.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(7_000), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(8_000), "{elapsed:?}");
}

#[test]
fn active_provider_must_be_configured() {
    let providers = vec![StubProvider::ok(ProviderId::Gpt) as Arc<dyn SummaryProvider>];
    assert!(AiManager::new(providers, settings(ProviderId::Claude, vec![])).is_err());
}
