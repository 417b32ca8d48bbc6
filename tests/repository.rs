use post_tldr::db::Repository;
use post_tldr::models::{ProviderId, SummaryResult, SummaryStatus};

fn result(provider: ProviderId, text: &str, tokens: u32) -> SummaryResult {
    SummaryResult {
        summary: text.to_string(),
        provider,
        model: "test-model".to_string(),
        tokens_used: tokens,
        input_tokens: tokens - 10,
        output_tokens: 10,
        cached_tokens: 0,
        generation_time: 1.5,
        cached: false,
        language: "en".to_string(),
    }
}

async fn open() -> (tempfile::TempDir, Repository) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("summaries.db");
    let repo = Repository::new(path.to_str().unwrap()).await.unwrap();
    (dir, repo)
}

#[tokio::test]
async fn save_and_get_round_trip() {
    let (_dir, repo) = open().await;

    repo.save_summary(42, &result(ProviderId::Claude, "First.", 100))
        .await
        .unwrap();

    let stored = repo.get_summary(42).await.unwrap().unwrap();
    assert_eq!(stored.post_id, 42);
    assert_eq!(stored.summary_text, "First.");
    assert_eq!(stored.api_provider, "claude");
    assert_eq!(stored.tokens_used, 100);
    assert_eq!(stored.input_tokens, 90);
    assert_eq!(stored.status, SummaryStatus::Active);
    assert_eq!(stored.version, 1);

    assert!(repo.get_summary(7).await.unwrap().is_none());
}

#[tokio::test]
async fn resaving_updates_in_place_and_bumps_version() {
    let (_dir, repo) = open().await;

    let first_id = repo
        .save_summary(1, &result(ProviderId::Gpt, "Old.", 50))
        .await
        .unwrap();
    repo.set_status(1, SummaryStatus::Disabled).await.unwrap();
    let second_id = repo
        .save_summary(1, &result(ProviderId::Gemini, "New.", 60))
        .await
        .unwrap();

    assert_eq!(first_id, second_id);
    let stored = repo.get_summary(1).await.unwrap().unwrap();
    assert_eq!(stored.summary_text, "New.");
    assert_eq!(stored.api_provider, "gemini");
    assert_eq!(stored.version, 2);
    assert_eq!(stored.status, SummaryStatus::Active);
    assert_eq!(repo.list_summaries().await.unwrap().len(), 1);
}

#[tokio::test]
async fn status_and_delete_report_missing_rows() {
    let (_dir, repo) = open().await;
    repo.save_summary(5, &result(ProviderId::DeepSeek, "Text.", 30))
        .await
        .unwrap();

    assert!(repo.set_status(5, SummaryStatus::Disabled).await.unwrap());
    assert_eq!(
        repo.get_summary(5).await.unwrap().unwrap().status,
        SummaryStatus::Disabled
    );
    assert!(!repo.set_status(6, SummaryStatus::Disabled).await.unwrap());

    assert!(repo.delete_summary(5).await.unwrap());
    assert!(!repo.delete_summary(5).await.unwrap());
    assert!(repo.get_summary(5).await.unwrap().is_none());
}

#[tokio::test]
async fn stats_aggregate_rows() {
    let (_dir, repo) = open().await;

    let empty = repo.stats().await.unwrap();
    assert_eq!(empty.total, 0);
    assert_eq!(empty.tokens_used, 0);

    repo.save_summary(1, &result(ProviderId::Gpt, "a", 100)).await.unwrap();
    repo.save_summary(2, &result(ProviderId::Gpt, "b", 200)).await.unwrap();
    repo.save_summary(3, &result(ProviderId::Claude, "c", 50)).await.unwrap();
    repo.set_status(3, SummaryStatus::Disabled).await.unwrap();

    let stats = repo.stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.active, 2);
    assert_eq!(stats.tokens_used, 350);
    assert!((stats.average_generation_time - 1.5).abs() < f64::EPSILON);
    assert_eq!(
        stats.by_provider,
        vec![("claude".to_string(), 1), ("gpt".to_string(), 2)]
    );
}
