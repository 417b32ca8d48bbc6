use std::collections::HashMap;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::models::{ProviderId, SummaryOptions, SummaryResult};

/// Memoizes successful results for a fixed TTL. Expired entries are dropped on
/// lookup and swept on every insert.
pub struct SummaryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, SummaryResult)>>,
}

impl SummaryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<SummaryResult> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            Some((stored_at, result)) if stored_at.elapsed() < self.ttl => {
                return Some(result.clone())
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    pub async fn insert(&self, key: String, result: SummaryResult) {
        if self.ttl.is_zero() {
            return;
        }
        let ttl = self.ttl;
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        entries.insert(key, (Instant::now(), result));
    }
}

/// SHA-256 over everything that influences the generated text.
pub fn cache_key(
    provider: ProviderId,
    model: &str,
    content: &str,
    options: &SummaryOptions,
) -> String {
    let max_length = options.max_length.to_string();
    let bullet_points = options.bullet_points.to_string();
    let mut hasher = Sha256::new();
    for value in [
        provider.as_str(),
        model,
        options.language.as_str(),
        max_length.as_str(),
        options.style.as_str(),
        options.format.as_str(),
        if options.use_emojis { "1" } else { "0" },
        bullet_points.as_str(),
        content,
    ] {
        hasher.update(value.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}
