use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProviderId;

/// Normalised output of a provider call. The field set is the same for every vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
    pub provider: ProviderId,
    pub model: String,
    pub tokens_used: u32,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cached_tokens: u32,
    /// Wall-clock seconds spent on the vendor call.
    pub generation_time: f64,
    pub cached: bool,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSummary {
    pub id: i64,
    pub post_id: i64,
    pub summary_text: String,
    pub api_provider: String,
    pub model: String,
    pub tokens_used: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub generation_time: f64,
    pub status: SummaryStatus,
    pub language: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    #[default]
    Active,
    Disabled,
}

impl SummaryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryStatus::Active => "active",
            SummaryStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SummaryStatus::Active),
            "disabled" => Ok(SummaryStatus::Disabled),
            other => Err(format!("unknown summary status '{}'", other)),
        }
    }
}

/// Aggregate counters over the stored summaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total: i64,
    pub active: i64,
    pub tokens_used: i64,
    pub average_generation_time: f64,
    pub by_provider: Vec<(String, i64)>,
}
