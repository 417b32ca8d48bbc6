mod options;
mod provider;
mod summary;

pub use options::{SummaryFormat, SummaryOptions, SummaryOverrides, SummaryStyle};
pub use provider::{estimate_cost, Capabilities, ModelInfo, ProviderConfig, ProviderId};
pub use summary::{StoredSummary, SummaryResult, SummaryStats, SummaryStatus};
