use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::SummaryResult;

/// The closed set of supported vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    DeepSeek,
    Gemini,
    Claude,
    Gpt,
}

impl ProviderId {
    pub const ALL: [ProviderId; 4] = [
        ProviderId::DeepSeek,
        ProviderId::Gemini,
        ProviderId::Claude,
        ProviderId::Gpt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderId::DeepSeek => "deepseek",
            ProviderId::Gemini => "gemini",
            ProviderId::Claude => "claude",
            ProviderId::Gpt => "gpt",
        }
    }

    pub fn config(self) -> &'static ProviderConfig {
        match self {
            ProviderId::DeepSeek => &DEEPSEEK,
            ProviderId::Gemini => &GEMINI,
            ProviderId::Claude => &CLAUDE,
            ProviderId::Gpt => &GPT,
        }
    }

    /// Environment variable consulted when no key is present in the config file.
    pub fn api_key_env(self) -> &'static str {
        match self {
            ProviderId::DeepSeek => "DEEPSEEK_API_KEY",
            ProviderId::Gemini => "GEMINI_API_KEY",
            ProviderId::Claude => "ANTHROPIC_API_KEY",
            ProviderId::Gpt => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deepseek" => Ok(ProviderId::DeepSeek),
            "gemini" | "google" => Ok(ProviderId::Gemini),
            "claude" | "anthropic" => Ok(ProviderId::Claude),
            "gpt" | "openai" => Ok(ProviderId::Gpt),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub streaming: bool,
    pub vision: bool,
    pub function_calling: bool,
}

/// Context window and USD pricing per million tokens for one model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub context_window: u32,
    pub input_per_million: f64,
    pub output_per_million: f64,
    pub cached_input_per_million: f64,
}

/// Compiled-in vendor metadata. Never mutated at runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderConfig {
    pub id: ProviderId,
    pub display_name: &'static str,
    pub base_url: &'static str,
    pub default_model: &'static str,
    pub timeout_secs: u64,
    pub rate_limit_per_minute: u32,
    pub capabilities: Capabilities,
    pub models: &'static [ModelInfo],
}

impl ProviderConfig {
    pub fn model(&self, id: &str) -> Option<&'static ModelInfo> {
        self.models.iter().find(|m| m.id == id)
    }
}

const DEEPSEEK: ProviderConfig = ProviderConfig {
    id: ProviderId::DeepSeek,
    display_name: "DeepSeek",
    base_url: "https://api.deepseek.com",
    default_model: "deepseek-chat",
    timeout_secs: 120,
    rate_limit_per_minute: 60,
    capabilities: Capabilities {
        streaming: true,
        vision: false,
        function_calling: true,
    },
    models: &[
        ModelInfo {
            id: "deepseek-chat",
            context_window: 64_000,
            input_per_million: 0.27,
            output_per_million: 1.10,
            cached_input_per_million: 0.07,
        },
        ModelInfo {
            id: "deepseek-reasoner",
            context_window: 64_000,
            input_per_million: 0.55,
            output_per_million: 2.19,
            cached_input_per_million: 0.14,
        },
    ],
};

const GEMINI: ProviderConfig = ProviderConfig {
    id: ProviderId::Gemini,
    display_name: "Google Gemini",
    base_url: "https://generativelanguage.googleapis.com/v1beta",
    default_model: "gemini-2.0-flash",
    timeout_secs: 30,
    rate_limit_per_minute: 100,
    capabilities: Capabilities {
        streaming: true,
        vision: true,
        function_calling: true,
    },
    models: &[
        ModelInfo {
            id: "gemini-2.0-flash",
            context_window: 1_048_576,
            input_per_million: 0.10,
            output_per_million: 0.40,
            cached_input_per_million: 0.025,
        },
        ModelInfo {
            id: "gemini-1.5-pro",
            context_window: 2_097_152,
            input_per_million: 1.25,
            output_per_million: 5.00,
            cached_input_per_million: 0.3125,
        },
    ],
};

const CLAUDE: ProviderConfig = ProviderConfig {
    id: ProviderId::Claude,
    display_name: "Anthropic Claude",
    base_url: "https://api.anthropic.com/v1",
    default_model: "claude-3-5-haiku-20241022",
    timeout_secs: 60,
    rate_limit_per_minute: 100,
    capabilities: Capabilities {
        streaming: true,
        vision: true,
        function_calling: true,
    },
    models: &[
        ModelInfo {
            id: "claude-3-5-haiku-20241022",
            context_window: 200_000,
            input_per_million: 0.80,
            output_per_million: 4.00,
            cached_input_per_million: 0.08,
        },
        ModelInfo {
            id: "claude-3-5-sonnet-20241022",
            context_window: 200_000,
            input_per_million: 3.00,
            output_per_million: 15.00,
            cached_input_per_million: 0.30,
        },
    ],
};

const GPT: ProviderConfig = ProviderConfig {
    id: ProviderId::Gpt,
    display_name: "OpenAI GPT",
    base_url: "https://api.openai.com/v1",
    default_model: "gpt-4o-mini",
    timeout_secs: 60,
    rate_limit_per_minute: 60,
    capabilities: Capabilities {
        streaming: true,
        vision: true,
        function_calling: true,
    },
    models: &[
        ModelInfo {
            id: "gpt-4o-mini",
            context_window: 128_000,
            input_per_million: 0.15,
            output_per_million: 0.60,
            cached_input_per_million: 0.075,
        },
        ModelInfo {
            id: "gpt-4o",
            context_window: 128_000,
            input_per_million: 2.50,
            output_per_million: 10.00,
            cached_input_per_million: 1.25,
        },
    ],
};

/// Estimated USD cost of a result, or `None` when the model has no pricing entry.
/// Cached results cost nothing.
pub fn estimate_cost(result: &SummaryResult) -> Option<f64> {
    if result.cached {
        return Some(0.0);
    }
    let info = result.provider.config().model(&result.model)?;
    let cached = result.cached_tokens.min(result.input_tokens);
    let fresh = result.input_tokens - cached;
    let cost = (fresh as f64 * info.input_per_million
        + cached as f64 * info.cached_input_per_million
        + result.output_tokens as f64 * info.output_per_million)
        / 1_000_000.0;
    Some(cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(model: &str) -> SummaryResult {
        SummaryResult {
            summary: "s".to_string(),
            provider: ProviderId::DeepSeek,
            model: model.to_string(),
            tokens_used: 3_000_000,
            input_tokens: 2_000_000,
            output_tokens: 1_000_000,
            cached_tokens: 1_000_000,
            generation_time: 1.0,
            cached: false,
            language: "en".to_string(),
        }
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("OpenAI".parse::<ProviderId>(), Ok(ProviderId::Gpt));
        assert_eq!("anthropic".parse::<ProviderId>(), Ok(ProviderId::Claude));
        assert!("mistral".parse::<ProviderId>().is_err());
    }

    #[test]
    fn every_default_model_is_priced() {
        for id in ProviderId::ALL {
            let config = id.config();
            assert_eq!(config.id, id);
            assert!(config.model(config.default_model).is_some(), "{id}");
        }
    }

    #[test]
    fn cost_splits_cached_input() {
        let cost = estimate_cost(&result("deepseek-chat")).unwrap();
        let expected = 0.27 + 0.07 + 1.10;
        assert!((cost - expected).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_has_no_cost() {
        assert_eq!(estimate_cost(&result("deepseek-v9")), None);
    }
}
