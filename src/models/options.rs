use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    #[default]
    Professional,
    Casual,
    Academic,
    Creative,
}

impl SummaryStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryStyle::Professional => "professional",
            SummaryStyle::Casual => "casual",
            SummaryStyle::Academic => "academic",
            SummaryStyle::Creative => "creative",
        }
    }

    pub fn temperature(self) -> f32 {
        match self {
            SummaryStyle::Academic => 0.3,
            SummaryStyle::Professional => 0.5,
            SummaryStyle::Casual => 0.7,
            SummaryStyle::Creative => 0.9,
        }
    }
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "professional" => Ok(SummaryStyle::Professional),
            "casual" => Ok(SummaryStyle::Casual),
            "academic" => Ok(SummaryStyle::Academic),
            "creative" => Ok(SummaryStyle::Creative),
            other => Err(format!("unknown style '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryFormat {
    #[default]
    Paragraph,
    BulletPoints,
    NumberedList,
}

impl SummaryFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryFormat::Paragraph => "paragraph",
            SummaryFormat::BulletPoints => "bullet_points",
            SummaryFormat::NumberedList => "numbered_list",
        }
    }
}

impl fmt::Display for SummaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "paragraph" => Ok(SummaryFormat::Paragraph),
            "bullet_points" | "bullets" => Ok(SummaryFormat::BulletPoints),
            "numbered_list" | "numbered" => Ok(SummaryFormat::NumberedList),
            other => Err(format!("unknown format '{}'", other)),
        }
    }
}

/// Fully resolved summary options handed to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryOptions {
    pub language: String,
    pub max_length: u32,
    pub style: SummaryStyle,
    pub format: SummaryFormat,
    pub use_emojis: bool,
    pub bullet_points: u32,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            max_length: 150,
            style: SummaryStyle::default(),
            format: SummaryFormat::default(),
            use_emojis: false,
            bullet_points: 5,
        }
    }
}

impl SummaryOptions {
    /// Output token budget for the requested word count.
    pub fn max_tokens(&self) -> u32 {
        self.max_length.saturating_mul(3).clamp(300, 4000)
    }

    pub fn temperature(&self) -> f32 {
        self.style.temperature()
    }
}

/// Caller-supplied options. Unset fields fall back to the configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryOverrides {
    pub language: Option<String>,
    pub max_length: Option<u32>,
    pub style: Option<SummaryStyle>,
    pub format: Option<SummaryFormat>,
    pub use_emojis: Option<bool>,
    pub bullet_points: Option<u32>,
}

impl SummaryOverrides {
    pub fn apply_to(&self, defaults: &SummaryOptions) -> SummaryOptions {
        SummaryOptions {
            language: self
                .language
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| defaults.language.clone()),
            max_length: self
                .max_length
                .filter(|&n| n > 0)
                .unwrap_or(defaults.max_length),
            style: self.style.unwrap_or(defaults.style),
            format: self.format.unwrap_or(defaults.format),
            use_emojis: self.use_emojis.unwrap_or(defaults.use_emojis),
            bullet_points: self
                .bullet_points
                .filter(|&n| n > 0)
                .unwrap_or(defaults.bullet_points),
        }
    }
}
