use crate::error::PromptError;
use crate::models::{SummaryFormat, SummaryOptions};

pub const MIN_TEMPLATE_LEN: usize = 20;

pub const SYSTEM_PROMPT: &str = "You are an expert editor who writes short, accurate TL;DR summaries of blog posts. \
Stay faithful to the source, never invent facts, and answer with the summary only.";

pub const DEFAULT_TEMPLATE: &str = r#"Write a TL;DR summary of the article below.

Requirements:
- Language: {language}
- Length: at most {max_length} words
- Tone: {style}
- Layout: {format}
- {use_emojis}
- Return clean HTML using only <p>, <ul>, <ol>, <li>, <strong> and <em>. Do not wrap the answer in code fences.

Article:
{content}"#;

/// A filled prompt, split the way chat APIs expect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Replace every literal `{name}` in `template` with its value.
pub fn process_prompt<S: AsRef<str>>(template: &str, vars: &[(&str, S)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{}}}", name), value.as_ref());
    }
    out
}

pub fn validate_template(template: &str) -> Result<(), PromptError> {
    let trimmed = template.trim();
    if trimmed.is_empty() {
        return Err(PromptError::Empty);
    }
    let len = trimmed.chars().count();
    if len < MIN_TEMPLATE_LEN {
        return Err(PromptError::TooShort {
            min: MIN_TEMPLATE_LEN,
            actual: len,
        });
    }
    if !trimmed.contains("{content}") {
        return Err(PromptError::MissingContentPlaceholder);
    }
    Ok(())
}

/// Human readable name for the common ISO 639-1 codes; anything else is passed through.
pub fn language_name(code: &str) -> &str {
    match code.trim().to_ascii_lowercase().as_str() {
        "en" => "English",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "it" => "Italian",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        "pl" => "Polish",
        "ru" => "Russian",
        "uk" => "Ukrainian",
        "tr" => "Turkish",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "zh" => "Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        _ => code,
    }
}

fn format_instruction(options: &SummaryOptions) -> String {
    match options.format {
        SummaryFormat::Paragraph => "a single concise paragraph".to_string(),
        SummaryFormat::BulletPoints => {
            format!("a bulleted list of {} key points", options.bullet_points)
        }
        SummaryFormat::NumberedList => {
            format!("a numbered list of {} key points", options.bullet_points)
        }
    }
}

fn emoji_instruction(use_emojis: bool) -> &'static str {
    if use_emojis {
        "Use a few relevant emojis to highlight key points."
    } else {
        "Do not use emojis."
    }
}

pub fn prompt_variables(content: &str, options: &SummaryOptions) -> Vec<(&'static str, String)> {
    vec![
        ("language", language_name(&options.language).to_string()),
        ("max_length", options.max_length.to_string()),
        ("style", options.style.to_string()),
        ("format", format_instruction(options)),
        ("bullet_points", options.bullet_points.to_string()),
        ("use_emojis", emoji_instruction(options.use_emojis).to_string()),
        // Substituted last so placeholders inside the post body stay untouched.
        ("content", content.to_string()),
    ]
}

#[derive(Debug, Clone)]
pub struct PromptManager {
    template: String,
}

impl Default for PromptManager {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptManager {
    pub fn new(template: Option<String>) -> Result<Self, PromptError> {
        match template {
            Some(template) => {
                validate_template(&template)?;
                Ok(Self { template })
            }
            None => Ok(Self::default()),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn build_prompt(&self, content: &str, options: &SummaryOptions) -> Prompt {
        let vars = prompt_variables(content, options);
        Prompt {
            system: SYSTEM_PROMPT.to_string(),
            user: process_prompt(&self.template, vars.as_slice()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SummaryStyle;

    #[test]
    fn replaces_every_occurrence() {
        let out = process_prompt(
            "{content} | {language} | {max_length} | {content} {language}",
            &[("content", "BODY"), ("language", "French"), ("max_length", "50")],
        );
        assert_eq!(out, "BODY | French | 50 | BODY French");
    }

    #[test]
    fn unknown_placeholders_are_left_as_is() {
        let out = process_prompt("{content} {tone}", &[("content", "x")]);
        assert_eq!(out, "x {tone}");
    }

    #[test]
    fn validation_rules() {
        assert_eq!(validate_template("   "), Err(PromptError::Empty));
        assert!(matches!(
            validate_template("{content} hi"),
            Err(PromptError::TooShort { .. })
        ));
        assert_eq!(
            validate_template("Summarize this article for me please"),
            Err(PromptError::MissingContentPlaceholder)
        );
        assert_eq!(validate_template(DEFAULT_TEMPLATE), Ok(()));
    }

    #[test]
    fn manager_rejects_bad_custom_template() {
        assert!(PromptManager::new(Some("no placeholder in this template".into())).is_err());
        let manager = PromptManager::new(None).unwrap();
        assert_eq!(manager.template(), DEFAULT_TEMPLATE);
    }

    #[test]
    fn builds_prompt_from_options() {
        let options = SummaryOptions {
            language: "fr".to_string(),
            max_length: 50,
            style: SummaryStyle::Casual,
            format: SummaryFormat::BulletPoints,
            use_emojis: false,
            bullet_points: 3,
        };
        let prompt = PromptManager::default().build_prompt("Le contenu {language}", &options);
        assert!(prompt.user.contains("Language: French"));
        assert!(prompt.user.contains("at most 50 words"));
        assert!(prompt.user.contains("Tone: casual"));
        assert!(prompt.user.contains("bulleted list of 3 key points"));
        assert!(prompt.user.contains("Do not use emojis."));
        assert!(prompt.user.ends_with("Le contenu {language}"));
        assert!(!prompt.system.is_empty());
    }

    #[test]
    fn unknown_language_code_passes_through() {
        assert_eq!(language_name("sw"), "sw");
        assert_eq!(language_name("DE"), "German");
    }
}
