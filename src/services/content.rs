use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::{AppError, Result};

// Wide enough that html2text never wraps paragraphs.
const TEXT_WIDTH: usize = 10_000;

fn html_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<(?:[a-zA-Z][a-zA-Z0-9]*|/[a-zA-Z]|!--)").expect("valid html tag regex"))
}

fn shortcode_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[/?[a-z_][a-z0-9_-]*(?:\s[^\[\]]*)?/?\]").expect("valid shortcode regex"))
}

fn blank_lines_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("valid blank line regex"))
}

fn inline_space_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\u{a0}]+").expect("valid whitespace regex"))
}

pub fn looks_like_html(text: &str) -> bool {
    html_tag_regex().is_match(text)
}

/// Remove `[gallery ids="1,2"]`-style shortcodes. Markdown links (`[text](url)`) survive.
pub fn strip_shortcodes(text: &str) -> String {
    shortcode_regex()
        .replace_all(text, |caps: &Captures| {
            let end = caps.get(0).map_or(0, |m| m.end());
            if text[end..].starts_with('(') {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

pub fn collapse_whitespace(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .map(|line| inline_space_regex().replace_all(line.trim(), " ").into_owned())
        .collect();
    blank_lines_regex()
        .replace_all(lines.join("\n").trim(), "\n\n")
        .into_owned()
}

/// Cut to at most `max_chars` characters, never splitting a UTF-8 sequence.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Turn a raw post body (HTML, Markdown or plain text) into the text sent to a provider.
pub fn prepare_content(raw: &str, max_chars: usize) -> Result<String> {
    let without_shortcodes = strip_shortcodes(raw);

    let text = if looks_like_html(&without_shortcodes) {
        html2text::from_read(without_shortcodes.as_bytes(), TEXT_WIDTH)
            .map_err(|e| AppError::Content(format!("could not convert HTML: {}", e)))?
    } else {
        without_shortcodes
    };

    let cleaned = collapse_whitespace(&text);
    if cleaned.is_empty() {
        return Err(AppError::Content("post has no text content".to_string()));
    }

    let truncated = truncate_chars(&cleaned, max_chars);
    if truncated.len() < cleaned.len() {
        tracing::debug!(
            original_chars = cleaned.chars().count(),
            max_chars,
            "truncating post content"
        );
    }
    Ok(truncated.trim_end().to_string())
}
