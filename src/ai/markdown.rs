//! Post-processing for raw model output.
//!
//! Models regularly wrap their answer in code fences or answer in Markdown even
//! when asked for HTML. [`finalize_summary`] removes the fences and, when
//! Markdown is still present, renders it into the styled summary block. Output
//! that is already HTML keeps its tags and only has inline Markdown converted.

use std::sync::OnceLock;

use regex::Regex;

const CONTAINER_STYLE: &str = "background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: #ffffff; border-radius: 12px; padding: 20px 24px; line-height: 1.6; box-shadow: 0 4px 15px rgba(102, 126, 234, 0.3);";
const TITLE_STYLE: &str = "margin: 0 0 12px; font-size: 1.25em; font-weight: 700; color: #ffffff;";
const HEADING_STYLE: &str = "margin: 16px 0 8px; font-size: 1.05em; font-weight: 600; color: #ffffff;";
const PARAGRAPH_STYLE: &str = "margin: 0 0 10px;";
const LIST_STYLE: &str = "margin: 8px 0 12px; padding-left: 22px;";
const ITEM_STYLE: &str = "margin-bottom: 6px;";

fn fence_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*```[^\n`]*$\n?").expect("valid fence regex"))
}

fn markdown_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)(^[ \t]*#{1,6}[ \t]+\S)|(\*\*[^*\n]+\*\*)|(__[^_\n]+__)|(^[ \t]*[-*+][ \t]+\S)|(^[ \t]*\d+[.)][ \t]+\S)",
        )
        .expect("valid markdown regex")
    })
}

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)</?(p|ul|ol|li|strong|em|b|i|h[1-6]|br|div|span)\b[^>]*>")
            .expect("valid html tag regex")
    })
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#{1,6}[ \t]+(.+?)[ \t#]*$").expect("valid heading regex"))
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-*+•][ \t]+(.+)$").expect("valid bullet regex"))
}

fn numbered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+[.)][ \t]+(.+)$").expect("valid numbered regex"))
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").expect("valid bold regex"))
}

fn italic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*([^*\n]+?)\*").expect("valid italic regex"))
}

/// Remove Markdown code-fence artifacts. The result never contains a literal "```".
pub fn strip_code_fences(text: &str) -> String {
    let without_lines = fence_line_re().replace_all(text, "");
    without_lines.replace("```", "").trim().to_string()
}

pub fn contains_markdown(text: &str) -> bool {
    markdown_re().is_match(text)
}

/// Escape the characters that are significant in HTML text and attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn looks_like_html(text: &str) -> bool {
    html_tag_re().is_match(text)
}

/// Bold and italic markers to tags. The input is not escaped.
fn convert_emphasis(text: &str) -> String {
    let bold = bold_re().replace_all(text, |caps: &regex::Captures| {
        let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        format!("<strong>{}</strong>", inner)
    });
    italic_re()
        .replace_all(&bold, "<em>$1</em>")
        .into_owned()
}

fn render_inline(text: &str) -> String {
    convert_emphasis(&escape_html(text.trim()))
}

/// Convert stray Markdown inside model-produced HTML while keeping its tags.
fn patch_html(text: &str) -> String {
    text.lines()
        .map(|line| match heading_re().captures(line.trim()) {
            Some(caps) => format!(
                "<h4 style=\"{}\">{}</h4>",
                HEADING_STYLE,
                convert_emphasis(&caps[1])
            ),
            None => convert_emphasis(line),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

struct HtmlBuilder {
    out: String,
    paragraph: Vec<String>,
    list: Option<ListKind>,
}

impl HtmlBuilder {
    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let body = self.paragraph.join(" ");
        self.out
            .push_str(&format!("<p style=\"{}\">{}</p>\n", PARAGRAPH_STYLE, body));
        self.paragraph.clear();
    }

    fn close_list(&mut self) {
        if let Some(kind) = self.list.take() {
            self.out.push_str(&format!("</{}>\n", kind.tag()));
        }
    }

    fn list_item(&mut self, kind: ListKind, text: &str) {
        self.flush_paragraph();
        if self.list != Some(kind) {
            self.close_list();
            self.out
                .push_str(&format!("<{} style=\"{}\">\n", kind.tag(), LIST_STYLE));
            self.list = Some(kind);
        }
        self.out.push_str(&format!(
            "<li style=\"{}\">{}</li>\n",
            ITEM_STYLE,
            render_inline(text)
        ));
    }
}

/// Render Markdown into the styled summary block.
pub fn render_as_html(text: &str) -> String {
    let mut builder = HtmlBuilder {
        out: String::new(),
        paragraph: Vec::new(),
        list: None,
    };

    for raw_line in text.lines() {
        let line = raw_line.trim();

        if line.is_empty() {
            builder.flush_paragraph();
            builder.close_list();
            continue;
        }

        if let Some(caps) = heading_re().captures(line) {
            builder.flush_paragraph();
            builder.close_list();
            builder.out.push_str(&format!(
                "<h4 style=\"{}\">{}</h4>\n",
                HEADING_STYLE,
                render_inline(&caps[1])
            ));
        } else if let Some(caps) = bullet_re().captures(line) {
            builder.list_item(ListKind::Unordered, &caps[1]);
        } else if let Some(caps) = numbered_re().captures(line) {
            builder.list_item(ListKind::Ordered, &caps[1]);
        } else {
            builder.close_list();
            builder.paragraph.push(render_inline(line));
        }
    }
    builder.flush_paragraph();
    builder.close_list();

    format!(
        "<div class=\"tldr-summary\" style=\"{}\">\n<h3 style=\"{}\">TL;DR</h3>\n{}</div>",
        CONTAINER_STYLE, TITLE_STYLE, builder.out
    )
}

/// Strip fences, then render to HTML if Markdown survived.
pub fn finalize_summary(raw: &str) -> String {
    let stripped = strip_code_fences(raw);
    if !contains_markdown(&stripped) {
        stripped
    } else if looks_like_html(&stripped) {
        patch_html(&stripped)
    } else {
        render_as_html(&stripped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fenced_blocks() {
        let raw = "```html\n<p>Hello</p>\n```";
        assert_eq!(strip_code_fences(raw), "<p>Hello</p>");
    }

    #[test]
    fn strips_stray_inline_fences() {
        let out = strip_code_fences("Result: ```done``` ok");
        assert!(!out.contains("```"));
        assert_eq!(out, "Result: done ok");
    }

    #[test]
    fn detects_markdown() {
        assert!(contains_markdown("## Key points\nText"));
        assert!(contains_markdown("This is **important**."));
        assert!(contains_markdown("- first\n- second"));
        assert!(contains_markdown("1. first\n2. second"));
        assert!(!contains_markdown("<p>Already HTML</p>"));
        assert!(!contains_markdown("A plain sentence - with a dash."));
    }

    #[test]
    fn renders_headings_lists_and_emphasis() {
        let html = render_as_html(
            "## Overview\nThe **launch** went *well*.\n\n- fast\n- cheap\n\n1. plan\n2. ship",
        );
        assert!(html.starts_with("<div class=\"tldr-summary\""));
        assert!(html.contains("linear-gradient"));
        assert!(html.contains(">TL;DR</h3>"));
        assert!(html.contains(">Overview</h4>"));
        assert!(html.contains("<strong>launch</strong>"));
        assert!(html.contains("<em>well</em>"));
        assert_eq!(html.matches("<ul").count(), 1);
        assert_eq!(html.matches("<ol").count(), 1);
        assert_eq!(html.matches("<li").count(), 4);
        assert!(html.ends_with("</div>"));
    }

    #[test]
    fn switching_list_kinds_closes_previous_list() {
        let html = render_as_html("- a\n1. b");
        let ul_close = html.find("</ul>").unwrap();
        let ol_open = html.find("<ol").unwrap();
        assert!(ul_close < ol_open);
    }

    #[test]
    fn escapes_markup_in_text() {
        let html = render_as_html("- <script>alert(1)</script> **x**");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn finalize_leaves_plain_text_alone() {
        assert_eq!(finalize_summary("Just a sentence."), "Just a sentence.");
        let html = finalize_summary("```markdown\n**Bold** claim\n```");
        assert!(html.contains("<strong>Bold</strong>"));
        assert!(!html.contains("```"));
    }

    #[test]
    fn html_with_stray_markdown_keeps_its_tags() {
        let out = finalize_summary(
            "<p>Rust 1.80 **adds** LazyLock.</p>\n<ul><li>fewer deps</li></ul>",
        );
        assert!(out.contains("<p>Rust 1.80 <strong>adds</strong> LazyLock.</p>"), "{out}");
        assert!(out.contains("<ul><li>fewer deps</li></ul>"), "{out}");
        assert!(!out.contains("&lt;"), "{out}");
        assert!(!out.contains("tldr-summary"), "{out}");
    }

    #[test]
    fn detects_html_tags() {
        assert!(looks_like_html("<p>x</p>"));
        assert!(looks_like_html("a<br/>b"));
        assert!(!looks_like_html("1 < 2 and 3 > 2"));
        assert!(!looks_like_html("<script>alert(1)</script>"));
    }
}
