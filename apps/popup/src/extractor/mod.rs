//! Page-Text Extractor: pulls the readable text of the active tab's job description.
//!
//! Three regions are read in order (`main`, `article`, `body`) and all of them are
//! concatenated, not just the first hit. Layouts put JD content under different tags,
//! so overlapping text is expected and kept.

use std::sync::OnceLock;

use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use crate::errors::AnalysisError;
use crate::tab::TabProvider;

/// Maximum number of characters handed to the scoring service.
pub const MAX_JD_CHARS: usize = 15_000;

static MAIN_SELECTOR: OnceLock<Selector> = OnceLock::new();
static ARTICLE_SELECTOR: OnceLock<Selector> = OnceLock::new();
static BODY_SELECTOR: OnceLock<Selector> = OnceLock::new();

fn region_selectors() -> [&'static Selector; 3] {
    [
        MAIN_SELECTOR.get_or_init(|| Selector::parse("main").expect("static selector")),
        ARTICLE_SELECTOR.get_or_init(|| Selector::parse("article").expect("static selector")),
        BODY_SELECTOR.get_or_init(|| Selector::parse("body").expect("static selector")),
    ]
}

/// Elements whose text never renders.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

/// Elements that start and end their own line.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Loads the active tab's document and extracts its JD text.
pub async fn get_active_tab_text(tabs: &dyn TabProvider) -> Result<String, AnalysisError> {
    let tab = tabs.active_tab().await?.ok_or(AnalysisError::NoActiveTab)?;
    let html = tabs.load_document(&tab).await?;
    let text = extract_page_text(&html);
    debug!("Extracted {} chars from {tab}", text.chars().count());
    Ok(text)
}

/// Merges the rendered text of `main`, `article` and `body` (each `""` when absent),
/// newline-separated, truncated to `MAX_JD_CHARS` characters.
/// Returns `""` when none of the regions has any text.
pub fn extract_page_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let regions: Vec<String> = region_selectors()
        .iter()
        .map(|selector| {
            document
                .select(selector)
                .next()
                .map(rendered_text)
                .unwrap_or_default()
        })
        .collect();

    if regions.iter().all(|r| r.is_empty()) {
        return String::new();
    }

    truncate_chars(&regions.join("\n"), MAX_JD_CHARS)
}

/// Approximates `innerText`: hidden subtrees skipped, block elements on their own
/// lines, whitespace collapsed, blank lines dropped.
fn rendered_text(element: ElementRef) -> String {
    let mut lines = Vec::new();
    let mut line = String::new();
    collect_text(element, &mut lines, &mut line);
    flush_line(&mut lines, &mut line);
    lines.join("\n")
}

fn collect_text(element: ElementRef, lines: &mut Vec<String>, line: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => line.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if HIDDEN_ELEMENTS.contains(&name) {
                    continue;
                }
                if name == "br" {
                    flush_line(lines, line);
                    continue;
                }
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let is_block = BLOCK_ELEMENTS.contains(&name);
                if is_block {
                    flush_line(lines, line);
                }
                collect_text(child_ref, lines, line);
                if is_block {
                    flush_line(lines, line);
                } else if name == "td" || name == "th" {
                    line.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn flush_line(lines: &mut Vec<String>, line: &mut String) {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if !collapsed.is_empty() {
        lines.push(collapsed);
    }
    line.clear();
}

/// Keeps the first `max` characters (not bytes) of `text`.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
