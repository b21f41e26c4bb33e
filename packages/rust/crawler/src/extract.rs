//! HTML → brochure text reduction.
//!
//! The reduction keeps only structural text: headings (h1–h3), paragraphs
//! and list items from the page's main content region.

use std::sync::LazyLock;

use brochurekit_shared::ExtractConfig;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Elements that never carry content and are detached before extraction.
const NON_CONTENT: &str = "script, style, noscript";

/// Content containers tried in priority order; the first match wins.
const ROOT_CANDIDATES: [&str; 3] = ["main", "article", "body"];

/// Block-level elements whose text becomes a content block.
const BLOCK_TAGS: &str = "h1, h2, h3, p, li";

/// Length limits applied during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractLimits {
    /// Blocks whose trimmed text has this many characters or fewer are dropped.
    pub min_block_chars: usize,
    /// Character budget for the final text.
    pub max_text_chars: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self::from(&ExtractConfig::default())
    }
}

impl From<&ExtractConfig> for ExtractLimits {
    fn from(config: &ExtractConfig) -> Self {
        Self {
            min_block_chars: config.min_block_chars,
            max_text_chars: config.max_text_chars,
        }
    }
}

/// Title and body text of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub title: String,
    pub text: String,
    /// Blocks that survived the length filter.
    pub blocks: usize,
    /// Character count before truncation.
    pub chars_before_truncation: usize,
}

/// Reduce an HTML document to its title and content text.
pub fn extract_text(html: &str, limits: &ExtractLimits) -> PageText {
    let mut doc = Html::parse_document(html);
    strip_non_content(&mut doc);

    let title = document_title(&doc);
    let root = content_root(&doc);
    let blocks = collect_blocks(root, limits.min_block_chars);

    let joined = blocks.join("\n");
    let normalized = collapse_blank_lines(&joined);
    let normalized = normalized.trim();
    let chars_before_truncation = normalized.chars().count();

    PageText {
        title,
        text: truncate_chars(normalized, limits.max_text_chars).to_string(),
        blocks: blocks.len(),
        chars_before_truncation,
    }
}

/// Detach script/style/noscript subtrees so their text never leaks out.
fn strip_non_content(doc: &mut Html) {
    let sel = Selector::parse(NON_CONTENT).unwrap();
    let ids: Vec<_> = doc.select(&sel).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn document_title(doc: &Html) -> String {
    let sel = Selector::parse("title").unwrap();
    doc.select(&sel)
        .next()
        .map(|el| el.text().map(str::trim).collect::<String>())
        .unwrap_or_default()
}

/// `<main>`, then `<article>`, then `<body>`, then the document root.
fn content_root(doc: &Html) -> ElementRef<'_> {
    for tag in ROOT_CANDIDATES {
        let sel = Selector::parse(tag).unwrap();
        if let Some(el) = doc.select(&sel).next() {
            return el;
        }
    }
    doc.root_element()
}

fn collect_blocks(root: ElementRef<'_>, min_chars: usize) -> Vec<String> {
    let sel = Selector::parse(BLOCK_TAGS).unwrap();
    root.select(&sel)
        .map(block_text)
        .filter(|text| text.chars().count() > min_chars)
        .collect()
}

/// Text nodes trimmed, empties skipped, joined by one space.
fn block_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse runs of 3+ newlines into exactly 2.
pub fn collapse_blank_lines(text: &str) -> String {
    static MULTI_NEWLINE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_NEWLINE_RE.replace_all(text, "\n\n").into_owned()
}

/// Left-anchored cut to at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
