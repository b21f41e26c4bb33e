//! Page fetching and content extraction.
//!
//! This crate provides:
//! - [`extract`]: HTML → title + content text reduction
//! - [`fetch_page`]: fetch one curated link and reduce it
//! - [`extract_pages`]: the best-effort batch over a link selection

pub mod extract;

use brochurekit_shared::{BrochureKitError, CuratedLink, ExtractedPage, HttpClient, Result};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use extract::{ExtractLimits, PageText, collapse_blank_lines, extract_text, truncate_chars};

// ---------------------------------------------------------------------------
// Single page
// ---------------------------------------------------------------------------

/// Fetch a curated link and extract its text.
#[instrument(skip_all, fields(url = %link.url, page_type = %link.page_type))]
pub async fn fetch_page(
    client: &HttpClient,
    link: &CuratedLink,
    limits: &ExtractLimits,
) -> Result<ExtractedPage> {
    if link.url.trim().is_empty() {
        return Err(BrochureKitError::validation("link has no url"));
    }
    let url = Url::parse(&link.url)
        .map_err(|e| BrochureKitError::parse(format!("invalid URL '{}': {e}", link.url)))?;

    let html = client.get_text(&url).await?;
    let page = extract_text(&html, limits);

    debug!(
        title = %page.title,
        blocks = page.blocks,
        chars = page.chars_before_truncation,
        "page text extracted"
    );

    Ok(ExtractedPage {
        page_type: link.page_type.clone(),
        url: link.url.clone(),
        title: page.title,
        text: page.text,
    })
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Receives each page as soon as it is extracted.
pub trait PageSink: Send {
    /// Persist one page. `index` is the 1-based position of its link.
    fn accept(&mut self, index: usize, page: &ExtractedPage) -> Result<()>;

    /// Called after a link fails; the batch continues regardless.
    fn skipped(&mut self, _failure: &PageFailure) {}
}

/// A link that could not be fetched, extracted or persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub index: usize,
    pub url: String,
    pub error: String,
}

/// Outcome of [`extract_pages`].
#[derive(Debug, Clone, Default)]
pub struct ExtractReport {
    /// Pages handed to the sink successfully.
    pub extracted: usize,
    pub failures: Vec<PageFailure>,
}

/// Extract every link in order, one at a time.
///
/// A failure on one link is logged and recorded, then the loop moves on;
/// the batch itself never fails.
#[instrument(skip_all, fields(links = links.len()))]
pub async fn extract_pages(
    client: &HttpClient,
    links: &[CuratedLink],
    limits: &ExtractLimits,
    sink: &mut dyn PageSink,
) -> ExtractReport {
    let mut report = ExtractReport::default();

    for (i, link) in links.iter().enumerate() {
        let index = i + 1;
        let outcome = match fetch_page(client, link, limits).await {
            Ok(page) => sink.accept(index, &page),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => report.extracted += 1,
            Err(e) => {
                warn!(url = %link.url, error = %e, "page extraction failed, skipping");
                let failure = PageFailure {
                    index,
                    url: link.url.clone(),
                    error: e.to_string(),
                };
                sink.skipped(&failure);
                report.failures.push(failure);
            }
        }
    }

    info!(
        extracted = report.extracted,
        failed = report.failures.len(),
        "page extraction finished"
    );

    report
}
