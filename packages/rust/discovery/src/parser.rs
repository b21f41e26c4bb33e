//! Anchor extraction from a parsed homepage.

use std::collections::BTreeSet;

use scraper::{Html, Selector};
use url::Url;

/// Result of scanning one HTML document for links.
#[derive(Debug, Clone, Default)]
pub struct AnchorScan {
    /// Number of `a[href]` elements seen.
    pub anchors_seen: usize,
    /// Unique absolute same-host URLs.
    pub links: BTreeSet<String>,
}

/// Collect every same-host hyperlink in `html`, resolved against `base`.
///
/// Empty and fragment-only references (`#top`) point back into the current
/// document and are skipped. Everything else is joined onto `base`, so relative,
/// protocol-relative and absolute references are handled the same way.
/// Fragments on real links are kept verbatim; the curator strips them.
pub fn scan_anchors(html: &str, base: &Url) -> AnchorScan {
    let doc = Html::parse_document(html);
    let anchor_sel = Selector::parse("a[href]").expect("valid selector");

    let mut scan = AnchorScan::default();
    for el in doc.select(&anchor_sel) {
        scan.anchors_seen += 1;

        let Some(href) = el.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() || href.starts_with('#') {
            continue;
        }

        let Ok(resolved) = base.join(href) else {
            continue;
        };
        if same_host(&resolved, base) {
            scan.links.insert(resolved.to_string());
        }
    }

    scan
}

/// Exact host match used at discovery time.
///
/// Hosts must be identical after URL normalization. Only an explicitly
/// written port takes part, so `http://` and `https://` links to the same
/// host match. No `www.` folding happens here.
pub fn same_host(candidate: &Url, base: &Url) -> bool {
    match (candidate.host_str(), base.host_str()) {
        (Some(a), Some(b)) => a == b && candidate.port() == base.port(),
        _ => false,
    }
}
