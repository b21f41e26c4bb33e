//! Link curation: ask the model which candidates belong in a brochure.
//!
//! Candidates are cleaned before the call, the reply is validated against the
//! `{"links":[{"type","url"}]}` shape, and every returned URL is re-resolved
//! and checked against the base site before it is kept.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};
use url::Url;

use brochurekit_shared::{
    BrochureKitError, CuratedLink, LinkSelection, Result, UNKNOWN_PAGE_TYPE,
};

use crate::llm::{ChatMessage, CompletionClient};

/// Instruction sent as the system message.
pub const SYSTEM_PROMPT: &str = r#"You are provided with a list of URLs found on a company website.
You decide which links are most relevant to include in a brochure about the company,
such as links to an About page, Products/Services/Solutions pages, Case Studies/Customers pages,
Careers/Jobs pages, Pricing (if available), and Contact page.

Rules:
- Only choose from the URLs provided (do not invent new URLs).
- Prefer internal links on the same domain.
- Avoid privacy policy, terms, blog/news category pages, and unrelated downloads unless needed.
- Pick at most 10 links.
- Return absolute URLs starting with https:// (no relative /about).
- Do not return URLs containing # fragments (like https://site.com/#faq).
- Return ONLY valid JSON (no extra text, no markdown).

Return JSON in this format:
{
  "links": [
    {"type": "about", "url": "https://full.url/about"},
    {"type": "products", "url": "https://full.url/solutions"},
    {"type": "careers", "url": "https://full.url/careers"},
    {"type": "contact", "url": "https://full.url/contact"}
  ]
}"#;

/// How many raw model entries are echoed to the debug log.
const RAW_PREVIEW: usize = 5;

/// One `links` entry as the model wrote it, before filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModelLink {
    #[serde(rename = "type", default)]
    pub page_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

// ---------------------------------------------------------------------------
// Candidate cleaning
// ---------------------------------------------------------------------------

/// Trim, drop fragments and empties, dedupe keeping first-seen order.
///
/// Applying this twice gives the same result as applying it once.
pub fn clean_candidate_urls(urls: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut cleaned = Vec::new();

    for raw in urls {
        let without_fragment = raw.trim().split('#').next().unwrap_or_default().trim();
        if without_fragment.is_empty() {
            continue;
        }
        if seen.insert(without_fragment.to_string()) {
            cleaned.push(without_fragment.to_string());
        }
    }

    cleaned
}

// ---------------------------------------------------------------------------
// Reply parsing
// ---------------------------------------------------------------------------

/// Validate the model's reply text and return its link entries.
///
/// The reply must be a JSON object. A missing `links` key yields no entries;
/// entries that are not `{type?: string, url?: string}` are dropped.
pub fn parse_model_reply(raw: &str) -> Result<Vec<ModelLink>> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| BrochureKitError::decode(e.to_string(), raw))?;

    let Value::Object(mut object) = value else {
        return Err(BrochureKitError::decode("reply is not a JSON object", raw));
    };

    let entries = match object.remove("links") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(BrochureKitError::decode("`links` is not an array", raw)),
    };

    let links = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<ModelLink>(entry.clone()) {
            Ok(link) => Some(link),
            Err(e) => {
                debug!(%entry, error = %e, "dropping malformed link entry");
                None
            }
        })
        .collect();

    Ok(links)
}

// ---------------------------------------------------------------------------
// Post-filter
// ---------------------------------------------------------------------------

/// Host comparison used after curation.
///
/// Hosts are compared lower-cased with one leading `www.` removed, so
/// `www.acme.com` and `acme.com` are the same site. Explicit ports must
/// match; the scheme is ignored.
pub fn same_site_ignoring_www(candidate: &Url, base: &Url) -> bool {
    fn site(url: &Url) -> Option<String> {
        let host = url.host_str()?.to_ascii_lowercase();
        Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
    }

    match (site(candidate), site(base)) {
        (Some(a), Some(b)) => a == b && candidate.port() == base.port(),
        _ => false,
    }
}

/// Resolve each entry against `base`, strip fragments and keep same-site URLs.
pub fn post_filter(base: &Url, entries: Vec<ModelLink>) -> Vec<CuratedLink> {
    let mut kept = Vec::new();

    for entry in entries {
        let url = entry.url.as_deref().map(str::trim).unwrap_or_default();
        if url.is_empty() {
            continue;
        }

        let Ok(mut full) = base.join(url) else {
            debug!(url, "dropping unresolvable model URL");
            continue;
        };
        full.set_fragment(None);

        if !same_site_ignoring_www(&full, base) {
            debug!(url = %full, "dropping off-site model URL");
            continue;
        }

        let page_type = entry
            .page_type
            .unwrap_or_else(|| UNKNOWN_PAGE_TYPE.to_string());
        kept.push(CuratedLink::new(page_type, full.to_string()));
    }

    kept
}

// ---------------------------------------------------------------------------
// Curation
// ---------------------------------------------------------------------------

/// Ask the model to pick brochure pages from `candidates`.
///
/// Model and decode failures propagate unchanged; there is no retry.
#[instrument(skip_all, fields(base = %base_url, model = llm.model()))]
pub async fn curate_links(
    llm: &dyn CompletionClient,
    base_url: &Url,
    candidates: &[String],
    max_links: usize,
) -> Result<LinkSelection> {
    let urls = clean_candidate_urls(candidates);
    info!(
        candidates = candidates.len(),
        cleaned = urls.len(),
        "candidate URLs cleaned"
    );

    if urls.is_empty() {
        warn!("no candidate URLs to curate, skipping model call");
        return Ok(LinkSelection::default());
    }

    let user_message = json!({
        "base_url": base_url.as_str(),
        "urls": urls,
    })
    .to_string();

    let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_message)];
    let reply = llm.complete(&messages).await?;

    let entries = parse_model_reply(&reply)?;
    debug!(
        raw = ?&entries[..entries.len().min(RAW_PREVIEW)],
        total = entries.len(),
        "model links before filtering"
    );

    let mut links = post_filter(base_url, entries);
    debug!(
        count = links.len(),
        first = ?&links[..links.len().min(RAW_PREVIEW)],
        "model links after filtering"
    );

    if links.len() > max_links {
        warn!(
            returned = links.len(),
            max_links, "model returned too many links, truncating"
        );
        links.truncate(max_links);
    }

    Ok(LinkSelection { links })
}
