//! Records passed between the pipeline stages.

use serde::{Deserialize, Deserializer, Serialize};

/// Page type used when a curated entry carries none.
pub const UNKNOWN_PAGE_TYPE: &str = "unknown";

fn unknown_page_type() -> String {
    UNKNOWN_PAGE_TYPE.to_string()
}

/// Missing or `null` reads as an empty string.
fn string_or_empty<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// CuratedLink / LinkSelection
// ---------------------------------------------------------------------------

/// A brochure-relevant page picked by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedLink {
    /// Category such as `about`, `products`, `careers`, `contact`.
    #[serde(rename = "type", default = "unknown_page_type")]
    pub page_type: String,
    /// Absolute same-site URL without fragment. A hand-edited selection may
    /// leave it out; extraction reports such an entry on its own.
    #[serde(default, deserialize_with = "string_or_empty")]
    pub url: String,
}

impl CuratedLink {
    pub fn new(page_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            page_type: page_type.into(),
            url: url.into(),
        }
    }
}

/// The curation artifact (`final_urls.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSelection {
    #[serde(default)]
    pub links: Vec<CuratedLink>,
}

// ---------------------------------------------------------------------------
// ExtractedPage
// ---------------------------------------------------------------------------

/// Clean text pulled from one curated page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPage {
    /// Carried over from the [`CuratedLink`].
    #[serde(rename = "type")]
    pub page_type: String,
    pub url: String,
    /// `<title>` text, empty when the page has none.
    pub title: String,
    /// Newline-joined content blocks, length-capped.
    pub text: String,
}
