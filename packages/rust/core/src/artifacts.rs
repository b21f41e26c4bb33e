//! On-disk layout of the intermediate and final artifacts.
//!
//! ```text
//! <root>/
//! ├── candidate_urls.json
//! ├── final_urls.json
//! └── pages/
//!     └── 01_about_about-us.json
//! ```

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use brochurekit_crawler::PageSink;
use brochurekit_shared::{BrochureKitError, CuratedLink, ExtractedPage, LinkSelection, Result};

pub const CANDIDATES_FILE: &str = "candidate_urls.json";
pub const SELECTION_FILE: &str = "final_urls.json";
pub const PAGES_DIR: &str = "pages";

/// Paths of every artifact under one output directory.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn candidates_path(&self) -> PathBuf {
        self.root.join(CANDIDATES_FILE)
    }

    pub fn selection_path(&self) -> PathBuf {
        self.root.join(SELECTION_FILE)
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.root.join(PAGES_DIR)
    }

    pub fn page_path(&self, index: usize, link: &CuratedLink) -> PathBuf {
        self.pages_dir().join(page_filename(index, link))
    }

    // -- stage 1 ----------------------------------------------------------

    pub fn write_candidates(&self, urls: &[String]) -> Result<PathBuf> {
        let path = self.candidates_path();
        write_json(&path, &urls)?;
        Ok(path)
    }

    pub fn read_candidates(&self) -> Result<Vec<String>> {
        read_json(&self.candidates_path(), "brochurekit discover")
    }

    // -- stage 2 ----------------------------------------------------------

    pub fn write_selection(&self, selection: &LinkSelection) -> Result<PathBuf> {
        let path = self.selection_path();
        write_json(&path, selection)?;
        Ok(path)
    }

    pub fn read_selection(&self) -> Result<LinkSelection> {
        read_json(&self.selection_path(), "brochurekit curate")
    }

    // -- stage 3 ----------------------------------------------------------

    /// Write one page record, creating `pages/` on first use.
    pub fn write_page(&self, index: usize, page: &ExtractedPage) -> Result<PathBuf> {
        let link = CuratedLink::new(page.page_type.clone(), page.url.clone());
        let path = self.page_path(index, &link);
        write_json(&path, page)?;
        Ok(path)
    }
}

/// Writes each extracted page straight to `pages/`.
#[derive(Debug)]
pub struct PageWriter {
    layout: OutputLayout,
    written: Vec<PathBuf>,
}

impl PageWriter {
    pub fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl PageSink for PageWriter {
    fn accept(&mut self, index: usize, page: &ExtractedPage) -> Result<()> {
        let path = self.layout.write_page(index, page)?;
        debug!(path = %path.display(), "page written");
        self.written.push(path);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File naming
// ---------------------------------------------------------------------------

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Filename-safe slug of a URL path; the site root maps to `home`.
///
/// The path is percent-decoded first, so `%20` becomes one `_` rather than
/// leaking escape digits into the name.
pub fn url_slug(url: &Url) -> String {
    let decoded = percent_decode_str(url.path()).decode_utf8_lossy();
    let trimmed = decoded.trim_matches('/');
    if trimmed.is_empty() {
        "home".to_string()
    } else {
        sanitize_component(trimmed)
    }
}

/// `{index:02}_{type}_{slug}.json`.
pub fn page_filename(index: usize, link: &CuratedLink) -> String {
    let slug = match Url::parse(&link.url) {
        Ok(url) => url_slug(&url),
        Err(_) => sanitize_component(link.url.trim_matches('/')),
    };
    format!(
        "{index:02}_{}_{slug}.json",
        sanitize_component(&link.page_type)
    )
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

/// Pretty-print `value` to `path`, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BrochureKitError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| BrochureKitError::parse(format!("failed to serialize {}: {e}", path.display())))?;
    std::fs::write(path, json).map_err(|e| BrochureKitError::io(path, e))
}

fn read_json<T: DeserializeOwned>(path: &Path, prerequisite: &'static str) -> Result<T> {
    if !path.exists() {
        return Err(BrochureKitError::MissingInput {
            path: path.to_path_buf(),
            prerequisite,
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| BrochureKitError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| BrochureKitError::parse(format!("malformed {}: {e}", path.display())))
}
