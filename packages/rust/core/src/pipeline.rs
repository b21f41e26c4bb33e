//! Stage orchestration: discover → curate → extract, with artifacts on disk
//! between each stage so any stage can be re-run on its own.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, instrument};
use url::Url;

use brochurekit_crawler::{ExtractLimits, ExtractReport, PageFailure, PageSink, extract_pages};
use brochurekit_shared::{ExtractedPage, HttpClient, LinkSelection, Result};

use crate::artifacts::{OutputLayout, PageWriter};
use crate::curator::curate_links;
use crate::llm::CompletionClient;

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after a page record is written.
    fn page_extracted(&self, url: &str, current: usize, total: usize);
    /// Called when a page is skipped because of an error.
    fn page_failed(&self, url: &str, error: &str, current: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_extracted(&self, _url: &str, _current: usize, _total: usize) {}
    fn page_failed(&self, _url: &str, _error: &str, _current: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Stage 1: discover
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct DiscoverResult {
    pub links: Vec<String>,
    pub path: PathBuf,
    pub elapsed: Duration,
}

/// Collect same-host homepage links and write `candidate_urls.json`.
#[instrument(skip_all, fields(url = %base_url))]
pub async fn run_discover(
    http: &HttpClient,
    base_url: &Url,
    layout: &OutputLayout,
    progress: &dyn ProgressReporter,
) -> Result<DiscoverResult> {
    let start = Instant::now();

    progress.phase("Discovering homepage links");
    let links = brochurekit_discovery::discover_links(http, base_url).await?;
    let path = layout.write_candidates(&links)?;

    info!(count = links.len(), path = %path.display(), "candidates saved");

    Ok(DiscoverResult {
        links,
        path,
        elapsed: start.elapsed(),
    })
}

// ---------------------------------------------------------------------------
// Stage 2: curate
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CurateResult {
    /// Candidates loaded from disk, before cleaning.
    pub candidates: usize,
    pub selection: LinkSelection,
    pub path: PathBuf,
    pub elapsed: Duration,
}

/// Read candidates, ask the model, and write `final_urls.json`.
///
/// Nothing is written when the model call or reply parsing fails.
#[instrument(skip_all, fields(url = %base_url, model = llm.model()))]
pub async fn run_curate(
    llm: &dyn CompletionClient,
    base_url: &Url,
    layout: &OutputLayout,
    max_links: usize,
    progress: &dyn ProgressReporter,
) -> Result<CurateResult> {
    let start = Instant::now();

    let candidates = layout.read_candidates()?;
    info!(count = candidates.len(), "candidates loaded");

    progress.phase("Asking the model to pick brochure pages");
    let selection = curate_links(llm, base_url, &candidates, max_links).await?;
    let path = layout.write_selection(&selection)?;

    info!(count = selection.links.len(), path = %path.display(), "selection saved");

    Ok(CurateResult {
        candidates: candidates.len(),
        selection,
        path,
        elapsed: start.elapsed(),
    })
}

// ---------------------------------------------------------------------------
// Stage 3: extract
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ExtractResult {
    /// Links in the selection.
    pub total: usize,
    pub written: Vec<PathBuf>,
    pub failures: Vec<PageFailure>,
    pub pages_dir: PathBuf,
    pub elapsed: Duration,
}

/// Forwards sink events to a [`ProgressReporter`].
struct ReportingSink<'a> {
    writer: PageWriter,
    progress: &'a dyn ProgressReporter,
    total: usize,
}

impl PageSink for ReportingSink<'_> {
    fn accept(&mut self, index: usize, page: &ExtractedPage) -> Result<()> {
        self.writer.accept(index, page)?;
        self.progress.page_extracted(&page.url, index, self.total);
        Ok(())
    }

    fn skipped(&mut self, failure: &PageFailure) {
        self.progress
            .page_failed(&failure.url, &failure.error, failure.index, self.total);
    }
}

/// Fetch every curated page and write one record per success.
///
/// Only a missing or malformed `final_urls.json` fails this stage; per-page
/// errors end up in [`ExtractResult::failures`].
#[instrument(skip_all, fields(out = %layout.root().display()))]
pub async fn run_extract(
    http: &HttpClient,
    layout: &OutputLayout,
    limits: &ExtractLimits,
    progress: &dyn ProgressReporter,
) -> Result<ExtractResult> {
    let start = Instant::now();

    let selection = layout.read_selection()?;
    let total = selection.links.len();
    info!(count = total, "selection loaded");

    progress.phase("Extracting page text");
    let mut sink = ReportingSink {
        writer: PageWriter::new(layout.clone()),
        progress,
        total,
    };
    let ExtractReport { failures, .. } =
        extract_pages(http, &selection.links, limits, &mut sink).await;

    Ok(ExtractResult {
        total,
        written: sink.writer.written().to_vec(),
        failures,
        pages_dir: layout.pages_dir(),
        elapsed: start.elapsed(),
    })
}

// ---------------------------------------------------------------------------
// All stages
// ---------------------------------------------------------------------------

/// Settings shared by a full run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_links: usize,
    pub limits: ExtractLimits,
}

#[derive(Debug)]
pub struct RunResult {
    pub discover: DiscoverResult,
    pub curate: CurateResult,
    pub extract: ExtractResult,
}

/// Run the three stages back to back against one output directory.
#[instrument(skip_all, fields(url = %base_url))]
pub async fn run_pipeline(
    http: &HttpClient,
    llm: &dyn CompletionClient,
    base_url: &Url,
    layout: &OutputLayout,
    options: &RunOptions,
    progress: &dyn ProgressReporter,
) -> Result<RunResult> {
    let discover = run_discover(http, base_url, layout, progress).await?;
    let curate = run_curate(llm, base_url, layout, options.max_links, progress).await?;
    let extract = run_extract(http, layout, &options.limits, progress).await?;

    info!(
        candidates = discover.links.len(),
        selected = curate.selection.links.len(),
        pages = extract.written.len(),
        failed = extract.failures.len(),
        "pipeline complete"
    );

    Ok(RunResult {
        discover,
        curate,
        extract,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use brochurekit_shared::{BrochureKitError, CuratedLink, HttpConfig};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::artifacts::tests::temp_layout;
    use crate::curator::tests::ScriptedClient;

    #[derive(Default)]
    struct RecordingProgress {
        extracted: Mutex<Vec<usize>>,
        failed: Mutex<Vec<usize>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, _name: &str) {}
        fn page_extracted(&self, _url: &str, current: usize, _total: usize) {
            self.extracted.lock().unwrap().push(current);
        }
        fn page_failed(&self, _url: &str, _error: &str, current: usize, _total: usize) {
            self.failed.lock().unwrap().push(current);
        }
    }

    fn http() -> HttpClient {
        HttpClient::new(&HttpConfig::default()).unwrap()
    }

    fn refused_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}/contact")
    }

    async fn mount_html(server: &MockServer, route: &str, html: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(server)
            .await;
    }

    async fn mount_page(server: &MockServer, route: &str, title: &str, body: &str) {
        let html = format!(
            "<html><head><title>{title}</title></head><body><main><p>{body}</p></main></body></html>"
        );
        mount_html(server, route, html).await;
    }

    fn cleanup(layout: &OutputLayout) {
        let _ = std::fs::remove_dir_all(layout.root());
    }

    #[tokio::test]
    async fn discover_writes_candidates() {
        let server = MockServer::start().await;
        mount_html(
            &server,
            "/",
            r#"<a href="/about">About</a><a href="https://other.com/">Out</a>"#.into(),
        )
        .await;

        let layout = temp_layout();
        let base = Url::parse(&server.uri()).unwrap();
        let result = run_discover(&http(), &base, &layout, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.links, vec![format!("{}/about", server.uri())]);
        assert_eq!(layout.read_candidates().unwrap(), result.links);
        cleanup(&layout);
    }

    #[tokio::test]
    async fn failed_discovery_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let layout = temp_layout();
        let base = Url::parse(&server.uri()).unwrap();
        let err = run_discover(&http(), &base, &layout, &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, BrochureKitError::Fetch { .. }));
        assert!(!layout.candidates_path().exists());
    }

    #[tokio::test]
    async fn curate_requires_candidates() {
        let layout = temp_layout();
        let llm = ScriptedClient::replying("{}");
        let base = Url::parse("https://acme.com/").unwrap();

        let err = run_curate(&llm, &base, &layout, 10, &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, BrochureKitError::MissingInput { .. }));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn decode_failure_writes_no_selection() {
        let layout = temp_layout();
        layout
            .write_candidates(&["https://acme.com/about".to_string()])
            .unwrap();

        let llm = ScriptedClient::replying("not json at all");
        let base = Url::parse("https://acme.com/").unwrap();
        let err = run_curate(&llm, &base, &layout, 10, &SilentProgress)
            .await
            .unwrap_err();

        assert_eq!(err.raw_model_output(), Some("not json at all"));
        assert!(!layout.selection_path().exists());
        cleanup(&layout);
    }

    #[tokio::test]
    async fn extract_requires_selection() {
        let layout = temp_layout();
        let err = run_extract(&http(), &layout, &ExtractLimits::default(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, BrochureKitError::MissingInput { .. }));
    }

    #[tokio::test]
    async fn extract_continues_past_unreachable_page() {
        let server = MockServer::start().await;
        mount_page(&server, "/about", "About", "Acme has built valves since 1952.").await;
        mount_page(&server, "/careers", "Careers", "We are hiring welders and engineers.").await;

        let layout = temp_layout();
        let selection = LinkSelection {
            links: vec![
                CuratedLink::new("about", format!("{}/about", server.uri())),
                CuratedLink::new("contact", refused_url()),
                CuratedLink::new("careers", format!("{}/careers", server.uri())),
            ],
        };
        layout.write_selection(&selection).unwrap();

        let progress = RecordingProgress::default();
        let result = run_extract(&http(), &layout, &ExtractLimits::default(), &progress)
            .await
            .unwrap();

        assert_eq!(result.total, 3);
        assert_eq!(result.written.len(), 2);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].url, selection.links[1].url);

        let mut files: Vec<_> = std::fs::read_dir(layout.pages_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        files.sort();
        assert_eq!(files, vec!["01_about_about.json", "03_careers_careers.json"]);

        assert_eq!(*progress.extracted.lock().unwrap(), vec![1, 3]);
        assert_eq!(*progress.failed.lock().unwrap(), vec![2]);
        cleanup(&layout);
    }

    #[tokio::test]
    async fn entry_missing_url_does_not_stop_extraction() {
        let server = MockServer::start().await;
        mount_page(&server, "/about", "About", "Acme has built valves since 1952.").await;
        mount_page(&server, "/careers", "Careers", "We are hiring welders and engineers.").await;

        let layout = temp_layout();
        std::fs::create_dir_all(layout.root()).unwrap();
        let raw = json!({
            "links": [
                {"type": "about", "url": format!("{}/about", server.uri())},
                {"type": "team"},
                {"type": "careers", "url": format!("{}/careers", server.uri())}
            ]
        });
        std::fs::write(layout.selection_path(), raw.to_string()).unwrap();

        let result = run_extract(&http(), &layout, &ExtractLimits::default(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.total, 3);
        assert_eq!(result.written.len(), 2);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].index, 2);
        assert!(layout.pages_dir().join("03_careers_careers.json").exists());
        cleanup(&layout);
    }

    #[tokio::test]
    async fn full_run_produces_all_artifacts() {
        let server = MockServer::start().await;
        let uri = server.uri();
        mount_html(
            &server,
            "/",
            r##"<nav>
                <a href="/about">About</a>
                <a href="/contact#form">Contact</a>
                <a href="/privacy">Privacy</a>
                <a href="https://twitter.com/acme">Twitter</a>
            </nav>"##
                .to_string(),
        )
        .await;
        mount_page(&server, "/about", "About Acme", "Acme has built valves since 1952.").await;
        mount_page(&server, "/contact", "Contact", "Call our sales office on weekdays.").await;

        let llm = ScriptedClient::replying(
            &json!({
                "links": [
                    {"type": "about", "url": format!("{uri}/about")},
                    {"type": "contact", "url": "/contact"},
                    {"type": "social", "url": "https://twitter.com/acme"}
                ]
            })
            .to_string(),
        );

        let layout = temp_layout();
        let base = Url::parse(&uri).unwrap();
        let options = RunOptions {
            max_links: 10,
            limits: ExtractLimits::default(),
        };
        let result = run_pipeline(&http(), &llm, &base, &layout, &options, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.discover.links.len(), 3);
        assert_eq!(
            result.curate.selection.links,
            vec![
                CuratedLink::new("about", format!("{uri}/about")),
                CuratedLink::new("contact", format!("{uri}/contact")),
            ]
        );
        assert_eq!(result.extract.written.len(), 2);
        assert!(result.extract.failures.is_empty());

        let about: ExtractedPage = serde_json::from_str(
            &std::fs::read_to_string(layout.pages_dir().join("01_about_about.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(about.title, "About Acme");
        assert_eq!(about.text, "Acme has built valves since 1952.");
        cleanup(&layout);
    }
}
