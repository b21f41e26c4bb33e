//! Homepage link discovery.
//!
//! The first pipeline stage: fetch the site's homepage once, collect every
//! anchor, resolve it against the base URL and keep the ones that stay on the
//! same host. The result is the candidate set handed to link curation.

mod parser;

use brochurekit_shared::{BrochureKitError, HttpClient, Result};
use tracing::{info, instrument};
use url::Url;

pub use parser::{AnchorScan, same_host, scan_anchors};

/// Fetch `base_url` and return its unique same-host links.
///
/// Any fetch failure aborts discovery; there is no partial result. The
/// returned list is sorted, although callers must not rely on any order.
#[instrument(skip_all, fields(url = %base_url))]
pub async fn discover_links(client: &HttpClient, base_url: &Url) -> Result<Vec<String>> {
    if base_url.host_str().is_none() {
        return Err(BrochureKitError::validation(format!(
            "base URL has no host: {base_url}"
        )));
    }

    info!("fetching homepage");
    let html = client.get_text(base_url).await?;

    let scan = scan_anchors(&html, base_url);
    info!(
        anchors = scan.anchors_seen,
        kept = scan.links.len(),
        "homepage links discovered"
    );

    Ok(scan.links.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use brochurekit_shared::HttpConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client() -> HttpClient {
        HttpClient::new(&HttpConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn discovers_same_host_links_from_homepage() {
        let server = MockServer::start().await;
        let homepage = format!(
            r##"<html><body>
                <nav><a href="/about">About</a><a href="{uri}/contact">Contact</a></nav>
                <a href="https://other.com/x">Partner</a>
                <a href="#frag">Top</a>
            </body></html>"##,
            uri = server.uri()
        );

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(homepage))
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let links = discover_links(&client(), &base).await.unwrap();

        assert_eq!(
            links,
            vec![
                format!("{}/about", server.uri()),
                format!("{}/contact", server.uri()),
            ]
        );
    }

    #[tokio::test]
    async fn http_error_aborts_discovery() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let err = discover_links(&client(), &base).await.unwrap_err();
        assert!(matches!(err, BrochureKitError::Fetch { .. }));
    }

    #[tokio::test]
    async fn base_without_host_is_rejected() {
        let base = Url::parse("file:///tmp/index.html").unwrap();
        let err = discover_links(&client(), &base).await.unwrap_err();
        assert!(matches!(err, BrochureKitError::Validation { .. }));
    }
}
