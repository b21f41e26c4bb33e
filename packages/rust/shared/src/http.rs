//! The HTTP client used for homepage and page fetches.
//!
//! One [`HttpClient`] is built at process start and passed by reference into
//! each stage that touches the target site.

use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::HttpConfig;
use crate::error::{BrochureKitError, Result};

/// Thin wrapper over a configured `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Build the client from `[http]` settings.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(config.timeout())
            .build()
            .map_err(|e| BrochureKitError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// GET `url` and return the body as text.
    ///
    /// Any transport failure or non-2xx status is a [`BrochureKitError::Fetch`].
    pub async fn get_text(&self, url: &Url) -> Result<String> {
        debug!(%url, "GET");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| BrochureKitError::fetch(url.as_str(), describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrochureKitError::fetch(url.as_str(), format!("HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| BrochureKitError::fetch(url.as_str(), format!("body read failed: {e}")))
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}
