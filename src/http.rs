//! Page fetching.
//!
//! [`PageFetcher`] is the seam between the pipeline and the network. The
//! production implementation, [`HttpClient`], wraps a `reqwest::Client`
//! built from an explicit [`HttpConfig`]; nothing in the crate relies on
//! process-wide default headers.

use crate::config::HttpConfig;
use crate::error::{HarvestError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Fetches a resource and returns its body as text.
pub trait PageFetcher {
    /// Fetch `url`. Non-2xx answers are [`HarvestError::Http`] errors.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// `reqwest`-backed fetcher with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| HarvestError::Config(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| HarvestError::Config(format!("invalid header value {value:?}: {e}")))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| HarvestError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

fn network_error(url: &str, e: reqwest::Error) -> HarvestError {
    let reason = if e.is_timeout() {
        format!("timed out: {e}")
    } else {
        e.to_string()
    };
    HarvestError::Network {
        url: url.to_string(),
        reason,
    }
}

impl PageFetcher for HttpClient {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Non-success status");
            return Err(HarvestError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| network_error(url, e))?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched"
        );
        Ok(body)
    }
}
